pub mod auth;
pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod websocket;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::{mpsc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use docs::ApiDoc;
use realtime::feed::NotificationFeed;
use realtime::hub::EventHub;
use realtime::presence::PresenceTracker;
use realtime::registry::{ConnTable, SessionRegistry};
use realtime::router::{ChannelRouter, ChannelScope};

/// Shared state of the realtime service
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionRegistry>,
    pub channels: Arc<ChannelRouter>,
    pub hub: Arc<EventHub>,
    pub presence: Arc<PresenceTracker>,
    pub notifications: Arc<NotificationFeed>,
}

impl AppState {
    /// Wire the realtime components and start the presence task.
    /// Must run inside a tokio runtime.
    pub fn new(config: Config) -> Arc<Self> {
        let conns: ConnTable = Arc::new(RwLock::new(HashMap::new()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let channels = Arc::new(ChannelRouter::new(
            conns.clone(),
            events_tx.clone(),
            config.echo_broadcasts,
        ));
        let sessions = Arc::new(SessionRegistry::new(
            conns.clone(),
            channels.clone(),
            events_tx,
        ));
        let notifications = Arc::new(NotificationFeed::new(conns.clone()));
        let presence = Arc::new(PresenceTracker::new(conns, channels.clone()));
        let hub = Arc::new(EventHub::new(
            channels.clone(),
            notifications.clone(),
            presence.clone(),
            ChannelScope::from_config(&config.channel_scope),
        ));

        // Presence re-broadcasts follow registry membership changes
        tokio::spawn(presence.clone().run(events_rx, hub.clone()));

        Arc::new(Self {
            config,
            sessions,
            channels,
            hub,
            presence,
            notifications,
        })
    }
}

/// Assemble the full application router: REST API, WebSocket upgrade
/// route and Swagger UI.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    let public_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/ready", get(handlers::ready_check));

    let ws_routes = Router::new()
        .route("/ws/:project_id", get(websocket::websocket_handler))
        .with_state(state.clone());

    Router::new()
        // Mount authenticated API routes
        .nest("/api", routes::create_api_routes(state))
        .merge(public_routes)
        .merge(ws_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let allowed: Vec<axum::http::HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}
