use designly_rt::clients::app_service_client;
use designly_rt::config::{self, Config};
use designly_rt::realtime::userctx;
use designly_rt::{app, AppState};
use std::panic;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "designly_rt=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting realtime service...");

    // Load configuration
    let cfg = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    config::init_config(cfg.clone());

    if cfg.cloud_auth_jwt_secret.is_none() {
        warn!("No JWT secret configured - handshakes and API requests will be refused");
    }

    // User context cache backs presence names and principals
    userctx::init_user_ctx_cache();

    // App service client for directory lookups, when configured
    match (&cfg.app_service_url, &cfg.cloud_auth_jwt_secret) {
        (Some(url), Some(secret)) => {
            match app_service_client::init_app_service_client(
                url.clone(),
                secret.clone(),
                cfg.cloud_service_name.clone(),
            ) {
                Ok(()) => info!("App service client initialized for {}", url),
                Err(e) => error!("Failed to initialize app service client: {}", e),
            }
        }
        _ => warn!("No app service configured - presence will show raw user ids"),
    }

    info!(
        "Fan-out scope: {} (echo_broadcasts={})",
        cfg.channel_scope, cfg.echo_broadcasts
    );

    // Wire the realtime components and assemble the router
    let state = AppState::new(cfg.clone());
    let app_routes = app(state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(cfg.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", cfg.server_address()));

    info!("🚀 Realtime service running on http://{}", cfg.server_address());
    info!("📡 WebSocket available at ws://{}/ws/{{project_id}}", cfg.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", cfg.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
