use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config;
use crate::realtime::registry::OutboundFrame;
use crate::realtime::router::project_channel;
use crate::services::auth_service::{claims_user_id, token_from_headers, validate_jwt};
use crate::AppState;

#[derive(Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// WebSocket handler. The handshake runs the same token validation as
/// the REST middleware; a missing or invalid token refuses the upgrade.
pub async fn websocket_handler(
    Path(project_id): Path<String>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    info!("New WebSocket connection attempt for project {}", project_id);

    let user_id = match authorize_handshake(&headers, params.token.as_deref()) {
        Ok(user_id) => user_id,
        Err(reason) => {
            warn!("WebSocket handshake refused: {}", reason);
            return (StatusCode::UNAUTHORIZED, reason).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, project_id, user_id, state))
}

fn authorize_handshake(headers: &HeaderMap, query_token: Option<&str>) -> Result<String, &'static str> {
    // The browser client passes the token as a query parameter; server
    // side callers may use the Authorization header or cookie instead.
    let token = match query_token {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => token_from_headers(headers).ok_or("No identity token supplied at handshake")?,
    };

    let config = config::get_config();
    let secret = config
        .cloud_auth_jwt_secret
        .as_ref()
        .ok_or("Cloud auth JWT secret not configured")?;

    let token_data = validate_jwt(&token, secret).map_err(|_| "Invalid identity token")?;
    claims_user_id(&token_data).ok_or("Token carries no user identity claim")
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, project_id: String, user_id: String, state: Arc<AppState>) {

    // Generate unique connection ID to identify this client
    let conn_id = Uuid::new_v4();
    info!(
        "WebSocket connection established: conn={} user={} project={}",
        conn_id, user_id, project_id
    );

    // Bounded outbound queue; the router disconnects members that fall
    // too far behind rather than buffering without limit
    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<OutboundFrame>(state.config.outbound_queue_depth);

    let conn = match state.sessions.register(conn_id, &user_id, outbound_tx).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Failed to register connection {}: {}", conn_id, e);
            return;
        }
    };

    // Under project scope the connection is also a member of the channel
    // of the project it opened
    if state.config.is_project_scoped() {
        state.channels.join(conn_id, &project_channel(&project_id)).await;
    }

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Drain the outbound queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sender.send(Message::Text((*frame).clone())).await.is_err() {
                break;
            }
        }
    });

    // Process inbound frames sequentially: per-sender publish order
    // follows from this loop
    let recv_state = state.clone();
    let recv_conn = conn.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                // Control and binary frames carry no events
                _ => continue,
            };
            match recv_state.hub.submit(&recv_conn, &text).await {
                Ok(delivered) => {
                    debug!("Event from {} handed to {} members", recv_conn.conn_id, delivered)
                }
                // A bad event is dropped, the connection lives on
                Err(e) => warn!("Dropping event from {}: {}", recv_conn.conn_id, e),
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Prompt unregistration propagates the presence change to the
    // remaining channel members
    state.sessions.unregister(conn_id).await;
    info!("WebSocket connection terminated: conn={} user={}", conn_id, user_id);
}
