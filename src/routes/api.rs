use crate::handlers::{
    delete_notification, diagnostics, list_notifications, mark_notification_read, project_presence,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::AppState;
use axum::{middleware, routing::{delete, get, patch}, Router};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::<Arc<AppState>>::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/:id/read", patch(mark_notification_read))
        .route("/v1/notifications/:id", delete(delete_notification))
        .route("/v1/projects/:project_id/presence", get(project_presence))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn(auth_middleware)) // Applies to all routes added above
        .with_state(state)
}
