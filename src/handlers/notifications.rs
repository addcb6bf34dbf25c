use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::{ErrorResponse, NotificationListResponse};
use crate::realtime::error::RealtimeError;
use crate::AppState;

fn not_found(error: RealtimeError) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::NOT_FOUND;
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: error.to_string(),
        }),
    )
}

/// List the authenticated user's notification feed
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user_uid): Extension<String>,
) -> Json<NotificationListResponse> {
    let notifications = state.notifications.list(&user_uid).await;
    Json(NotificationListResponse { notifications })
}

/// Mark a notification as read
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(user_uid): Extension<String>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    match state.notifications.mark_read(&user_uid, &id).await {
        Ok(()) => {
            info!("Notification {} marked read for {}", id, user_uid);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(not_found(e)),
    }
}

/// Permanently delete a notification
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(user_uid): Extension<String>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    match state.notifications.delete(&user_uid, &id).await {
        Ok(()) => {
            info!("Notification {} deleted for {}", id, user_uid);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(not_found(e)),
    }
}
