use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::models::PresenceResponse;
use crate::AppState;

/// Current collaborators on a project
pub async fn project_presence(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Json<PresenceResponse> {
    let channel = state.hub.scope().channel_for(&project_id);
    let users = state.presence.collaborators(&channel).await;
    Json(PresenceResponse { project_id, users })
}
