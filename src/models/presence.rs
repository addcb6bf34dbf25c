use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One collaborator currently present on a project
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CollaboratorEntry {
    pub user_id: String,
    pub name: String,
    pub connections: u32,
}

/// Response for the project presence listing
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PresenceResponse {
    pub project_id: String,
    pub users: Vec<CollaboratorEntry>,
}
