use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A notification in a user's feed
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notif_type: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Response for the notification feed listing
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
}
