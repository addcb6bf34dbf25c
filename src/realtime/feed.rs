use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{Event, Notification, NotificationPayload};

use super::error::RealtimeError;
use super::registry::{ConnTable, OutboundFrame};

/// Per-user notification mailbox. Insertion order defines display order.
/// Push delivery is dual: the mailbox append serves the REST pull side,
/// and users with live connections receive the notification immediately
/// as a realtime event.
pub struct NotificationFeed {
    feeds: RwLock<HashMap<String, Vec<Notification>>>,
    conns: ConnTable,
}

impl NotificationFeed {
    pub fn new(conns: ConnTable) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            conns,
        }
    }

    /// A user's notifications in insertion order
    pub async fn list(&self, user_id: &str) -> Vec<Notification> {
        self.feeds
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mark a notification read. Marking an already-read notification is
    /// a no-op success.
    pub async fn mark_read(&self, user_id: &str, id: &str) -> Result<(), RealtimeError> {
        let mut feeds = self.feeds.write().await;
        let feed = feeds
            .get_mut(user_id)
            .ok_or_else(|| RealtimeError::NotFound(id.to_string()))?;
        match feed.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                Ok(())
            }
            None => Err(RealtimeError::NotFound(id.to_string())),
        }
    }

    /// Permanently remove a notification from a user's feed
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), RealtimeError> {
        let mut feeds = self.feeds.write().await;
        let feed = feeds
            .get_mut(user_id)
            .ok_or_else(|| RealtimeError::NotFound(id.to_string()))?;
        match feed.iter().position(|n| n.id == id) {
            Some(index) => {
                feed.remove(index);
                Ok(())
            }
            None => Err(RealtimeError::NotFound(id.to_string())),
        }
    }

    /// Append a notification to a user's feed and deliver it immediately
    /// to each of the user's live connections. Returns the number of live
    /// deliveries.
    pub async fn push(&self, user_id: &str, notification: Notification) -> usize {
        let event = Event::NotificationUpdate(NotificationPayload {
            id: notification.id.clone(),
            notif_type: notification.notif_type.clone(),
            message: notification.message.clone(),
            user_id: Some(user_id.to_string()),
        });

        self.feeds
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(notification);

        let frame: OutboundFrame = match serde_json::to_string(&event) {
            Ok(text) => Arc::new(text),
            Err(e) => {
                warn!("Failed to serialize notification event: {}", e);
                return 0;
            }
        };

        let targets: Vec<_> = {
            let conns = self.conns.read().await;
            conns
                .values()
                .filter(|conn| conn.user_id == user_id)
                .map(|conn| (conn.conn_id, conn.outbound.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (conn_id, outbound) in targets {
            match outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Skipping notification delivery to {}: {}", conn_id, e),
            }
        }
        delivered
    }

    /// Number of users with a non-empty feed
    pub async fn feed_count(&self) -> usize {
        self.feeds
            .read()
            .await
            .values()
            .filter(|feed| !feed.is_empty())
            .count()
    }
}
