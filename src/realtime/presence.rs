use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{CollaboratorEntry, PresenceUser};

use super::hub::EventHub;
use super::registry::{ConnTable, RegistryEvent};
use super::router::ChannelRouter;

/// Derives who is currently active on a channel from live connection
/// membership. Presence is never stored: every query recomputes from the
/// connection table, so it is consistent within one registry-unregister
/// cycle and no stale entry can survive a disconnect.
pub struct PresenceTracker {
    conns: ConnTable,
    router: Arc<ChannelRouter>,
}

impl PresenceTracker {
    pub fn new(conns: ConnTable, router: Arc<ChannelRouter>) -> Self {
        Self { conns, router }
    }

    /// Connection counts per user identity on a channel, sorted by user id
    async fn counts(&self, channel: &str) -> BTreeMap<String, u32> {
        let members = self.router.members(channel).await;
        let conns = self.conns.read().await;
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for conn_id in members {
            if let Some(conn) = conns.get(&conn_id) {
                *counts.entry(conn.user_id.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// User identities currently present on a channel
    pub async fn current_presence(&self, channel: &str) -> Vec<String> {
        self.counts(channel).await.into_keys().collect()
    }

    /// Presence set with display names, as carried by user_presence events
    pub async fn presence_users(&self, channel: &str) -> Vec<PresenceUser> {
        let mut users = Vec::new();
        for user_id in self.current_presence(channel).await {
            let name = super::userctx::display_name(&user_id).await;
            users.push(PresenceUser { user_id, name });
        }
        users
    }

    /// Presence with per-user connection counts, for the REST listing
    pub async fn collaborators(&self, channel: &str) -> Vec<CollaboratorEntry> {
        let mut entries = Vec::new();
        for (user_id, connections) in self.counts(channel).await {
            let name = super::userctx::display_name(&user_id).await;
            entries.push(CollaboratorEntry {
                user_id,
                name,
                connections,
            });
        }
        entries
    }

    /// Consume registry lifecycle notifications and re-broadcast the
    /// presence set of every channel whose membership changed.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<RegistryEvent>,
        hub: Arc<EventHub>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                RegistryEvent::Joined { channel, .. } | RegistryEvent::Left { channel, .. } => {
                    hub.broadcast_presence(&channel).await;
                }
                RegistryEvent::Connected { conn_id, user_id } => {
                    debug!("Presence: connection {} opened by {}", conn_id, user_id);
                }
                RegistryEvent::Disconnected { conn_id, user_id } => {
                    debug!("Presence: connection {} closed by {}", conn_id, user_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::registry::{ConnTable, Connection};
    use chrono::Utc;
    use std::collections::HashMap;
    use tokio::sync::{mpsc, RwLock};
    use uuid::Uuid;

    async fn connect(conns: &ConnTable, router: &ChannelRouter, user_id: &str, channel: &str) -> Uuid {
        let conn_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        // Receiver dropped: presence queries never deliver frames
        conns.write().await.insert(
            conn_id,
            Connection {
                conn_id,
                user_id: user_id.to_string(),
                connected_at: Utc::now(),
                outbound: tx,
            },
        );
        router.join(conn_id, channel).await;
        conn_id
    }

    fn setup() -> (Arc<ChannelRouter>, ConnTable, PresenceTracker) {
        let conns: ConnTable = Arc::new(RwLock::new(HashMap::new()));
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let router = Arc::new(ChannelRouter::new(conns.clone(), events_tx, true));
        let presence = PresenceTracker::new(conns.clone(), router.clone());
        (router, conns, presence)
    }

    #[tokio::test]
    async fn presence_counts_duplicate_connections_per_user() {
        let (router, conns, presence) = setup();
        connect(&conns, &router, "alice", "project/p1").await;
        connect(&conns, &router, "alice", "project/p1").await;
        connect(&conns, &router, "bob", "project/p1").await;

        assert_eq!(presence.current_presence("project/p1").await, vec!["alice", "bob"]);
        let entries = presence.collaborators("project/p1").await;
        assert_eq!(entries[0].connections, 2);
        assert_eq!(entries[1].connections, 1);
    }

    #[tokio::test]
    async fn presence_reflects_disconnect_immediately() {
        let (router, conns, presence) = setup();
        let a = connect(&conns, &router, "alice", "project/p1").await;
        connect(&conns, &router, "bob", "project/p1").await;

        router.leave_all(a).await;
        conns.write().await.remove(&a);

        assert_eq!(presence.current_presence("project/p1").await, vec!["bob"]);
    }

    #[tokio::test]
    async fn net_positive_joins_define_membership() {
        let (router, conns, presence) = setup();
        let a = connect(&conns, &router, "alice", "project/p1").await;
        // duplicate joins then interleaved leaves
        router.join(a, "project/p1").await;
        router.join(a, "project/p1").await;
        router.leave(a, "project/p1").await;

        assert!(presence.current_presence("project/p1").await.is_empty());
    }

    #[tokio::test]
    async fn names_fall_back_to_identity_without_directory() {
        let (router, conns, presence) = setup();
        connect(&conns, &router, "u-42", "project/p1").await;
        let users = presence.presence_users("project/p1").await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "u-42");
    }
}
