use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::models::Event;

use super::registry::{ConnTable, FrameSender, OutboundFrame, RegistryEvent};

/// Channel carrying cross-cutting notices; every connection is a member.
pub const GLOBAL_CHANNEL: &str = "global";

pub fn project_channel(project_id: &str) -> String {
    format!("project/{}", project_id)
}

/// Project id a channel belongs to; the global channel maps to itself.
pub fn channel_project_id(channel: &str) -> &str {
    channel.strip_prefix("project/").unwrap_or(channel)
}

/// Fan-out scope. `Project` routes events to per-project channels;
/// `Global` reproduces the legacy broadcast-to-everyone behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    Project,
    Global,
}

impl ChannelScope {
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("global") {
            ChannelScope::Global
        } else {
            ChannelScope::Project
        }
    }

    /// Target channel for an event carrying this project id
    pub fn channel_for(&self, project_id: &str) -> String {
        match self {
            ChannelScope::Project => project_channel(project_id),
            ChannelScope::Global => GLOBAL_CHANNEL.to_string(),
        }
    }
}

/// Maps published events to the member connections of a channel
pub struct ChannelRouter {
    channels: RwLock<HashMap<String, HashSet<Uuid>>>,
    conns: ConnTable,
    events_tx: mpsc::UnboundedSender<RegistryEvent>,
    echo_broadcasts: bool,
}

impl ChannelRouter {
    pub fn new(
        conns: ConnTable,
        events_tx: mpsc::UnboundedSender<RegistryEvent>,
        echo_broadcasts: bool,
    ) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            conns,
            events_tx,
            echo_broadcasts,
        }
    }

    /// Add a connection to a channel. Joining twice has no additional
    /// effect.
    pub async fn join(&self, conn_id: Uuid, channel: &str) {
        let inserted = {
            let mut channels = self.channels.write().await;
            channels
                .entry(channel.to_string())
                .or_default()
                .insert(conn_id)
        };
        if inserted {
            debug!("Connection {} joined channel {}", conn_id, channel);
            let _ = self.events_tx.send(RegistryEvent::Joined {
                conn_id,
                channel: channel.to_string(),
            });
        }
    }

    /// Remove a connection from a channel. Leaving a channel the
    /// connection is not a member of is a no-op.
    pub async fn leave(&self, conn_id: Uuid, channel: &str) {
        let removed = {
            let mut channels = self.channels.write().await;
            match channels.get_mut(channel) {
                Some(members) => {
                    let removed = members.remove(&conn_id);
                    if members.is_empty() {
                        channels.remove(channel);
                    }
                    removed
                }
                None => false,
            }
        };
        if removed {
            debug!("Connection {} left channel {}", conn_id, channel);
            let _ = self.events_tx.send(RegistryEvent::Left {
                conn_id,
                channel: channel.to_string(),
            });
        }
    }

    /// Remove a connection from every channel, returning the channels it
    /// was a member of.
    pub async fn leave_all(&self, conn_id: Uuid) -> Vec<String> {
        let mut left = Vec::new();
        {
            let mut channels = self.channels.write().await;
            channels.retain(|name, members| {
                if members.remove(&conn_id) {
                    left.push(name.clone());
                }
                !members.is_empty()
            });
        }
        for channel in &left {
            debug!("Connection {} left channel {}", conn_id, channel);
            let _ = self.events_tx.send(RegistryEvent::Left {
                conn_id,
                channel: channel.clone(),
            });
        }
        left
    }

    /// Membership snapshot of a channel
    pub async fn members(&self, channel: &str) -> Vec<Uuid> {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Deliver an event to every member of a channel, fire-and-forget.
    ///
    /// The membership set is snapshotted before fan-out: a join racing
    /// with this call does not receive the event. A member with a closed
    /// or full outbound queue never blocks delivery to the others; full
    /// queues tear the slow member down (disconnect-on-overflow).
    ///
    /// Returns the number of members the event was handed to.
    pub async fn publish(&self, channel: &str, event: &Event, origin: Option<Uuid>) -> usize {
        let members = self.members(channel).await;
        if members.is_empty() {
            return 0;
        }

        let frame: OutboundFrame = match serde_json::to_string(event) {
            Ok(text) => Arc::new(text),
            Err(e) => {
                error!("Failed to serialize {} event: {}", event.kind(), e);
                return 0;
            }
        };

        let skip_origin = if self.echo_broadcasts { None } else { origin };
        let targets: Vec<(Uuid, FrameSender)> = {
            let conns = self.conns.read().await;
            members
                .iter()
                .filter(|conn_id| Some(**conn_id) != skip_origin)
                .filter_map(|conn_id| {
                    conns
                        .get(conn_id)
                        .map(|conn| (*conn_id, conn.outbound.clone()))
                })
                .collect()
        };

        let mut delivered = 0;
        let mut dead: Vec<Uuid> = Vec::new();
        for (conn_id, outbound) in targets {
            match outbound.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "Outbound queue full for connection {}, disconnecting slow consumer",
                        conn_id
                    );
                    dead.push(conn_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Dropping delivery to closed connection {}", conn_id);
                    dead.push(conn_id);
                }
            }
        }

        // Reap members whose transport is gone or hopelessly behind. The
        // socket task observes its queue closing and finishes cleanup.
        for conn_id in dead {
            self.conns.write().await.remove(&conn_id);
            self.leave_all(conn_id).await;
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementChange, ProjectUpdatePayload};
    use crate::realtime::registry::Connection;
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn sample_event() -> Event {
        Event::ProjectUpdate(ProjectUpdatePayload {
            project_id: "p1".to_string(),
            change: ElementChange {
                element_id: "e1".to_string(),
                new_state: serde_json::json!({"color": "blue"}),
            },
        })
    }

    fn setup(echo: bool) -> (Arc<ChannelRouter>, ConnTable) {
        let conns: ConnTable = Arc::new(RwLock::new(HashMap::new()));
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let router = Arc::new(ChannelRouter::new(conns.clone(), events_tx, echo));
        (router, conns)
    }

    async fn connect(
        conns: &ConnTable,
        user_id: &str,
        capacity: usize,
    ) -> (Uuid, mpsc::Receiver<OutboundFrame>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        conns.write().await.insert(
            conn_id,
            Connection {
                conn_id,
                user_id: user_id.to_string(),
                connected_at: Utc::now(),
                outbound: tx,
            },
        );
        (conn_id, rx)
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let (router, conns) = setup(true);
        let (conn_id, _rx) = connect(&conns, "u1", 8).await;
        router.join(conn_id, "project/p1").await;
        router.join(conn_id, "project/p1").await;
        assert_eq!(router.members("project/p1").await.len(), 1);
    }

    #[tokio::test]
    async fn leave_non_member_is_noop() {
        let (router, conns) = setup(true);
        let (conn_id, _rx) = connect(&conns, "u1", 8).await;
        router.leave(conn_id, "project/p1").await;
        assert!(router.members("project/p1").await.is_empty());
    }

    #[tokio::test]
    async fn publish_reaches_all_members_including_origin() {
        let (router, conns) = setup(true);
        let (a, mut rx_a) = connect(&conns, "alice", 8).await;
        let (b, mut rx_b) = connect(&conns, "bob", 8).await;
        let (c, mut rx_c) = connect(&conns, "carol", 8).await;
        for conn_id in [a, b, c] {
            router.join(conn_id, "project/p1").await;
        }

        let delivered = router.publish("project/p1", &sample_event(), Some(a)).await;
        assert_eq!(delivered, 3);
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let frame = rx.try_recv().unwrap();
            assert!(frame.contains("\"project_update\""));
        }
    }

    #[tokio::test]
    async fn publish_can_exclude_origin() {
        let (router, conns) = setup(false);
        let (a, mut rx_a) = connect(&conns, "alice", 8).await;
        let (b, mut rx_b) = connect(&conns, "bob", 8).await;
        router.join(a, "project/p1").await;
        router.join(b, "project/p1").await;

        let delivered = router.publish("project/p1", &sample_event(), Some(a)).await;
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn publish_misses_post_snapshot_joiner() {
        let (router, conns) = setup(true);
        let (a, mut rx_a) = connect(&conns, "alice", 8).await;
        let (b, mut rx_b) = connect(&conns, "bob", 8).await;
        router.join(a, "project/p1").await;

        let delivered = router.publish("project/p1", &sample_event(), None).await;
        router.join(b, "project/p1").await;

        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_disconnects_slow_consumer_without_failing_publish() {
        let (router, conns) = setup(true);
        let (slow, mut _rx_slow) = connect(&conns, "slow", 1).await;
        let (fast, mut rx_fast) = connect(&conns, "fast", 8).await;
        router.join(slow, "project/p1").await;
        router.join(fast, "project/p1").await;

        // First publish fills the slow member's queue of one
        let first = router.publish("project/p1", &sample_event(), None).await;
        assert_eq!(first, 2);

        // Second publish overflows it; the slow member is reaped, the
        // fast one still receives
        let second = router.publish("project/p1", &sample_event(), None).await;
        assert_eq!(second, 1);
        assert!(conns.read().await.get(&slow).is_none());
        assert!(router.members("project/p1").await.contains(&fast));
        assert!(rx_fast.try_recv().is_ok());
    }

    #[tokio::test]
    async fn publish_to_empty_channel_delivers_nothing() {
        let (router, _conns) = setup(true);
        assert_eq!(router.publish("project/ghost", &sample_event(), None).await, 0);
    }
}
