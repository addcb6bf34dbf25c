use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::RealtimeError;
use super::router::{ChannelRouter, GLOBAL_CHANNEL};

/// Serialized outbound frame, shared across every receiving connection
pub type OutboundFrame = Arc<String>;
pub type FrameSender = mpsc::Sender<OutboundFrame>;

/// Shared table of live connections. The Session Registry owns its
/// lifecycle; the Channel Router and Notification Feed read it for
/// delivery and may reap entries whose transport is gone.
pub type ConnTable = Arc<RwLock<HashMap<Uuid, Connection>>>;

/// One live realtime session between a client and the server
#[derive(Clone, Debug)]
pub struct Connection {
    pub conn_id: Uuid,
    pub user_id: String,
    pub connected_at: DateTime<Utc>,
    pub outbound: FrameSender,
}

/// Lifecycle notifications consumed by the Presence Tracker
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Connected { conn_id: Uuid, user_id: String },
    Joined { conn_id: Uuid, channel: String },
    Left { conn_id: Uuid, channel: String },
    Disconnected { conn_id: Uuid, user_id: String },
}

/// Tracks every open realtime connection and its claimed identity
pub struct SessionRegistry {
    conns: ConnTable,
    router: Arc<ChannelRouter>,
    events_tx: mpsc::UnboundedSender<RegistryEvent>,
}

impl SessionRegistry {
    pub fn new(
        conns: ConnTable,
        router: Arc<ChannelRouter>,
        events_tx: mpsc::UnboundedSender<RegistryEvent>,
    ) -> Self {
        Self {
            conns,
            router,
            events_tx,
        }
    }

    /// Register a connection under its claimed identity and add it to the
    /// global channel.
    pub async fn register(
        &self,
        conn_id: Uuid,
        user_id: &str,
        outbound: FrameSender,
    ) -> Result<Connection, RealtimeError> {
        if user_id.is_empty() {
            return Err(RealtimeError::IdentityRequired);
        }

        let conn = Connection {
            conn_id,
            user_id: user_id.to_string(),
            connected_at: Utc::now(),
            outbound,
        };

        {
            let mut conns = self.conns.write().await;
            if conns.contains_key(&conn_id) {
                return Err(RealtimeError::AlreadyRegistered);
            }
            conns.insert(conn_id, conn.clone());
        }

        let _ = self.events_tx.send(RegistryEvent::Connected {
            conn_id,
            user_id: conn.user_id.clone(),
        });

        self.router.join(conn_id, GLOBAL_CHANNEL).await;

        info!("Registered connection {} for user {}", conn_id, user_id);
        Ok(conn)
    }

    /// Unregister a connection. Idempotent; removes all channel
    /// memberships, which propagates a presence change to the remaining
    /// members of those channels.
    pub async fn unregister(&self, conn_id: Uuid) {
        self.router.leave_all(conn_id).await;

        let removed = self.conns.write().await.remove(&conn_id);
        match removed {
            Some(conn) => {
                let _ = self.events_tx.send(RegistryEvent::Disconnected {
                    conn_id,
                    user_id: conn.user_id.clone(),
                });
                info!("Unregistered connection {} for user {}", conn_id, conn.user_id);
            }
            None => debug!("Unregister for unknown connection {}", conn_id),
        }
    }

    pub async fn lookup(&self, conn_id: Uuid) -> Option<Connection> {
        self.conns.read().await.get(&conn_id).cloned()
    }

    pub async fn conn_count(&self) -> usize {
        self.conns.read().await.len()
    }

    /// Distinct user identities with at least one live connection
    pub async fn distinct_users(&self) -> usize {
        let conns = self.conns.read().await;
        let mut users: Vec<&str> = conns.values().map(|c| c.user_id.as_str()).collect();
        users.sort_unstable();
        users.dedup();
        users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn setup() -> (SessionRegistry, mpsc::UnboundedReceiver<RegistryEvent>) {
        let conns: ConnTable = Arc::new(RwLock::new(HashMap::new()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let router = Arc::new(ChannelRouter::new(conns.clone(), events_tx.clone(), true));
        let registry = SessionRegistry::new(conns, router, events_tx);
        (registry, events_rx)
    }

    fn frame_sender() -> FrameSender {
        mpsc::channel(8).0
    }

    #[tokio::test]
    async fn register_requires_identity() {
        let (registry, _rx) = setup();
        let err = registry
            .register(Uuid::new_v4(), "", frame_sender())
            .await
            .unwrap_err();
        assert_eq!(err, RealtimeError::IdentityRequired);
    }

    #[tokio::test]
    async fn duplicate_register_fails() {
        let (registry, _rx) = setup();
        let conn_id = Uuid::new_v4();
        registry
            .register(conn_id, "u1", frame_sender())
            .await
            .unwrap();
        let err = registry
            .register(conn_id, "u1", frame_sender())
            .await
            .unwrap_err();
        assert_eq!(err, RealtimeError::AlreadyRegistered);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let (registry, _rx) = setup();
        let conn_id = Uuid::new_v4();
        registry
            .register(conn_id, "u1", frame_sender())
            .await
            .unwrap();
        registry.unregister(conn_id).await;
        registry.unregister(conn_id).await;
        assert!(registry.lookup(conn_id).await.is_none());
        assert_eq!(registry.conn_count().await, 0);
    }

    #[tokio::test]
    async fn register_emits_connected_and_global_join() {
        let (registry, mut rx) = setup();
        let conn_id = Uuid::new_v4();
        registry
            .register(conn_id, "u1", frame_sender())
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            RegistryEvent::Connected { user_id, .. } => assert_eq!(user_id, "u1"),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.recv().await.unwrap() {
            RegistryEvent::Joined { channel, .. } => assert_eq!(channel, GLOBAL_CHANNEL),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
