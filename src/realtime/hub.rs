use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Event, Notification, UserPresencePayload};

use super::error::RealtimeError;
use super::feed::NotificationFeed;
use super::presence::PresenceTracker;
use super::registry::Connection;
use super::router::{channel_project_id, ChannelRouter, ChannelScope, GLOBAL_CHANNEL};

/// Receives inbound frames from connections, classifies them by kind and
/// republishes through the Channel Router. Owns no state beyond the
/// wiring; events are transient and are dropped once published. Per
/// sender, events publish in submission order (each connection's inbound
/// stream is one sequential task); across senders no relative order is
/// guaranteed.
pub struct EventHub {
    router: Arc<ChannelRouter>,
    feed: Arc<NotificationFeed>,
    presence: Arc<PresenceTracker>,
    scope: ChannelScope,
}

impl EventHub {
    pub fn new(
        router: Arc<ChannelRouter>,
        feed: Arc<NotificationFeed>,
        presence: Arc<PresenceTracker>,
        scope: ChannelScope,
    ) -> Self {
        Self {
            router,
            feed,
            presence,
            scope,
        }
    }

    pub fn scope(&self) -> ChannelScope {
        self.scope
    }

    /// Validate and dispatch one inbound frame. An unknown or malformed
    /// kind fails with `UnknownEventKind`; the frame is dropped, never
    /// queued or retried.
    pub async fn submit(&self, origin: &Connection, frame: &str) -> Result<usize, RealtimeError> {
        let event = Event::from_frame(frame)?;
        debug!(
            "Event {} from connection {} ({})",
            event.kind(),
            origin.conn_id,
            origin.user_id
        );
        Ok(self.dispatch(origin, event).await)
    }

    /// Route an already-validated event. Returns the number of members
    /// the event was handed to.
    pub async fn dispatch(&self, origin: &Connection, event: Event) -> usize {
        match &event {
            Event::ProjectUpdate(payload) => {
                let channel = self.scope.channel_for(&payload.project_id);
                self.router
                    .publish(&channel, &event, Some(origin.conn_id))
                    .await
            }
            // An inbound presence frame is an explicit ping: answer with
            // the server-derived presence set, not the claimed one.
            Event::UserPresence(payload) => {
                let channel = self.scope.channel_for(&payload.project_id);
                self.broadcast_presence(&channel).await
            }
            Event::NewComment(payload) | Event::NotificationUpdate(payload) => {
                match payload.user_id.as_deref() {
                    Some(recipient) => {
                        let notification = Notification {
                            id: if payload.id.is_empty() {
                                Uuid::new_v4().to_string()
                            } else {
                                payload.id.clone()
                            },
                            notif_type: payload.notif_type.clone(),
                            message: payload.message.clone(),
                            read: false,
                            created_at: Utc::now(),
                        };
                        self.feed.push(recipient, notification).await
                    }
                    // Recipient-less notices stay transient and cross-cutting
                    None => {
                        self.router
                            .publish(GLOBAL_CHANNEL, &event, Some(origin.conn_id))
                            .await
                    }
                }
            }
        }
    }

    /// Publish the current presence set of a channel to its members
    pub async fn broadcast_presence(&self, channel: &str) -> usize {
        let users = self.presence.presence_users(channel).await;
        let event = Event::UserPresence(UserPresencePayload {
            project_id: channel_project_id(channel).to_string(),
            users,
        });
        self.router.publish(channel, &event, None).await
    }
}
