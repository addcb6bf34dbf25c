use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::realtime::error::RealtimeError;

/// Raw wire envelope as received from a client, before the kind is checked.
#[derive(Serialize, Deserialize, Debug)]
pub struct RawEnvelope {
    pub kind: String,
    pub payload: Value,
}

/// A single element mutation within a project
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElementChange {
    pub element_id: String,
    pub new_state: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectUpdatePayload {
    pub project_id: String,
    pub change: ElementChange,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PresenceUser {
    pub user_id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserPresencePayload {
    pub project_id: String,
    pub users: Vec<PresenceUser>,
}

/// Payload of new_comment / notification_update events.
/// `user_id` addresses the notification to one recipient; without it the
/// event is a transient broadcast notice.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub notif_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A transient realtime event, tagged by kind.
/// Serializes to the wire envelope `{"kind": ..., "payload": {...}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Event {
    ProjectUpdate(ProjectUpdatePayload),
    UserPresence(UserPresencePayload),
    NewComment(NotificationPayload),
    NotificationUpdate(NotificationPayload),
}

impl Event {
    /// Parse a raw inbound frame. Unknown or malformed kinds are rejected
    /// with `UnknownEventKind`; the frame is dropped by the caller.
    pub fn from_frame(text: &str) -> Result<Event, RealtimeError> {
        let envelope: RawEnvelope = serde_json::from_str(text)
            .map_err(|_| RealtimeError::UnknownEventKind("<unparseable>".to_string()))?;
        Event::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: RawEnvelope) -> Result<Event, RealtimeError> {
        let RawEnvelope { kind, payload } = envelope;
        let parsed = match kind.as_str() {
            "project_update" => serde_json::from_value(payload).map(Event::ProjectUpdate),
            "user_presence" => serde_json::from_value(payload).map(Event::UserPresence),
            "new_comment" => serde_json::from_value(payload).map(Event::NewComment),
            "notification_update" => serde_json::from_value(payload).map(Event::NotificationUpdate),
            _ => return Err(RealtimeError::UnknownEventKind(kind)),
        };
        parsed.map_err(|_| RealtimeError::UnknownEventKind(kind))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::ProjectUpdate(_) => "project_update",
            Event::UserPresence(_) => "user_presence",
            Event::NewComment(_) => "new_comment",
            Event::NotificationUpdate(_) => "notification_update",
        }
    }

    /// Project the event belongs to, when it carries one
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Event::ProjectUpdate(p) => Some(&p.project_id),
            Event::UserPresence(p) => Some(&p.project_id),
            Event::NewComment(_) | Event::NotificationUpdate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_update_envelope_round_trips() {
        let text = r#"{"kind":"project_update","payload":{"project_id":"p1","change":{"element_id":"e1","new_state":{"color":"blue"}}}}"#;
        let event = Event::from_frame(text).unwrap();
        match &event {
            Event::ProjectUpdate(p) => {
                assert_eq!(p.project_id, "p1");
                assert_eq!(p.change.element_id, "e1");
                assert_eq!(p.change.new_state["color"], "blue");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        let serialized = serde_json::to_value(&event).unwrap();
        assert_eq!(serialized["kind"], "project_update");
        assert_eq!(serialized["payload"]["change"]["element_id"], "e1");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let text = r#"{"kind":"cursor_moved","payload":{}}"#;
        match Event::from_frame(text) {
            Err(RealtimeError::UnknownEventKind(kind)) => assert_eq!(kind, "cursor_moved"),
            other => panic!("expected UnknownEventKind, got {:?}", other),
        }
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let text = r#"{"kind":"project_update","payload":{"nope":true}}"#;
        assert!(matches!(
            Event::from_frame(text),
            Err(RealtimeError::UnknownEventKind(_))
        ));
    }

    #[test]
    fn notification_payload_recipient_is_optional() {
        let text = r#"{"kind":"new_comment","payload":{"id":"n1","type":"mention","message":"hi"}}"#;
        let event = Event::from_frame(text).unwrap();
        match event {
            Event::NewComment(p) => {
                assert_eq!(p.notif_type, "mention");
                assert!(p.user_id.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
