use serde_json::Value;
use std::collections::HashMap;

use crate::models::{ElementChange, Event, ProjectUpdatePayload};

/// Client-side optimistic view of one project's canvas.
///
/// Local mutations apply immediately; incoming project_update events
/// merge by element identity with a shallow field overwrite, last writer
/// wins. The server echoes a sender's own change back (identity match,
/// not origin), so re-applying an identical state must be a no-op — the
/// merge is idempotent by construction. There is no acknowledgement or
/// retry: a lost event leaves the local optimistic state as the only
/// record.
#[derive(Debug, Default)]
pub struct CanvasReplica {
    project_id: String,
    elements: HashMap<String, Value>,
}

impl CanvasReplica {
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            elements: HashMap::new(),
        }
    }

    /// Seed the replica from the persistence store, as done on connect
    pub fn from_elements<I>(project_id: &str, elements: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            project_id: project_id.to_string(),
            elements: elements.into_iter().collect(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn element(&self, element_id: &str) -> Option<&Value> {
        self.elements.get(element_id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Apply a local user action optimistically and return the event to
    /// submit over the connection.
    pub fn apply_local(&mut self, element_id: &str, state: Value) -> Event {
        self.merge(element_id, &state);
        Event::ProjectUpdate(ProjectUpdatePayload {
            project_id: self.project_id.clone(),
            change: ElementChange {
                element_id: element_id.to_string(),
                new_state: state,
            },
        })
    }

    /// Merge a received project_update into the local view. Updates for
    /// other projects are ignored.
    pub fn apply_remote(&mut self, update: &ProjectUpdatePayload) {
        if update.project_id != self.project_id {
            return;
        }
        self.merge(&update.change.element_id, &update.change.new_state);
    }

    fn merge(&mut self, element_id: &str, new_state: &Value) {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (self.elements.get_mut(element_id), new_state)
        {
            // shallow field overwrite, no conflict detection
            for (key, value) in incoming {
                existing.insert(key.clone(), value.clone());
            }
            return;
        }
        self.elements
            .insert(element_id.to_string(), new_state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(project_id: &str, element_id: &str, state: Value) -> ProjectUpdatePayload {
        ProjectUpdatePayload {
            project_id: project_id.to_string(),
            change: ElementChange {
                element_id: element_id.to_string(),
                new_state: state,
            },
        }
    }

    #[test]
    fn remote_update_inserts_missing_element() {
        let mut replica = CanvasReplica::new("p1");
        replica.apply_remote(&update("p1", "e1", json!({"color": "blue"})));
        assert_eq!(replica.element("e1").unwrap()["color"], "blue");
    }

    #[test]
    fn merge_overwrites_shallow_fields_and_keeps_others() {
        let mut replica =
            CanvasReplica::from_elements("p1", [("e1".to_string(), json!({"x": 10, "color": "red"}))]);
        replica.apply_remote(&update("p1", "e1", json!({"color": "blue"})));

        let element = replica.element("e1").unwrap();
        assert_eq!(element["color"], "blue");
        assert_eq!(element["x"], 10);
    }

    #[test]
    fn applying_the_same_update_twice_is_idempotent() {
        let mut replica = CanvasReplica::new("p1");
        let u = update("p1", "e1", json!({"color": "blue", "w": 120}));
        replica.apply_remote(&u);
        let once = replica.element("e1").cloned();
        replica.apply_remote(&u);
        assert_eq!(replica.element("e1").cloned(), once);
    }

    #[test]
    fn own_echo_is_a_noop() {
        let mut replica = CanvasReplica::new("p1");
        let event = replica.apply_local("e1", json!({"color": "blue"}));
        let after_local = replica.element("e1").cloned();

        // the server echoes the sender's own change back
        match event {
            Event::ProjectUpdate(payload) => replica.apply_remote(&payload),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(replica.element("e1").cloned(), after_local);
    }

    #[test]
    fn concurrent_writers_last_writer_wins() {
        let mut replica = CanvasReplica::new("p1");
        replica.apply_remote(&update("p1", "e1", json!({"color": "blue"})));
        replica.apply_remote(&update("p1", "e1", json!({"color": "green"})));
        assert_eq!(replica.element("e1").unwrap()["color"], "green");
    }

    #[test]
    fn updates_for_other_projects_are_ignored() {
        let mut replica = CanvasReplica::new("p1");
        replica.apply_remote(&update("p2", "e1", json!({"color": "blue"})));
        assert!(replica.is_empty());
    }

    #[test]
    fn non_object_state_is_replaced_wholesale() {
        let mut replica =
            CanvasReplica::from_elements("p1", [("e1".to_string(), json!({"color": "red"}))]);
        replica.apply_remote(&update("p1", "e1", json!("tombstone")));
        assert_eq!(replica.element("e1").unwrap(), &json!("tombstone"));
    }
}
