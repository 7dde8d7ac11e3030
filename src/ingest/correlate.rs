//! Deferred completion for subagents whose own activity is invisible.
//!
//! Some sources only report that the parent's call resolved, never that the
//! subagents it launched finished. Spawns are recorded here under the
//! parent's native call id; when that id resolves, every child gets a
//! synthetic `ToolEnded` + `TurnEnded`.

use std::collections::HashMap;

use super::Event;

#[derive(Debug, Default)]
pub struct PendingSpawns {
    by_call: HashMap<String, Vec<String>>,
}

impl PendingSpawns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Child id for the `index`-th subagent launched by `call_id`.
    pub fn child_id(call_id: &str, index: usize) -> String {
        format!("task-{call_id}-{index}")
    }

    /// Build a correlated spawn event and remember the child under `call_id`.
    pub fn spawn(
        &mut self,
        call_id: &str,
        parent_id: &str,
        subagent_type: &str,
        description: &str,
        tool_name: Option<String>,
    ) -> Event {
        let children = self.by_call.entry(call_id.to_string()).or_default();
        let child_id = Self::child_id(call_id, children.len());
        children.push(child_id.clone());
        Event::SpawnSubagent {
            parent_id: parent_id.to_string(),
            subagent_type: subagent_type.to_string(),
            description: description.to_string(),
            tool_name,
            child_id: Some(child_id),
        }
    }

    /// Completion events for every child of `call_id`; forgets the call.
    /// Unknown call ids yield nothing.
    pub fn resolve(&mut self, call_id: &str) -> Vec<Event> {
        let Some(children) = self.by_call.remove(call_id) else {
            return Vec::new();
        };
        children
            .iter()
            .flat_map(|child| [Event::tool_ended(child), Event::turn_ended(child)])
            .collect()
    }

    pub fn is_pending(&self, call_id: &str) -> bool {
        self.by_call.contains_key(call_id)
    }

    /// Number of calls still waiting for resolution.
    pub fn outstanding(&self) -> usize {
        self.by_call.len()
    }
}
