use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::ingest::{Event, SourceAdapter};
use crate::office::DispatcherConfig;

/// Source that replays one pre-built batch per poll, then goes quiet.
pub struct ScriptedSource {
    batches: VecDeque<Vec<Event>>,
    nudges: Rc<Cell<u32>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<Event>>) -> Self {
        Self {
            batches: batches.into(),
            nudges: Rc::new(Cell::new(0)),
        }
    }

    /// Shared counter of `nudge()` calls, readable after the source is boxed.
    pub fn nudges(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.nudges)
    }
}

impl SourceAdapter for ScriptedSource {
    fn source_name(&self) -> &str {
        "SCRIPTED"
    }

    fn poll(&mut self) -> Vec<Event> {
        self.batches.pop_front().unwrap_or_default()
    }

    fn status(&self) -> String {
        format!("{} batches left", self.batches.len())
    }

    fn nudge(&mut self) {
        self.nudges.set(self.nudges.get() + 1);
    }
}

/// Default office with a fixed seed.
pub fn seeded_config() -> DispatcherConfig {
    DispatcherConfig {
        seed: Some(7),
        ..Default::default()
    }
}

/// Seeded office where spawned subagents start without a tool.
pub fn bare_config() -> DispatcherConfig {
    DispatcherConfig {
        default_tools: Vec::new(),
        ..seeded_config()
    }
}
