use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{Event, SourceAdapter, MAIN_AGENT};

const DEMO_TOOLS: &[&str] = &[
    "Read", "Edit", "Bash", "Grep", "Glob", "Write", "WebSearch", "WebFetch", "Task",
];
const SUB_TYPES: &[&str] = &["Explore", "general-purpose", "Plan", "Bash"];
const WAIT_TOOLS: &[&str] = &["Edit", "Bash", "permission"];
const MAX_SUBS: usize = 3;

/// Synthetic activity for demos and manual testing.
pub struct DemoSource {
    rng: StdRng,
    next_at: Instant,
    spawned: usize,
    alive: Vec<String>,
    active: BTreeMap<String, String>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            next_at: Instant::now() + Duration::from_millis(1500),
            spawned: 0,
            alive: Vec::new(),
            active: BTreeMap::new(),
        }
    }

    fn pick_tool(&mut self) -> String {
        let plain: Vec<&str> = DEMO_TOOLS.iter().copied().filter(|t| *t != "Task").collect();
        plain.choose(&mut self.rng).copied().unwrap_or("Read").to_string()
    }

    fn pick_alive(&mut self) -> Option<String> {
        self.alive.choose(&mut self.rng).cloned()
    }

    /// One round of activity, regardless of the clock.
    pub fn next_batch(&mut self) -> Vec<Event> {
        let r: f64 = self.rng.gen();
        let mut events = Vec::new();

        if r < 0.30 {
            let tool = DEMO_TOOLS.choose(&mut self.rng).copied().unwrap_or("Read");
            if tool == "Task" && self.spawned < MAX_SUBS {
                self.spawned += 1;
                let child = format!("demo-{}", self.spawned);
                let sub_type = SUB_TYPES.choose(&mut self.rng).copied().unwrap_or("Explore");
                self.alive.push(child.clone());
                events.push(Event::SpawnSubagent {
                    parent_id: MAIN_AGENT.to_string(),
                    subagent_type: sub_type.to_string(),
                    description: format!("subtask-{}", self.spawned),
                    tool_name: None,
                    child_id: Some(child),
                });
            } else {
                let tool = self.pick_tool();
                events.push(Event::tool_started(MAIN_AGENT, &tool));
                self.active.insert(MAIN_AGENT.to_string(), tool);
            }
        } else if r < 0.48 && !self.alive.is_empty() {
            if let Some(sub) = self.pick_alive() {
                let tool = self.pick_tool();
                events.push(Event::tool_started(&sub, &tool));
                self.active.insert(sub, tool);
            }
        } else if r < 0.62 && !self.active.is_empty() {
            let ids: Vec<String> = self.active.keys().cloned().collect();
            if let Some(id) = ids.choose(&mut self.rng) {
                events.push(Event::tool_ended(id));
                self.active.remove(id);
            }
        } else if r < 0.72 && self.alive.len() > 1 {
            if let Some(sub) = self.pick_alive() {
                events.push(Event::turn_ended(&sub));
                self.alive.retain(|a| *a != sub);
                self.active.remove(&sub);
            }
        } else if r < 0.78 {
            let mut agent = MAIN_AGENT.to_string();
            if !self.alive.is_empty() && self.rng.gen_bool(0.3) {
                agent = self.pick_alive().unwrap_or(agent);
            }
            let tool = WAIT_TOOLS.choose(&mut self.rng).copied().unwrap_or("permission");
            events.push(Event::waiting(&agent, tool));
        } else if r < 0.90 && self.active.remove(MAIN_AGENT).is_some() {
            events.push(Event::tool_ended(MAIN_AGENT));
        }

        events
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAdapter for DemoSource {
    fn source_name(&self) -> &str {
        "DEMO"
    }

    fn poll(&mut self) -> Vec<Event> {
        let now = Instant::now();
        if now < self.next_at {
            return Vec::new();
        }
        let events = self.next_batch();
        self.next_at = now + Duration::from_secs_f64(self.rng.gen_range(0.8..3.0));
        events
    }

    fn status(&self) -> String {
        format!("Demo mode ({} subs spawned)", self.spawned)
    }
}
