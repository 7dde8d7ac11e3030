use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use super::agent::{Agent, AgentClass, AgentState, DeskSeat};
use super::annotations::Whiteboard;
use super::desks::DeskPool;
use super::layout::{DeskSpot, OfficeLayout};
use crate::ingest::{Event, MAIN_AGENT};

/// Tool a freshly spawned subagent starts on when the source names none.
pub const DEFAULT_SUBAGENT_TOOLS: &[(&str, &str)] = &[
    ("Explore", "Grep"),
    ("Plan", "Read"),
    ("general-purpose", "Read"),
    ("Bash", "Bash"),
];

/// Treated as the agent asking the user something.
const ASK_TOOL: &str = "AskUserQuestion";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub layout: OfficeLayout,
    /// Subagent type -> starting tool.
    pub default_tools: Vec<(String, String)>,
    /// Fixed seed for reproducible movement.
    pub seed: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            layout: OfficeLayout::default(),
            default_tools: DEFAULT_SUBAGENT_TOOLS
                .iter()
                .map(|(kind, tool)| (kind.to_string(), tool.to_string()))
                .collect(),
            seed: None,
        }
    }
}

/// Desk as seen by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskView {
    pub spot: DeskSpot,
    pub occupant: Option<String>,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct OfficeSnapshot {
    pub agents: Vec<Agent>,
    pub desks: Vec<DeskView>,
    pub whiteboard: Vec<String>,
}

impl OfficeSnapshot {
    pub fn primary_count(&self) -> usize {
        self.agents.iter().filter(|a| a.is_primary()).count()
    }

    pub fn secondary_count(&self) -> usize {
        self.agents.iter().filter(|a| !a.is_primary()).count()
    }

    pub fn working_count(&self) -> usize {
        self.agents
            .iter()
            .filter(|a| a.state == AgentState::Working)
            .count()
    }

    pub fn active_tools(&self) -> Vec<&str> {
        self.agents.iter().filter_map(|a| a.tool.as_deref()).collect()
    }
}

/// Owns every live agent and routes events to them.
pub struct Dispatcher {
    layout: OfficeLayout,
    default_tools: Vec<(String, String)>,
    /// Insertion order is render order.
    agents: Vec<Agent>,
    desks: DeskPool,
    whiteboard: Whiteboard,
    rng: StdRng,
    spawned: u32,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut desks = DeskPool::new(config.layout.desks.len());
        let seat = seat_for(&config.layout, desks.assign(MAIN_AGENT));
        let main = Agent::primary(MAIN_AGENT, seat, &config.layout, &mut rng);

        Self {
            layout: config.layout,
            default_tools: config.default_tools,
            agents: vec![main],
            desks,
            whiteboard: Whiteboard::new(),
            rng,
            spawned: 0,
        }
    }

    pub fn layout(&self) -> &OfficeLayout {
        &self.layout
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn desks(&self) -> &DeskPool {
        &self.desks
    }

    pub fn whiteboard(&self) -> &Whiteboard {
        &self.whiteboard
    }

    pub fn apply_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: Event) {
        match event {
            Event::ToolStarted { agent_id, tool_name } => {
                self.whiteboard.note(&tool_name);
                if self.index_of(&agent_id).is_none() {
                    self.spawned += 1;
                    let name = format!("agent-{}", self.spawned);
                    self.spawn(&agent_id, &name, "general-purpose");
                }
                let Some(i) = self.index_of(&agent_id) else {
                    return;
                };
                if tool_name == ASK_TOOL {
                    self.agents[i].on_waiting(&tool_name);
                } else {
                    self.agents[i].on_tool_started(&tool_name);
                }
            }
            Event::ToolEnded { agent_id } => {
                if let Some(i) = self.known(&agent_id, "tool ended") {
                    self.agents[i].on_tool_ended(&self.layout, &mut self.rng);
                }
            }
            Event::Waiting { agent_id, tool_name } => {
                if let Some(i) = self.known(&agent_id, "waiting") {
                    self.agents[i].on_waiting(&tool_name);
                }
            }
            Event::TurnEnded { agent_id } => {
                if let Some(i) = self.known(&agent_id, "turn ended") {
                    self.agents[i].on_turn_ended(&self.layout, &mut self.rng);
                }
            }
            Event::SpawnSubagent {
                parent_id,
                subagent_type,
                description,
                tool_name,
                child_id,
            } => {
                if let Some(id) = child_id.as_deref() {
                    if self.index_of(id).is_some() {
                        trace!(agent = id, "spawn for live agent ignored");
                        return;
                    }
                }
                self.spawned += 1;
                let n = self.spawned;
                let id = child_id.unwrap_or_else(|| format!("sub-{n}"));
                if self.index_of(&id).is_some() {
                    trace!(agent = %id, "spawn for live agent ignored");
                    return;
                }
                let name = format!("{}-{n}", short_type(&subagent_type));
                debug!(agent = %id, parent = %parent_id, kind = %subagent_type, %description, "subagent spawned");

                let start = tool_name.or_else(|| self.default_tool(&subagent_type));
                let i = self.spawn(&id, &name, &subagent_type);
                if let Some(tool) = start {
                    self.agents[i].on_tool_started(&tool);
                }
            }
        }
    }

    /// Advance every agent by `dt` seconds and drop the ones that finished
    /// exiting. Returns the ids removed this tick.
    pub fn tick(&mut self, dt: f64) -> Vec<String> {
        for agent in &mut self.agents {
            agent.tick(dt, &self.layout, &mut self.rng);
        }
        self.whiteboard.tick(dt);

        let dead: Vec<String> = self
            .agents
            .iter()
            .filter(|a| !a.alive && a.class == AgentClass::Secondary)
            .map(|a| a.id.clone())
            .collect();
        for id in &dead {
            self.desks.release(id);
            debug!(agent = %id, "agent left the office");
        }
        self.agents
            .retain(|a| a.alive || a.class == AgentClass::Primary);
        dead
    }

    pub fn snapshot(&self) -> OfficeSnapshot {
        let desks = self
            .layout
            .desks
            .iter()
            .enumerate()
            .map(|(i, spot)| DeskView {
                spot: *spot,
                occupant: self.desks.holder(i).map(str::to_string),
            })
            .collect();
        OfficeSnapshot {
            agents: self.agents.iter().filter(|a| a.alive).cloned().collect(),
            desks,
            whiteboard: self.whiteboard.lines(),
        }
    }

    fn spawn(&mut self, id: &str, name: &str, kind: &str) -> usize {
        let seat = seat_for(&self.layout, self.desks.assign(id));
        let agent = Agent::spawned(id, name, kind, seat, &self.layout, &mut self.rng);
        self.agents.push(agent);
        self.agents.len() - 1
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.agents.iter().position(|a| a.id == id)
    }

    fn known(&self, id: &str, what: &str) -> Option<usize> {
        let found = self.index_of(id);
        if found.is_none() {
            trace!(agent = id, event = what, "event for unknown agent dropped");
        }
        found
    }

    fn default_tool(&self, kind: &str) -> Option<String> {
        self.default_tools
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, tool)| tool.clone())
    }
}

fn seat_for(layout: &OfficeLayout, slot: Option<usize>) -> Option<DeskSeat> {
    let index = slot?;
    let spot = layout.desks.get(index)?;
    Some(DeskSeat {
        index,
        chair: spot.chair,
    })
}

/// "general-purpose" -> "general", "Explore" -> "explore".
pub fn short_type(kind: &str) -> String {
    kind.to_lowercase()
        .split('-')
        .next()
        .unwrap_or_default()
        .chars()
        .take(7)
        .collect()
}
