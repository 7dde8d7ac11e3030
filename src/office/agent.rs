//! Per-agent animation state machine.
//!
//! Events move an agent between states immediately; `tick` advances the
//! time-driven transitions. Both are total: every (state, input) pair is
//! handled, most of them by doing nothing.

use rand::Rng;

use super::annotations::SpeechBubble;
use super::layout::{OfficeLayout, Point};

pub const SPAWN_SECS: f64 = 1.0;
pub const EXIT_SECS: f64 = 1.5;
/// Secondary agents leave after idling this long.
pub const IDLE_TIMEOUT_SECS: f64 = 20.0;
/// Silence on a gated tool after which we assume a permission prompt.
pub const PERMISSION_WAIT_SECS: f64 = 5.0;
pub const DESK_TIMEOUT_SECS: f64 = 10.0;
pub const WAIT_CLEAR_SECS: f64 = 15.0;
pub const SIT_DWELL_SECS: f64 = 0.5;
/// Cells per second.
pub const WALK_SPEED: f64 = 16.0;
pub const ARRIVAL_EPSILON: f64 = 0.5;

/// Tools that usually stop for user approval.
pub const PERMISSION_TOOLS: &[&str] = &["Edit", "Write", "Bash", "NotebookEdit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    Spawning,
    Idle,
    Wandering,
    WalkingToDesk,
    Sitting,
    Working,
    Thinking,
    WaitingForUser,
    Exiting,
}

impl AgentState {
    /// States a deskless agent can be in.
    pub fn is_lounge(self) -> bool {
        matches!(
            self,
            AgentState::Spawning
                | AgentState::Idle
                | AgentState::Wandering
                | AgentState::Thinking
                | AgentState::WaitingForUser
                | AgentState::Exiting
        )
    }
}

/// The session's own agent lives forever; everyone else can leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentClass {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timers {
    pub spawn: f64,
    /// Countdown to the next wander.
    pub wander: f64,
    /// Break dwell countdown.
    pub think: f64,
    pub wait: f64,
    /// Time since the last event while at (or heading to) the desk.
    pub desk: f64,
    pub idle: f64,
    pub exit: f64,
    /// Free-running clock for sprite frames and the sitting dwell.
    pub phase: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskSeat {
    pub index: usize,
    pub chair: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    /// Subagent type as reported by the source ("main", "Explore", ...).
    pub kind: String,
    pub class: AgentClass,
    pub state: AgentState,
    pub pos: Point,
    pub target: Option<Point>,
    pub timers: Timers,
    pub tool: Option<String>,
    /// Tool received while still spawning.
    pub queued_tool: Option<String>,
    pub desk: Option<DeskSeat>,
    pub bubble: Option<SpeechBubble>,
    /// Reached the break spot while thinking.
    pub on_break: bool,
    pub alive: bool,
}

impl Agent {
    /// The primary agent, already idling in the lounge.
    pub fn primary<R: Rng + ?Sized>(
        id: &str,
        desk: Option<DeskSeat>,
        layout: &OfficeLayout,
        rng: &mut R,
    ) -> Self {
        let mut agent = Self::base(id, id, "main", AgentClass::Primary, desk, layout.lounge.sample(rng));
        agent.state = AgentState::Idle;
        agent.timers.wander = rng.gen_range(2.0..6.0);
        agent
    }

    /// A secondary agent materializing at the entrance.
    pub fn spawned<R: Rng + ?Sized>(
        id: &str,
        name: &str,
        kind: &str,
        desk: Option<DeskSeat>,
        layout: &OfficeLayout,
        rng: &mut R,
    ) -> Self {
        let mut agent =
            Self::base(id, name, kind, AgentClass::Secondary, desk, layout.entrance.sample(rng));
        agent.state = AgentState::Spawning;
        agent.timers.spawn = SPAWN_SECS;
        agent
    }

    fn base(
        id: &str,
        name: &str,
        kind: &str,
        class: AgentClass,
        desk: Option<DeskSeat>,
        pos: Point,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            class,
            state: AgentState::Idle,
            pos,
            target: None,
            timers: Timers::default(),
            tool: None,
            queued_tool: None,
            desk,
            bubble: None,
            on_break: false,
            alive: true,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.class == AgentClass::Primary
    }

    pub fn is_at_desk(&self) -> bool {
        self.desk.is_some_and(|seat| {
            (self.pos.x - seat.chair.x).abs() < 1.0 && (self.pos.y - seat.chair.y).abs() < 1.0
        })
    }

    // ── events ──────────────────────────────────────────────────────

    pub fn on_tool_started(&mut self, tool: &str) {
        match self.state {
            AgentState::Exiting => return,
            AgentState::Spawning => {
                self.queued_tool = Some(tool.to_string());
                return;
            }
            _ => {}
        }

        self.tool = Some(tool.to_string());
        self.timers.desk = 0.0;
        self.timers.idle = 0.0;
        self.bubble = Some(SpeechBubble::for_tool(tool));

        match self.state {
            AgentState::WalkingToDesk => {}
            AgentState::Idle
            | AgentState::Wandering
            | AgentState::Sitting
            | AgentState::Working
            | AgentState::Thinking
            | AgentState::WaitingForUser
                if self.is_at_desk() =>
            {
                self.state = AgentState::Working;
            }
            _ if self.desk.is_some() => self.walk_to_desk(),
            // Deskless: the tool is recorded, the agent stays where it is.
            AgentState::WaitingForUser => self.state = AgentState::Idle,
            _ => {}
        }
    }

    pub fn on_tool_ended<R: Rng + ?Sized>(&mut self, layout: &OfficeLayout, rng: &mut R) {
        match self.state {
            AgentState::Exiting => {}
            AgentState::Spawning => self.queued_tool = None,
            AgentState::Working => {
                self.clear_tool();
                self.take_break(layout, rng, 3.0..6.0);
            }
            AgentState::WaitingForUser if self.is_at_desk() => {
                self.clear_tool();
                self.state = AgentState::Working;
                self.timers.desk = 0.0;
            }
            AgentState::WaitingForUser => {
                self.clear_tool();
                self.state = AgentState::Idle;
                self.timers.wander = rng.gen_range(1.0..3.0);
            }
            // Walking keeps going; arrival without a tool means sitting.
            _ => self.clear_tool(),
        }
    }

    pub fn on_waiting(&mut self, tool: &str) {
        if matches!(self.state, AgentState::Spawning | AgentState::Exiting) {
            return;
        }
        self.state = AgentState::WaitingForUser;
        self.bubble = Some(SpeechBubble::for_waiting(tool));
        self.timers.wait = 0.0;
    }

    /// Primary agents drift back to the lounge; secondary agents leave.
    pub fn on_turn_ended<R: Rng + ?Sized>(&mut self, layout: &OfficeLayout, rng: &mut R) {
        match (self.state, self.class) {
            (AgentState::Exiting, _) => {}
            (_, AgentClass::Secondary) => self.begin_exit(),
            (_, AgentClass::Primary) => {
                self.clear_tool();
                self.queued_tool = None;
                self.go_to_lounge(layout, rng);
            }
        }
    }

    pub fn begin_exit(&mut self) {
        self.state = AgentState::Exiting;
        self.timers.exit = EXIT_SECS;
        self.bubble = None;
    }

    // ── time ────────────────────────────────────────────────────────

    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f64, layout: &OfficeLayout, rng: &mut R) {
        if !self.alive {
            return;
        }
        self.timers.phase += dt;
        if let Some(bubble) = self.bubble.as_mut() {
            if !bubble.tick(dt) {
                self.bubble = None;
            }
        }

        match self.state {
            AgentState::Spawning => {
                self.timers.spawn -= dt;
                if self.timers.spawn <= 0.0 {
                    self.finish_spawning(rng);
                }
            }
            AgentState::Exiting => {
                self.timers.exit -= dt;
                if self.timers.exit <= 0.0 {
                    self.alive = false;
                }
            }
            AgentState::Idle => {
                self.timers.wander -= dt;
                self.timers.idle += dt;
                if self.idle_expired() {
                    self.begin_exit();
                } else if self.timers.wander <= 0.0 {
                    self.go_to_lounge(layout, rng);
                }
            }
            AgentState::Wandering => {
                self.step_toward_target(dt);
                self.timers.idle += dt;
                if self.idle_expired() {
                    self.begin_exit();
                } else if self.at_target() {
                    self.state = AgentState::Idle;
                    self.timers.wander = rng.gen_range(2.0..6.0);
                }
            }
            AgentState::WalkingToDesk => {
                self.step_toward_target(dt);
                self.timers.desk += dt;
                if self.at_target() {
                    self.timers.phase = 0.0;
                    if let Some(tool) = self.tool.clone() {
                        self.state = AgentState::Working;
                        self.bubble = Some(SpeechBubble::for_tool(&tool));
                    } else {
                        self.state = AgentState::Sitting;
                    }
                }
            }
            AgentState::Sitting => {
                self.timers.desk += dt;
                if self.timers.phase > SIT_DWELL_SECS {
                    if self.tool.is_some() {
                        self.state = AgentState::Working;
                    } else {
                        self.take_break(layout, rng, 2.0..5.0);
                    }
                }
            }
            AgentState::Working => {
                self.timers.desk += dt;
                let gated = self
                    .tool
                    .as_deref()
                    .is_some_and(|t| PERMISSION_TOOLS.contains(&t));
                if self.timers.desk > PERMISSION_WAIT_SECS && gated {
                    if let Some(tool) = self.tool.clone() {
                        self.on_waiting(&tool);
                    }
                } else if self.timers.desk > DESK_TIMEOUT_SECS {
                    self.clear_tool();
                    self.go_to_lounge(layout, rng);
                }
            }
            AgentState::Thinking => {
                if self.on_break {
                    self.timers.think -= dt;
                    if self.timers.think <= 0.0 {
                        self.go_to_lounge(layout, rng);
                    }
                } else {
                    self.step_toward_target(dt);
                    if self.at_target() {
                        self.on_break = true;
                        self.timers.phase = 0.0;
                    }
                }
            }
            AgentState::WaitingForUser => {
                self.timers.wait += dt;
                if self.timers.wait > WAIT_CLEAR_SECS {
                    self.clear_tool();
                    self.go_to_lounge(layout, rng);
                }
            }
        }
    }

    fn finish_spawning<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self.queued_tool.take() {
            Some(tool) => {
                self.bubble = Some(SpeechBubble::for_tool(&tool));
                self.tool = Some(tool);
                self.timers.desk = 0.0;
                if self.desk.is_some() {
                    self.walk_to_desk();
                } else {
                    self.state = AgentState::Idle;
                    self.timers.wander = rng.gen_range(1.0..3.0);
                }
            }
            None => {
                self.state = AgentState::Idle;
                self.timers.wander = rng.gen_range(1.0..3.0);
            }
        }
    }

    fn idle_expired(&self) -> bool {
        self.class == AgentClass::Secondary && self.timers.idle > IDLE_TIMEOUT_SECS
    }

    fn clear_tool(&mut self) {
        self.tool = None;
        self.bubble = None;
    }

    fn walk_to_desk(&mut self) {
        if let Some(seat) = self.desk {
            self.target = Some(seat.chair);
            self.state = AgentState::WalkingToDesk;
            self.timers.phase = 0.0;
        }
    }

    fn go_to_lounge<R: Rng + ?Sized>(&mut self, layout: &OfficeLayout, rng: &mut R) {
        self.target = Some(layout.lounge.sample(rng));
        self.state = AgentState::Wandering;
        self.timers.phase = 0.0;
    }

    fn take_break<R: Rng + ?Sized>(
        &mut self,
        layout: &OfficeLayout,
        rng: &mut R,
        dwell: std::ops::Range<f64>,
    ) {
        self.target = Some(layout.coffee.sample(rng));
        self.state = AgentState::Thinking;
        self.timers.think = rng.gen_range(dwell);
        self.timers.phase = 0.0;
        self.on_break = false;
    }

    fn step_toward_target(&mut self, dt: f64) {
        let Some(target) = self.target else {
            return;
        };
        let dist = self.pos.distance(target);
        let step = WALK_SPEED * dt;
        if dist < ARRIVAL_EPSILON || step >= dist {
            self.pos = target;
            return;
        }
        self.pos.x += (target.x - self.pos.x) / dist * step;
        self.pos.y += (target.y - self.pos.y) / dist * step;
    }

    fn at_target(&self) -> bool {
        self.target.map_or(true, |t| {
            (self.pos.x - t.x).abs() < ARRIVAL_EPSILON && (self.pos.y - t.y).abs() < ARRIVAL_EPSILON
        })
    }
}
