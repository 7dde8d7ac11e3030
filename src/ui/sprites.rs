//! Three-by-three stick figures and the frame each state shows.

use ratatui::style::{Color, Modifier, Style};

use crate::office::{Agent, AgentState};

use super::colors;

pub type Sprite = [&'static str; 3];

pub const IDLE: Sprite = [" o ", "/|\\", "/ \\"];
pub const WALK_1: Sprite = [" o ", "/|\\", "/ |"];
pub const WALK_2: Sprite = [" o ", "/|\\", "| \\"];
pub const SITTING: Sprite = [" o ", "/|\\", "_|_"];
pub const TYPING_1: Sprite = [" o ", "\\|/", "_|_"];
pub const TYPING_2: Sprite = [" o ", " |\\", "_|_"];
pub const WAITING_1: Sprite = ["\\o/", " | ", "/ \\"];
pub const WAITING_2: Sprite = IDLE;
pub const COFFEE_1: Sprite = [" o ", "/|>", "/ \\"];
pub const COFFEE_2: Sprite = [" o>", "/| ", "/ \\"];
pub const SPAWNING: Sprite = [" . ", " : ", " . "];
pub const EXITING: Sprite = [" * ", " * ", " * "];

/// Which of two frames to show `rate` times per second.
fn alternate(phase: f64, rate: f64) -> bool {
    (phase * rate) as u64 % 2 == 1
}

fn pick(phase: f64, rate: f64, a: Sprite, b: Sprite) -> Sprite {
    if alternate(phase, rate) {
        b
    } else {
        a
    }
}

pub fn sprite_for(agent: &Agent) -> Sprite {
    let phase = agent.timers.phase;
    match agent.state {
        AgentState::Spawning => SPAWNING,
        AgentState::Exiting => EXITING,
        AgentState::Idle => IDLE,
        AgentState::Thinking if agent.on_break => pick(phase, 1.5, COFFEE_1, COFFEE_2),
        AgentState::Thinking | AgentState::Wandering | AgentState::WalkingToDesk => {
            pick(phase, 4.0, WALK_1, WALK_2)
        }
        AgentState::Sitting => SITTING,
        AgentState::Working => pick(phase, 3.0, TYPING_1, TYPING_2),
        AgentState::WaitingForUser => pick(phase, 2.0, WAITING_1, WAITING_2),
    }
}

/// Body color by subagent type.
pub fn agent_color(kind: &str) -> Color {
    match kind {
        "main" => colors::AGENT_MAIN,
        "Explore" | "Bash" => colors::AGENT_CYAN,
        "Plan" | "test" => colors::AGENT_YELLOW,
        _ => colors::AGENT_GREEN,
    }
}

/// Style for the figure itself; waiting agents blink red.
pub fn body_style(agent: &Agent) -> Style {
    if agent.state == AgentState::WaitingForUser {
        let fg = if alternate(agent.timers.phase, 3.0) {
            colors::AGENT_ALERT
        } else {
            agent_color(&agent.kind)
        };
        return Style::default().fg(fg).add_modifier(Modifier::BOLD);
    }
    let style = Style::default().fg(agent_color(&agent.kind));
    if agent.is_primary() {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::office::OfficeLayout;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agent(state: AgentState, phase: f64) -> Agent {
        let layout = OfficeLayout::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut a = Agent::spawned("sub-1", "explore-1", "Explore", None, &layout, &mut rng);
        a.state = state;
        a.timers.phase = phase;
        a
    }

    #[test]
    fn fixed_sprites() {
        assert_eq!(sprite_for(&agent(AgentState::Spawning, 0.7)), SPAWNING);
        assert_eq!(sprite_for(&agent(AgentState::Exiting, 0.7)), EXITING);
        assert_eq!(sprite_for(&agent(AgentState::Idle, 0.7)), IDLE);
        assert_eq!(sprite_for(&agent(AgentState::Sitting, 0.7)), SITTING);
    }

    #[test]
    fn walking_alternates_four_times_a_second() {
        assert_eq!(sprite_for(&agent(AgentState::Wandering, 0.1)), WALK_1);
        assert_eq!(sprite_for(&agent(AgentState::Wandering, 0.3)), WALK_2);
        assert_eq!(sprite_for(&agent(AgentState::WalkingToDesk, 0.6)), WALK_1);
    }

    #[test]
    fn thinking_walks_then_sips() {
        let mut a = agent(AgentState::Thinking, 0.3);
        assert_eq!(sprite_for(&a), WALK_2);
        a.on_break = true;
        assert_eq!(sprite_for(&a), COFFEE_1);
        a.timers.phase = 0.8;
        assert_eq!(sprite_for(&a), COFFEE_2);
    }

    #[test]
    fn working_and_waiting_frames() {
        assert_eq!(sprite_for(&agent(AgentState::Working, 0.1)), TYPING_1);
        assert_eq!(sprite_for(&agent(AgentState::Working, 0.4)), TYPING_2);
        assert_eq!(sprite_for(&agent(AgentState::WaitingForUser, 0.1)), WAITING_1);
        assert_eq!(sprite_for(&agent(AgentState::WaitingForUser, 0.6)), WAITING_2);
    }

    #[test]
    fn colors_by_kind() {
        assert_eq!(agent_color("main"), colors::AGENT_MAIN);
        assert_eq!(agent_color("Explore"), colors::AGENT_CYAN);
        assert_eq!(agent_color("Plan"), colors::AGENT_YELLOW);
        assert_eq!(agent_color("general-purpose"), colors::AGENT_GREEN);
        assert_eq!(agent_color("something-new"), colors::AGENT_GREEN);
    }

    #[test]
    fn waiting_agent_blinks_red() {
        let steady = body_style(&agent(AgentState::WaitingForUser, 0.1));
        assert_eq!(steady.fg, Some(colors::AGENT_CYAN));
        let blink = body_style(&agent(AgentState::WaitingForUser, 0.4));
        assert_eq!(blink.fg, Some(colors::AGENT_ALERT));
        assert!(blink.add_modifier.contains(Modifier::BOLD));
    }
}
