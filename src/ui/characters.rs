use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};

use crate::office::annotations::SpeechBubble;
use crate::office::Agent;

use super::sprites::{body_style, sprite_for};
use super::{colors, put};

/// Agents back to front, then every bubble on top of them.
pub fn draw_agents(buf: &mut Buffer, area: Rect, agents: &[Agent]) {
    let mut ordered: Vec<&Agent> = agents.iter().filter(|a| a.alive).collect();
    ordered.sort_by(|a, b| a.pos.y.total_cmp(&b.pos.y));

    for agent in &ordered {
        draw_agent(buf, area, agent);
    }
    for agent in &ordered {
        if let Some(bubble) = &agent.bubble {
            draw_bubble(buf, area, bubble, cell(agent.pos.x), cell(agent.pos.y));
        }
    }
}

fn cell(v: f64) -> i32 {
    v.floor() as i32
}

fn draw_agent(buf: &mut Buffer, area: Rect, agent: &Agent) {
    let (x, y) = (cell(agent.pos.x), cell(agent.pos.y));
    let style = body_style(agent);
    for (row, line) in sprite_for(agent).iter().enumerate() {
        put(buf, area, x - 1, y + row as i32, line, style);
    }

    let name_style = Style::default()
        .fg(colors::AGENT_NAME)
        .add_modifier(Modifier::DIM);
    let half = agent.name.chars().count() as i32 / 2;
    put(buf, area, x - half, y + 3, &agent.name, name_style);
}

/// Boxed text above the agent at (`x`, `y`), or below it near the top wall.
fn draw_bubble(buf: &mut Buffer, area: Rect, bubble: &SpeechBubble, x: i32, y: i32) {
    let width = bubble.text.chars().count() as i32 + 4;
    let max_x = i32::from(area.width);

    let mut bx = x - width / 2;
    let mut by = y - 3;
    if by < 0 {
        by = y + 4;
    }
    if bx < 1 {
        bx = 1;
    }
    if bx + width >= max_x - 1 {
        bx = max_x - width - 1;
    }
    if bx < 0 {
        return;
    }

    let style = if bubble.alert {
        Style::default()
            .fg(colors::ALERT_BUBBLE_FG)
            .bg(colors::ALERT_BUBBLE_BG)
    } else {
        Style::default().fg(colors::BUBBLE_FG).bg(colors::BUBBLE_BG)
    };

    let rule = "─".repeat((width - 2) as usize);
    let pointer = (width / 2) as usize;
    let bottom: String = format!("└{rule}┘")
        .chars()
        .enumerate()
        .map(|(i, c)| if i == pointer { '┬' } else { c })
        .collect();

    put(buf, area, bx, by, &format!("┌{rule}┐"), style);
    put(buf, area, bx, by + 1, &format!("│ {} │", bubble.text), style);
    put(buf, area, bx, by + 2, &bottom, style);
}
