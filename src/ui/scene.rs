use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};

use crate::office::layout::CUBICLE_WIDTH;
use crate::office::{OfficeLayout, OfficeSnapshot};

use super::{colors, put};

const CAFE: [&str; 7] = [
    "┌───────────┐",
    "│  ♨  CAFÉ  │",
    "│  ╭─────╮  │",
    "│  │     │  │",
    "│  ╰─────╯  │",
    "│           │",
    "└───────────┘",
];
const SOFA: [&str; 3] = ["╭━━━━━━╮", "┃ ░░░░ ┃", "╰━━━━━━╯"];
const SOFA_XS: [i32; 2] = [18, 32];
const WHITEBOARD_TOP: i32 = 11;

/// Walls plus the title row.
pub fn draw_shell(
    buf: &mut Buffer,
    area: Rect,
    layout: &OfficeLayout,
    title: &str,
    status: &str,
    clock: &str,
) {
    let wall = Style::default().fg(colors::WALL);
    let inner = usize::from(layout.width);
    let right = i32::from(layout.width) + 1;
    let bottom = i32::from(layout.height) + 1;

    put(buf, area, 0, 0, &format!("╔{}╗", "═".repeat(inner)), wall);
    put(buf, area, 0, 2, &format!("╠{}╣", "═".repeat(inner)), wall);
    put(buf, area, 0, bottom, &format!("╚{}╝", "═".repeat(inner)), wall);
    for y in 1..bottom {
        if y == 2 {
            continue;
        }
        put(buf, area, 0, y, "║", wall);
        put(buf, area, right, y, "║", wall);
    }

    let title_style = Style::default().fg(colors::TITLE).add_modifier(Modifier::BOLD);
    put(buf, area, 3, 1, title, title_style);

    let clock_x = i32::from(layout.width) - clock.chars().count() as i32 - 1;
    put(buf, area, clock_x, 1, clock, wall);

    // The adapter status sits left of the clock when there is room for it.
    let status_x = clock_x - status.chars().count() as i32 - 3;
    if status_x > 3 + title.chars().count() as i32 + 2 {
        let style = Style::default().fg(colors::SOURCE_STATUS);
        put(buf, area, status_x, 1, status, style);
    }
}

/// Cubicles, walkway, café, lounge and whiteboard.
pub fn draw_furniture(
    buf: &mut Buffer,
    area: Rect,
    layout: &OfficeLayout,
    snapshot: &OfficeSnapshot,
) {
    draw_cubicles(buf, area, snapshot);

    let walkway = "·   ".repeat(usize::from(layout.width) / 4 + 1);
    let walkway: String = walkway
        .chars()
        .take(usize::from(layout.width.saturating_sub(4)))
        .collect();
    let walkway_style = Style::default().fg(colors::WALKWAY);
    put(buf, area, 2, i32::from(layout.walkway_y), &walkway, walkway_style);

    let cafe = Style::default().fg(colors::CAFE);
    for (i, row) in CAFE.iter().enumerate() {
        put(buf, area, 2, 11 + i as i32, row, cafe);
    }

    let lounge = Style::default().fg(colors::LOUNGE);
    for x in SOFA_XS {
        for (i, row) in SOFA.iter().enumerate() {
            put(buf, area, x, 16 + i as i32, row, lounge);
        }
    }
    put(buf, area, 27, 17, "◻", lounge);
    put(buf, area, 30, 13, "L O U N G E", lounge.add_modifier(Modifier::DIM));

    draw_whiteboard(buf, area, layout, &snapshot.whiteboard);
}

fn draw_cubicles(buf: &mut Buffer, area: Rect, snapshot: &OfficeSnapshot) {
    let desk = Style::default().fg(colors::DESK);
    let cw = i32::from(CUBICLE_WIDTH);
    let span = "─".repeat(usize::from(CUBICLE_WIDTH) - 2);

    for (i, view) in snapshot.desks.iter().enumerate() {
        let cx = i32::from(view.spot.x);
        let cy = i32::from(view.spot.y);
        let (top, bottom) = if i == 0 { ('┌', '└') } else { ('┬', '┴') };
        put(buf, area, cx, cy, &format!("{top}{span}"), desk);
        put(buf, area, cx, cy + 4, &format!("{bottom}{span}"), desk);
        for row in 1..4 {
            put(buf, area, cx, cy + row, "│", desk);
            put(buf, area, cx + cw - 1, cy + row, "│", desk);
        }
        put(buf, area, cx + 5, cy + 1, "▓▓▓▓▓", desk);
        put(buf, area, cx + 4, cy + 2, "═══════", desk);
        put(buf, area, view.spot.chair.x as i32, view.spot.chair.y as i32, "◇", desk);
    }

    if let Some(last) = snapshot.desks.last() {
        let x = i32::from(last.spot.x) + cw - 1;
        let y = i32::from(last.spot.y);
        put(buf, area, x, y, "┐", desk);
        put(buf, area, x, y + 4, "┘", desk);
    }
}

fn draw_whiteboard(buf: &mut Buffer, area: Rect, layout: &OfficeLayout, lines: &[String]) {
    let style = Style::default().fg(colors::WHITEBOARD);
    let x = i32::from(layout.whiteboard_x());
    let blank = "│                │";

    put(buf, area, x, WHITEBOARD_TOP, "┌────────────────┐", style);
    put(buf, area, x, WHITEBOARD_TOP + 1, "│  WHITEBOARD    │", style);
    for row in 0..4 {
        let text = match lines.get(row) {
            Some(tool) => {
                let tool: String = tool.chars().take(11).collect();
                format!("│  > {tool:<11} │")
            }
            None => blank.to_string(),
        };
        put(buf, area, x, WHITEBOARD_TOP + 2 + row as i32, &text, style);
    }
    put(buf, area, x, WHITEBOARD_TOP + 6, blank, style);
    put(buf, area, x, WHITEBOARD_TOP + 7, "└────────────────┘", style);
}
