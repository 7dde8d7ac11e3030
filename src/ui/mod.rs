pub mod characters;
pub mod colors;
pub mod scene;
pub mod sprites;

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::App;

pub fn render(f: &mut Frame, app: &App) {
    let layout = app.office.layout();
    // Walls add one cell on every side.
    let (min_w, min_h) = (layout.width + 2, layout.height + 2);
    let area = f.area();

    if area.width < min_w || area.height < min_h {
        render_resize_message(f, area, min_w, min_h);
        return;
    }

    let office = Rect::new(area.x, area.y, min_w, min_h);
    let snapshot = app.snapshot();
    let title = format!("{} OFFICE", app.source.source_name());
    let status = app.source.status();

    let buf = f.buffer_mut();
    scene::draw_shell(buf, office, layout, &title, &status, &app.clock());
    scene::draw_furniture(buf, office, layout, &snapshot);
    characters::draw_agents(buf, office, &snapshot.agents);

    let bar = Rect::new(office.x + 1, office.y + layout.height, layout.width, 1);
    render_status_bar(f, app, bar);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    use crate::ui::colors::{STATUS_BG, STATUS_FG};

    let text: String = format!("  {}", app.status_line())
        .chars()
        .take(usize::from(area.width))
        .collect();
    f.render_widget(
        Paragraph::new(text).style(
            Style::default()
                .bg(STATUS_BG)
                .fg(STATUS_FG)
                .add_modifier(Modifier::BOLD),
        ),
        area,
    );
}

fn render_resize_message(f: &mut Frame, area: Rect, min_w: u16, min_h: u16) {
    let msg = format!("Please resize terminal to at least {min_w}x{min_h}");
    let row = Rect::new(area.x, area.y + area.height / 2, area.width, 1.min(area.height));
    f.render_widget(
        Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD)),
        row,
    );
}

/// Write `s` at office coordinates (`x`, `y`) relative to `area`, clipped to it.
pub(crate) fn put(buf: &mut Buffer, area: Rect, x: i32, y: i32, s: &str, style: Style) {
    if y < 0 || y >= i32::from(area.height) || x >= i32::from(area.width) {
        return;
    }
    let skip = (-x).max(0) as usize;
    let x = x.max(0);
    let room = (i32::from(area.width) - x) as usize;
    let visible: String = s.chars().skip(skip).collect();
    if visible.is_empty() {
        return;
    }
    buf.set_stringn(area.x + x as u16, area.y + y as u16, visible, room, style);
}
