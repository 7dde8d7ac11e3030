//! Shared color palette for the office.

use ratatui::style::Color;

// ── Building ────────────────────────────────────────────────────────
pub const WALL: Color = Color::Blue;
pub const TITLE: Color = Color::Cyan;
pub const SOURCE_STATUS: Color = Color::DarkGray;
pub const WALKWAY: Color = Color::Blue;

// ── Furniture ───────────────────────────────────────────────────────
pub const DESK: Color = Color::Yellow;
pub const CAFE: Color = Color::Red;
pub const LOUNGE: Color = Color::Magenta;
pub const WHITEBOARD: Color = Color::White;

// ── Agents ──────────────────────────────────────────────────────────
pub const AGENT_MAIN: Color = Color::White;
pub const AGENT_CYAN: Color = Color::Cyan;
pub const AGENT_GREEN: Color = Color::Green;
pub const AGENT_YELLOW: Color = Color::Yellow;
pub const AGENT_NAME: Color = Color::Cyan;
/// Blink color of an agent waiting on the user.
pub const AGENT_ALERT: Color = Color::Red;

// ── Bubbles and status bar ──────────────────────────────────────────
pub const BUBBLE_FG: Color = Color::White;
pub const BUBBLE_BG: Color = Color::Blue;
pub const ALERT_BUBBLE_FG: Color = Color::White;
pub const ALERT_BUBBLE_BG: Color = Color::Red;
pub const STATUS_FG: Color = Color::Black;
pub const STATUS_BG: Color = Color::Cyan;
