use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

use crate::ingest::SourceAdapter;
use crate::office::{Dispatcher, DispatcherConfig, OfficeSnapshot};

/// Longest slice a single `tick` advances the simulation, in seconds.
/// Longer gaps are split into several slices so no time is lost.
pub const MAX_TICK_SECS: f64 = 0.25;

pub struct App {
    pub source: Box<dyn SourceAdapter>,
    pub office: Dispatcher,
    pub should_quit: bool,

    /// Simulated seconds since start, shown as the office clock.
    pub uptime: f64,
    last_frame: Option<Instant>,
}

impl App {
    pub fn new(source: Box<dyn SourceAdapter>, config: DispatcherConfig) -> Self {
        Self {
            source,
            office: Dispatcher::new(config),
            should_quit: false,
            uptime: 0.0,
            last_frame: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    /// The source reported a change on disk; rescan on the next poll.
    pub fn source_changed(&mut self) {
        self.source.nudge();
    }

    /// Advance by the wall-clock time since the previous frame.
    pub fn frame(&mut self) {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        self.step(dt);
    }

    /// Poll the source, route its events, then advance every agent by `dt`
    /// in slices of at most `MAX_TICK_SECS`.
    pub fn step(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let events = self.source.poll();
        if !events.is_empty() {
            trace!(count = events.len(), "events polled");
        }
        self.office.apply_all(events);

        let slices = (dt / MAX_TICK_SECS).ceil().max(1.0) as usize;
        if slices > 1 {
            trace!(dt, slices, "splitting long frame");
        }
        let slice = dt / slices as f64;
        for _ in 0..slices {
            self.office.tick(slice);
        }
        self.uptime += dt;
    }

    pub fn snapshot(&self) -> OfficeSnapshot {
        self.office.snapshot()
    }

    /// "agents: 1 main + 2 sub  |  active: 1  |  tools: Read, Grep"
    pub fn status_line(&self) -> String {
        let snap = self.snapshot();
        let tools = snap.active_tools();
        let tools = if tools.is_empty() {
            "--".to_string()
        } else {
            tools.iter().take(4).copied().collect::<Vec<_>>().join(", ")
        };
        format!(
            "agents: {} main + {} sub  |  active: {}  |  tools: {}",
            snap.primary_count(),
            snap.secondary_count(),
            snap.working_count(),
            tools,
        )
    }

    /// Uptime as HH:MM:SS.
    pub fn clock(&self) -> String {
        let secs = self.uptime as u64;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
    }
}

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
#[allow(dead_code)]
mod helpers;
