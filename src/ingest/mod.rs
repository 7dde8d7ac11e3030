pub mod claude;
pub mod codex;
pub mod correlate;
pub mod demo;
pub mod error;
pub mod kiro;
pub mod opencode;
pub mod tail;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

pub use error::SourceError;

/// A normalized agent activity event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ToolStarted {
        agent_id: String,
        tool_name: String,
    },
    ToolEnded {
        agent_id: String,
    },
    Waiting {
        agent_id: String,
        tool_name: String,
    },
    TurnEnded {
        agent_id: String,
    },
    SpawnSubagent {
        parent_id: String,
        subagent_type: String,
        description: String,
        /// Tool the child should start on, when the source knows it.
        tool_name: Option<String>,
        /// Child id chosen by the adapter, so later completions can reference it.
        child_id: Option<String>,
    },
}

impl Event {
    pub fn tool_started(agent_id: &str, tool_name: &str) -> Self {
        Event::ToolStarted {
            agent_id: agent_id.to_string(),
            tool_name: tool_name.to_string(),
        }
    }

    pub fn tool_ended(agent_id: &str) -> Self {
        Event::ToolEnded {
            agent_id: agent_id.to_string(),
        }
    }

    pub fn waiting(agent_id: &str, tool_name: &str) -> Self {
        Event::Waiting {
            agent_id: agent_id.to_string(),
            tool_name: tool_name.to_string(),
        }
    }

    pub fn turn_ended(agent_id: &str) -> Self {
        Event::TurnEnded {
            agent_id: agent_id.to_string(),
        }
    }

    pub fn spawn(parent_id: &str, subagent_type: &str, description: &str) -> Self {
        Event::SpawnSubagent {
            parent_id: parent_id.to_string(),
            subagent_type: subagent_type.to_string(),
            description: description.to_string(),
            tool_name: None,
            child_id: None,
        }
    }

    /// The agent this event is about (the parent, for spawns).
    pub fn agent_id(&self) -> &str {
        match self {
            Event::ToolStarted { agent_id, .. }
            | Event::ToolEnded { agent_id }
            | Event::Waiting { agent_id, .. }
            | Event::TurnEnded { agent_id } => agent_id,
            Event::SpawnSubagent { parent_id, .. } => parent_id,
        }
    }
}

/// Agent id used by every adapter for the session's own agent.
pub const MAIN_AGENT: &str = "main";

/// Trait for agent activity sources.
/// Implement this to support a new coding tool's session format.
pub trait SourceAdapter {
    /// Title shown above the office, e.g. "CLAUDE CODE".
    fn source_name(&self) -> &str;

    /// Events observed since the previous call. Never fails: a broken
    /// source yields an empty batch.
    fn poll(&mut self) -> Vec<Event>;

    /// Short human-readable status for the status bar.
    fn status(&self) -> String;

    /// Directory whose changes should wake this adapter early.
    fn watch_path(&self) -> Option<PathBuf> {
        None
    }

    /// Drop any pending rate limit so the next poll rescans immediately.
    fn nudge(&mut self) {}
}

/// Which adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    Claude,
    Codex,
    Kiro,
    Opencode,
    Demo,
}

/// Everything the adapters may need from the command line.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub project: Option<PathBuf>,
    pub session: Option<String>,
    pub claude_home: Option<PathBuf>,
    pub sessions_root: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    /// Seed for the demo source's generator.
    pub seed: Option<u64>,
}

/// Construct the adapter for `kind`.
pub fn build_source(kind: SourceKind, opts: SourceOptions) -> Box<dyn SourceAdapter> {
    match kind {
        SourceKind::Claude => Box::new(claude::ClaudeSource::new(claude::ClaudeOptions {
            projects_root: opts.claude_home,
            project_path: opts.project,
            session_id: opts.session,
            ..Default::default()
        })),
        SourceKind::Codex => Box::new(codex::CodexSource::new(codex::CodexOptions {
            sessions_root: opts.sessions_root,
            ..Default::default()
        })),
        SourceKind::Kiro => Box::new(kiro::KiroSource::new(kiro::KiroOptions {
            db_path: opts.db_path,
            ..Default::default()
        })),
        SourceKind::Opencode => Box::new(opencode::OpenCodeSource::new(opencode::OpenCodeOptions {
            db_path: opts.db_path,
            ..Default::default()
        })),
        SourceKind::Demo => Box::new(match opts.seed {
            Some(seed) => demo::DemoSource::seeded(seed),
            None => demo::DemoSource::new(),
        }),
    }
}

/// Convert an adapter-internal result into a batch, logging the failure.
/// This is the boundary past which source errors never travel.
pub(crate) fn batch_or_empty(source: &str, result: Result<Vec<Event>, SourceError>) -> Vec<Event> {
    match result {
        Ok(events) => events,
        Err(err) => {
            debug!(source, error = %err, "poll degraded to empty batch");
            Vec::new()
        }
    }
}

/// Upper bound on how long a poll waits for a locked database.
pub const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_millis(100);

/// Open `path` read-only for a single poll.
pub(crate) fn open_read_only(path: &Path) -> Result<Connection, SourceError> {
    if !path.is_file() {
        return Err(SourceError::Missing(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(SQLITE_BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Minimum-interval gate for expensive scans.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// True (and re-arms) when at least `interval` has passed since the
    /// last time this returned true. The first call is always ready.
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Look a native tool id up in `table`, falling back to a capitalized label.
pub fn canonical_tool(table: &[(&str, &str)], native: &str) -> String {
    table
        .iter()
        .find(|(from, _)| *from == native)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| capitalize(native))
}

/// Uppercase the first character, lowercase the rest ("fs_READ" -> "Fs_read").
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => "unknown".to_string(),
    }
}

/// First `n` characters of `s`, respecting char boundaries.
pub(crate) fn prefix(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
