use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tracing::info;

use super::correlate::PendingSpawns;
use super::tail::LineTail;
use super::{batch_or_empty, Event, SourceAdapter, SourceError, Throttle, MAIN_AGENT};

/// Claude Code already reports canonical names; only the ACP-bridged
/// variants need folding.
const TOOL_NAMES: &[(&str, &str)] = &[
    ("mcp__acp__Read", "Read"),
    ("mcp__acp__Edit", "Edit"),
    ("mcp__acp__Write", "Write"),
    ("mcp__acp__Bash", "Bash"),
];

/// Tool names that launch a subagent.
const SPAWN_TOOLS: &[&str] = &["Task", "Agent"];

#[derive(Debug, Clone)]
pub struct ClaudeOptions {
    /// Root holding one directory per project (default `~/.claude/projects`).
    pub projects_root: Option<PathBuf>,
    /// Project being worked on (default: current directory).
    pub project_path: Option<PathBuf>,
    /// Session UUID to follow (default: most recently modified).
    pub session_id: Option<String>,
    pub scan_interval: Duration,
}

impl Default for ClaudeOptions {
    fn default() -> Self {
        Self {
            projects_root: None,
            project_path: None,
            session_id: None,
            scan_interval: Duration::from_secs(2),
        }
    }
}

/// Tails the main transcript of a Claude Code session.
pub struct ClaudeSource {
    project_dir: PathBuf,
    session_id: Option<String>,
    current: Option<PathBuf>,
    tail: LineTail,
    scan: Throttle,
    pending: PendingSpawns,
}

impl ClaudeSource {
    pub fn new(opts: ClaudeOptions) -> Self {
        let projects_root = opts
            .projects_root
            .or_else(default_projects_root)
            .unwrap_or_else(|| PathBuf::from(".claude/projects"));
        let project_path = opts
            .project_path
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let project_path = project_path.canonicalize().unwrap_or(project_path);

        Self {
            project_dir: resolve_project_dir(&projects_root, &project_path),
            session_id: opts.session_id,
            current: None,
            tail: LineTail::new(),
            scan: Throttle::new(opts.scan_interval),
            pending: PendingSpawns::new(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Session file currently being tailed.
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn scan_files(&mut self) {
        if !self.scan.ready() {
            return;
        }

        let found = match &self.session_id {
            Some(id) => {
                let file = self.project_dir.join(format!("{id}.jsonl"));
                file.is_file().then_some(file)
            }
            None => find_session_from_files(&self.project_dir)
                .map(|id| self.project_dir.join(format!("{id}.jsonl"))),
        };

        if found != self.current {
            if let Some(old) = self.current.take() {
                self.tail.forget(&old);
            }
            // Call ids from the old transcript never resolve in the new one.
            self.pending = PendingSpawns::new();
            if let Some(ref file) = found {
                info!(file = %file.display(), "tracking claude session");
            }
            self.current = found;
        }
    }

    fn try_poll(&mut self) -> Result<Vec<Event>, SourceError> {
        self.scan_files();
        let Some(file) = self.current.clone() else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        for line in self.tail.read_new_lines(&file)? {
            // Malformed lines are skipped; the cursor has already moved past them.
            if let Ok(record) = serde_json::from_str::<Value>(&line) {
                events.extend(parse_record(&record, MAIN_AGENT, &mut self.pending));
            }
        }
        Ok(events)
    }
}

impl SourceAdapter for ClaudeSource {
    fn source_name(&self) -> &str {
        "CLAUDE CODE"
    }

    fn poll(&mut self) -> Vec<Event> {
        let result = self.try_poll();
        batch_or_empty("claude", result)
    }

    fn status(&self) -> String {
        match &self.current {
            Some(file) => {
                let stem = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown");
                format!("Session: {}...", super::prefix(stem, 8))
            }
            None => "No active session found".to_string(),
        }
    }

    fn watch_path(&self) -> Option<PathBuf> {
        self.project_dir.is_dir().then(|| self.project_dir.clone())
    }

    fn nudge(&mut self) {
        self.scan.reset();
    }
}

fn default_projects_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("projects"))
}

/// Derive the Claude Code log directory for a given project path.
/// Claude stores logs at `<root>/<slug>/` where slug is the absolute path
/// with `/` replaced by `-`. Newer versions also replace `.`; some
/// installs differ in `_` handling, so fall back to a normalized match and
/// finally to the most recently active project directory.
pub fn resolve_project_dir(projects_root: &Path, project_path: &Path) -> PathBuf {
    let raw = project_path.to_string_lossy();
    let exact = projects_root.join(raw.replace('/', "-"));
    if exact.is_dir() {
        return exact;
    }

    let dotted = projects_root.join(raw.replace(['/', '.'], "-"));
    if dotted.is_dir() {
        return dotted;
    }

    let wanted = normalize_slug(&raw.replace('/', "-"));
    if let Ok(entries) = fs::read_dir(projects_root) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            if normalize_slug(&name.to_string_lossy()) == wanted && entry.path().is_dir() {
                return entry.path();
            }
        }
    }

    most_recent_project_dir(projects_root).unwrap_or(exact)
}

fn normalize_slug(slug: &str) -> String {
    slug.replace(['_', '.'], "-").to_lowercase()
}

/// The project directory whose newest `.jsonl` is the most recent overall.
fn most_recent_project_dir(projects_root: &Path) -> Option<PathBuf> {
    fs::read_dir(projects_root)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|dir| newest_jsonl_mtime(&dir).map(|mtime| (dir, mtime)))
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(dir, _)| dir)
}

fn newest_jsonl_mtime(dir: &Path) -> Option<SystemTime> {
    fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("jsonl"))
        .filter_map(|path| fs::metadata(&path).ok()?.modified().ok())
        .max()
}

/// Find the latest session by scanning for UUID-named .jsonl files.
pub fn find_session_from_files(log_dir: &Path) -> Option<String> {
    let entries = fs::read_dir(log_dir).ok()?;

    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?;
            let stem = name.strip_suffix(".jsonl")?;
            if !is_uuid(stem) {
                return None;
            }
            // Skip empty files.
            let meta = fs::metadata(&path).ok()?;
            if meta.len() == 0 {
                return None;
            }
            let mtime = meta.modified().ok()?;
            Some((stem.to_string(), mtime))
        })
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(session_id, _)| session_id)
}

/// Check if a string looks like a UUID (8-4-4-4-12 hex chars).
fn is_uuid(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 5 {
        return false;
    }
    let expected_lens = [8, 4, 4, 4, 12];
    parts.iter().zip(expected_lens.iter()).all(|(part, &len)| {
        part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit())
    })
}

fn canonical_name(native: &str) -> String {
    TOOL_NAMES
        .iter()
        .find(|(from, _)| *from == native)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| native.to_string())
}

/// Translate one transcript record into events for `agent_id`.
pub fn parse_record(record: &Value, agent_id: &str, pending: &mut PendingSpawns) -> Vec<Event> {
    let mut events = Vec::new();
    let rec_type = record.get("type").and_then(|v| v.as_str()).unwrap_or("");

    match rec_type {
        "assistant" => {
            let Some(Value::Array(content)) = record.pointer("/message/content") else {
                return events;
            };
            for block in content {
                if block.get("type").and_then(|v| v.as_str()) != Some("tool_use") {
                    continue;
                }
                let name = block
                    .get("name")
                    .and_then(|v| v.as_str())
                    .filter(|n| !n.is_empty())
                    .unwrap_or("unknown");

                if SPAWN_TOOLS.contains(&name) {
                    let input = block.get("input");
                    let sub_type = input
                        .and_then(|i| i.get("subagent_type"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("agent");
                    let description = input
                        .and_then(|i| i.get("description"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("subtask");
                    let event = match block.get("id").and_then(|v| v.as_str()) {
                        Some(call_id) => pending.spawn(call_id, agent_id, sub_type, description, None),
                        None => Event::spawn(agent_id, sub_type, description),
                    };
                    events.push(event);
                } else {
                    events.push(Event::tool_started(agent_id, &canonical_name(name)));
                }
            }
        }

        "user" => {
            let Some(Value::Array(content)) = record.pointer("/message/content") else {
                return events;
            };
            let mut saw_result = false;
            let mut completions = Vec::new();
            for block in content {
                if block.get("type").and_then(|v| v.as_str()) != Some("tool_result") {
                    continue;
                }
                saw_result = true;
                if let Some(call_id) = block.get("tool_use_id").and_then(|v| v.as_str()) {
                    completions.extend(pending.resolve(call_id));
                }
            }
            if saw_result {
                events.push(Event::tool_ended(agent_id));
                events.extend(completions);
            }
        }

        "result" => events.push(Event::tool_ended(agent_id)),

        "system" if record.get("subtype").and_then(|v| v.as_str()) == Some("turn_duration") => {
            events.push(Event::turn_ended(agent_id));
        }

        _ => {}
    }

    events
}
