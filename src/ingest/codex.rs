use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use ignore::WalkBuilder;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::tail::LineTail;
use super::{batch_or_empty, canonical_tool, Event, SourceAdapter, SourceError, Throttle, MAIN_AGENT};

/// `item.type` values from `codex exec --json` streams.
const ITEM_TOOLS: &[(&str, &str)] = &[
    ("command_execution", "Bash"),
    ("file_change", "Edit"),
    ("file_changes", "Edit"),
    ("web_search", "WebSearch"),
    ("todo_list", "TodoWrite"),
    ("reasoning", "Thinking"),
];

/// Function names inside rollout `response_item` payloads.
const FUNCTION_TOOLS: &[(&str, &str)] = &[
    ("shell", "Bash"),
    ("local_shell", "Bash"),
    ("exec_command", "Bash"),
    ("apply_patch", "Edit"),
    ("update_plan", "TodoWrite"),
    ("web_search", "WebSearch"),
    ("view_image", "Read"),
];

#[derive(Debug, Clone)]
pub struct CodexOptions {
    /// Default `~/.codex/sessions`.
    pub sessions_root: Option<PathBuf>,
    pub scan_interval: Duration,
}

impl Default for CodexOptions {
    fn default() -> Self {
        Self {
            sessions_root: None,
            scan_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodexRecord {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    item: Option<CodexItem>,
    #[serde(default)]
    payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CodexItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: Option<String>,
}

/// Follows the most recently written Codex rollout file.
pub struct CodexSource {
    sessions_root: PathBuf,
    current: Option<PathBuf>,
    tail: LineTail,
    scan: Throttle,
}

impl CodexSource {
    pub fn new(opts: CodexOptions) -> Self {
        let sessions_root = opts
            .sessions_root
            .or_else(|| dirs::home_dir().map(|h| h.join(".codex").join("sessions")))
            .unwrap_or_else(|| PathBuf::from(".codex/sessions"));
        Self {
            sessions_root,
            current: None,
            tail: LineTail::new(),
            scan: Throttle::new(opts.scan_interval),
        }
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn try_poll(&mut self) -> Result<Vec<Event>, SourceError> {
        if self.scan.ready() {
            if let Some(latest) = find_latest_rollout(&self.sessions_root) {
                if self.current.as_ref() != Some(&latest) {
                    if let Some(old) = self.current.take() {
                        self.tail.forget(&old);
                    }
                    info!(file = %latest.display(), "tracking codex rollout");
                    self.current = Some(latest);
                }
            }
        }

        let Some(file) = self.current.clone() else {
            return Ok(Vec::new());
        };

        let events = self
            .tail
            .read_new_lines(&file)?
            .iter()
            .filter_map(|line| serde_json::from_str::<CodexRecord>(line).ok())
            .filter_map(|record| parse_record(&record))
            .collect();
        Ok(events)
    }
}

impl SourceAdapter for CodexSource {
    fn source_name(&self) -> &str {
        "CODEX"
    }

    fn poll(&mut self) -> Vec<Event> {
        let result = self.try_poll();
        batch_or_empty("codex", result)
    }

    fn status(&self) -> String {
        match self.current.as_ref().and_then(|f| f.file_name()) {
            Some(name) => format!("Codex: {}", super::prefix(&name.to_string_lossy(), 20)),
            None => "Codex: no session found".to_string(),
        }
    }

    fn watch_path(&self) -> Option<PathBuf> {
        self.sessions_root.is_dir().then(|| self.sessions_root.clone())
    }

    fn nudge(&mut self) {
        self.scan.reset();
    }
}

/// Most recently modified `rollout-*.jsonl` anywhere under `root`.
pub fn find_latest_rollout(root: &Path) -> Option<PathBuf> {
    if !root.is_dir() {
        return None;
    }
    WalkBuilder::new(root)
        .standard_filters(false)
        .build()
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with("rollout-") && name.ends_with(".jsonl")
        })
        .filter_map(|entry| {
            let mtime: SystemTime = entry.metadata().ok()?.modified().ok()?;
            Some((entry.into_path(), mtime))
        })
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(path, _)| path)
}

fn parse_record(record: &CodexRecord) -> Option<Event> {
    match record.kind.as_str() {
        "item.started" => {
            let item = record.item.as_ref()?;
            let tool = match item.kind.as_str() {
                "mcp_tool_call" => item.name.clone().unwrap_or_else(|| "mcp-tool".to_string()),
                "" => "unknown".to_string(),
                other => canonical_tool(ITEM_TOOLS, other),
            };
            Some(Event::tool_started(MAIN_AGENT, &tool))
        }
        "item.completed" => Some(Event::tool_ended(MAIN_AGENT)),
        "turn.completed" => Some(Event::turn_ended(MAIN_AGENT)),

        "response_item" => {
            let payload = record.payload.as_ref()?;
            match payload.get("type")?.as_str()? {
                "function_call" | "custom_tool_call" | "local_shell_call" => {
                    let name = payload.get("name").and_then(|v| v.as_str()).unwrap_or("shell");
                    Some(Event::tool_started(MAIN_AGENT, &canonical_tool(FUNCTION_TOOLS, name)))
                }
                "function_call_output" | "custom_tool_call_output" => {
                    Some(Event::tool_ended(MAIN_AGENT))
                }
                _ => None,
            }
        }
        "event_msg" => {
            let payload = record.payload.as_ref()?;
            (payload.get("type")?.as_str()? == "task_complete").then(|| Event::turn_ended(MAIN_AGENT))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn parse(line: &str) -> Option<Event> {
        parse_record(&serde_json::from_str(line).unwrap())
    }

    #[test]
    fn exec_items_map_to_tools() {
        assert_eq!(
            parse(r#"{"type":"item.started","item":{"id":"i1","type":"command_execution","command":"ls"}}"#),
            Some(Event::tool_started("main", "Bash"))
        );
        assert_eq!(
            parse(r#"{"type":"item.started","item":{"type":"file_change"}}"#),
            Some(Event::tool_started("main", "Edit"))
        );
        assert_eq!(
            parse(r#"{"type":"item.started","item":{"type":"mcp_tool_call","name":"fetch_docs"}}"#),
            Some(Event::tool_started("main", "fetch_docs"))
        );
        assert_eq!(
            parse(r#"{"type":"item.started","item":{"type":"agent_message"}}"#),
            Some(Event::tool_started("main", "Agent_message"))
        );
    }

    #[test]
    fn completions_and_turns() {
        assert_eq!(parse(r#"{"type":"item.completed","item":{"type":"command_execution"}}"#), Some(Event::tool_ended("main")));
        assert_eq!(parse(r#"{"type":"turn.completed","usage":{}}"#), Some(Event::turn_ended("main")));
        assert_eq!(parse(r#"{"type":"thread.started"}"#), None);
    }

    #[test]
    fn rollout_envelope_records() {
        assert_eq!(
            parse(r#"{"type":"response_item","payload":{"type":"function_call","name":"shell","arguments":"{}"}}"#),
            Some(Event::tool_started("main", "Bash"))
        );
        assert_eq!(
            parse(r#"{"type":"response_item","payload":{"type":"custom_tool_call","name":"apply_patch"}}"#),
            Some(Event::tool_started("main", "Edit"))
        );
        assert_eq!(
            parse(r#"{"type":"response_item","payload":{"type":"function_call_output","call_id":"c"}}"#),
            Some(Event::tool_ended("main"))
        );
        assert_eq!(
            parse(r#"{"type":"event_msg","payload":{"type":"task_complete"}}"#),
            Some(Event::turn_ended("main"))
        );
        assert_eq!(parse(r#"{"type":"response_item","payload":{"type":"message"}}"#), None);
    }

    #[test]
    fn finds_latest_rollout_recursively() {
        let root = tempfile::tempdir().unwrap();
        let day = root.path().join("2025").join("06").join("01");
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("rollout-a.jsonl"), "{}\n").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        fs::write(day.join("rollout-b.jsonl"), "{}\n").unwrap();
        fs::write(day.join("notes.jsonl"), "{}\n").unwrap();

        assert_eq!(find_latest_rollout(root.path()), Some(day.join("rollout-b.jsonl")));
        assert_eq!(find_latest_rollout(&root.path().join("missing")), None);
    }

    #[test]
    fn source_skips_history_then_follows_appends() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("rollout-x.jsonl");
        fs::write(&file, "{\"type\":\"item.completed\"}\n").unwrap();

        let mut source = CodexSource::new(CodexOptions {
            sessions_root: Some(root.path().to_path_buf()),
            scan_interval: Duration::ZERO,
        });
        assert!(source.poll().is_empty());
        assert!(source.status().starts_with("Codex: rollout-x"));

        let mut f = fs::OpenOptions::new().append(true).open(&file).unwrap();
        writeln!(f, r#"{{"type":"item.started","item":{{"type":"command_execution"}}}}"#).unwrap();
        writeln!(f, r#"{{"type":"item.completed"}}"#).unwrap();

        assert_eq!(
            source.poll(),
            vec![Event::tool_started("main", "Bash"), Event::tool_ended("main")]
        );
    }

    #[test]
    fn missing_root_reports_no_session() {
        let mut source = CodexSource::new(CodexOptions {
            sessions_root: Some(PathBuf::from("/definitely/not/here")),
            scan_interval: Duration::ZERO,
        });
        assert!(source.poll().is_empty());
        assert_eq!(source.status(), "Codex: no session found");
    }
}
