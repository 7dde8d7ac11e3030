use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, trace};

use super::correlate::PendingSpawns;
use super::{
    batch_or_empty, canonical_tool, open_read_only, prefix, Event, SourceAdapter, SourceError,
    Throttle, MAIN_AGENT,
};

const TOOL_NAMES: &[(&str, &str)] = &[
    ("read", "Read"),
    ("edit", "Edit"),
    ("write", "Write"),
    ("bash", "Bash"),
    ("glob", "Glob"),
    ("grep", "Grep"),
    ("list", "Glob"),
    ("webfetch", "WebFetch"),
    ("todowrite", "Write"),
    ("context7_resolve-library-id", "Docs"),
    ("context7_query-docs", "Docs"),
    ("invalid", "unknown"),
];

#[derive(Debug, Clone)]
pub struct OpenCodeOptions {
    /// Default `~/.local/share/opencode/opencode.db`.
    pub db_path: Option<PathBuf>,
    pub poll_interval: Duration,
    pub session_scan_interval: Duration,
}

impl Default for OpenCodeOptions {
    fn default() -> Self {
        Self {
            db_path: None,
            poll_interval: Duration::from_millis(500),
            session_scan_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "callID", default)]
    call_id: String,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    state: Option<ToolState>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolState {
    #[serde(default)]
    status: String,
    #[serde(default)]
    input: Value,
}

/// High-water mark inside one session's parts.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    session_id: String,
    last_rowid: i64,
}

/// Polls OpenCode's session database.
pub struct OpenCodeSource {
    db_path: PathBuf,
    latest_session: Option<String>,
    cursor: Option<Cursor>,
    throttle: Throttle,
    session_scan: Throttle,
    active_calls: HashSet<String>,
    deferred: Vec<Event>,
    pending: PendingSpawns,
}

impl OpenCodeSource {
    pub fn new(opts: OpenCodeOptions) -> Self {
        let db_path = opts.db_path.unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local/share/opencode/opencode.db")
        });
        Self {
            db_path,
            latest_session: None,
            cursor: None,
            throttle: Throttle::new(opts.poll_interval),
            session_scan: Throttle::new(opts.session_scan_interval),
            active_calls: HashSet::new(),
            deferred: Vec::new(),
            pending: PendingSpawns::new(),
        }
    }

    fn try_poll(&mut self) -> Result<Vec<Event>, SourceError> {
        if !self.throttle.ready() {
            return Ok(Vec::new());
        }
        let conn = open_read_only(&self.db_path)?;

        if self.latest_session.is_none() || self.session_scan.ready() {
            let latest = conn
                .query_row(
                    "SELECT id FROM session ORDER BY time_updated DESC LIMIT 1",
                    [],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            if latest.is_some() {
                self.latest_session = latest;
            }
        }
        let Some(session_id) = self.latest_session.clone() else {
            return Ok(std::mem::take(&mut self.deferred));
        };

        let tracked = self
            .cursor
            .as_ref()
            .filter(|c| c.session_id == session_id)
            .map(|c| c.last_rowid);
        let Some(last_rowid) = tracked else {
            let end = max_rowid(&conn, &session_id)?;
            info!(session = %session_id, rowid = end, "tracking opencode session");
            self.cursor = Some(Cursor { session_id, last_rowid: end });
            return Ok(std::mem::take(&mut self.deferred));
        };

        let mut stmt = conn.prepare(
            "SELECT rowid, data FROM part WHERE session_id = ?1 AND rowid > ?2 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![session_id, last_rowid], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, SqlValue>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        // Completions deferred by the previous poll go out first. A failed
        // query above leaves them queued.
        let mut events = std::mem::take(&mut self.deferred);

        for (rowid, data) in rows {
            if let Some(cursor) = self.cursor.as_mut() {
                cursor.last_rowid = rowid;
            }
            let SqlValue::Text(data) = data else {
                trace!(rowid, "skipping part without text data");
                continue;
            };
            match serde_json::from_str::<Part>(&data) {
                Ok(part) => events.extend(self.parse_part(&part)),
                Err(err) => trace!(rowid, error = %err, "skipping malformed part"),
            }
        }
        Ok(events)
    }

    fn parse_part(&mut self, part: &Part) -> Vec<Event> {
        match part.kind.as_str() {
            "tool" => {
                let tool = part.tool.as_deref().unwrap_or("unknown");
                let state = part.state.as_ref();
                let status = state.map(|s| s.status.as_str()).unwrap_or_default();
                if tool == "task" {
                    return self.task_part(&part.call_id, state, status);
                }
                let label = canonical_tool(TOOL_NAMES, tool);
                match status {
                    "pending" | "running" => {
                        if self.active_calls.insert(part.call_id.clone()) {
                            vec![Event::tool_started(MAIN_AGENT, &label)]
                        } else {
                            Vec::new()
                        }
                    }
                    "completed" | "error" => {
                        if self.active_calls.remove(&part.call_id) {
                            vec![Event::tool_ended(MAIN_AGENT)]
                        } else {
                            // Only the final record was written; let the start show for a tick.
                            self.deferred.push(Event::tool_ended(MAIN_AGENT));
                            vec![Event::tool_started(MAIN_AGENT, &label)]
                        }
                    }
                    _ => Vec::new(),
                }
            }
            "step-start" => vec![Event::tool_started(MAIN_AGENT, "Thinking")],
            "text" => {
                let text = part
                    .content
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .or(part.text.as_deref())
                    .unwrap_or_default();
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![Event::tool_started(MAIN_AGENT, "Thinking")]
                }
            }
            "step-finish" if part.reason.as_deref() == Some("stop") => {
                vec![Event::turn_ended(MAIN_AGENT)]
            }
            _ => Vec::new(),
        }
    }

    fn task_part(&mut self, call_id: &str, state: Option<&ToolState>, status: &str) -> Vec<Event> {
        match status {
            "pending" | "running" => {
                if !self.active_calls.insert(call_id.to_string()) {
                    return Vec::new();
                }
                let input = state.map(|s| &s.input);
                let field = |name: &str, default: &'static str| {
                    input
                        .and_then(|i| i.get(name))
                        .and_then(|v| v.as_str())
                        .unwrap_or(default)
                        .to_string()
                };
                let subagent_type = field("subagent_type", "agent");
                let description = field("description", "subtask");
                vec![self
                    .pending
                    .spawn(call_id, MAIN_AGENT, &subagent_type, &description, None)]
            }
            "completed" | "error" => {
                self.active_calls.remove(call_id);
                let mut events = vec![Event::tool_ended(MAIN_AGENT)];
                events.extend(self.pending.resolve(call_id));
                events
            }
            _ => Vec::new(),
        }
    }
}

impl SourceAdapter for OpenCodeSource {
    fn source_name(&self) -> &str {
        "OPENCODE"
    }

    fn poll(&mut self) -> Vec<Event> {
        let result = self.try_poll();
        batch_or_empty("opencode", result)
    }

    fn status(&self) -> String {
        if !self.db_path.is_file() {
            return "OpenCode: DB not found".to_string();
        }
        match &self.latest_session {
            Some(id) => format!("OpenCode: {}...", prefix(id, 12)),
            None => "OpenCode: scanning...".to_string(),
        }
    }

    fn watch_path(&self) -> Option<PathBuf> {
        self.db_path.parent().filter(|p| p.is_dir()).map(|p| p.to_path_buf())
    }

    fn nudge(&mut self) {
        self.throttle.reset();
    }
}

fn max_rowid(conn: &Connection, session_id: &str) -> Result<i64, SourceError> {
    let max = conn.query_row(
        "SELECT MAX(rowid) FROM part WHERE session_id = ?1",
        [session_id],
        |row| row.get::<_, Option<i64>>(0),
    )?;
    Ok(max.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use serde_json::json;

    fn create_db(path: &std::path::Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE session (id TEXT PRIMARY KEY, time_updated INTEGER NOT NULL);
             CREATE TABLE part (id TEXT, session_id TEXT NOT NULL, data TEXT);",
        )
        .unwrap();
        conn
    }

    fn add_session(conn: &Connection, id: &str, updated: i64) {
        conn.execute(
            "INSERT OR REPLACE INTO session (id, time_updated) VALUES (?1, ?2)",
            params![id, updated],
        )
        .unwrap();
    }

    fn add_part(conn: &Connection, session: &str, data: Value) {
        conn.execute(
            "INSERT INTO part (id, session_id, data) VALUES ('p', ?1, ?2)",
            params![session, data.to_string()],
        )
        .unwrap();
    }

    fn tool(call: &str, name: &str, status: &str) -> Value {
        json!({ "type": "tool", "callID": call, "tool": name, "state": { "status": status } })
    }

    fn source(path: &std::path::Path) -> OpenCodeSource {
        OpenCodeSource::new(OpenCodeOptions {
            db_path: Some(path.to_path_buf()),
            poll_interval: Duration::ZERO,
            session_scan_interval: Duration::ZERO,
        })
    }

    fn setup() -> (tempfile::TempDir, Connection, OpenCodeSource) {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("opencode.db");
        let conn = create_db(&db);
        add_session(&conn, "ses_abcdefghijklmnop", 1);
        add_part(&conn, "ses_abcdefghijklmnop", tool("old", "bash", "running"));
        let mut oc = source(&db);
        assert!(oc.poll().is_empty());
        (tmp, conn, oc)
    }

    #[test]
    fn first_poll_skips_existing_rows() {
        let (_tmp, _conn, oc) = setup();
        assert_eq!(oc.cursor.as_ref().unwrap().last_rowid, 1);
        assert_eq!(oc.status(), "OpenCode: ses_abcdefgh...");
    }

    #[test]
    fn pending_then_completed_tool() {
        let (_tmp, conn, mut oc) = setup();
        add_part(&conn, "ses_abcdefghijklmnop", tool("c1", "read", "pending"));
        add_part(&conn, "ses_abcdefghijklmnop", tool("c1", "read", "running"));
        assert_eq!(oc.poll(), vec![Event::tool_started("main", "Read")]);

        add_part(&conn, "ses_abcdefghijklmnop", tool("c1", "read", "completed"));
        assert_eq!(oc.poll(), vec![Event::tool_ended("main")]);
    }

    #[test]
    fn completed_only_defers_end_to_next_poll() {
        let (_tmp, conn, mut oc) = setup();
        add_part(&conn, "ses_abcdefghijklmnop", tool("c2", "list", "completed"));
        assert_eq!(oc.poll(), vec![Event::tool_started("main", "Glob")]);
        assert_eq!(oc.poll(), vec![Event::tool_ended("main")]);
        assert!(oc.poll().is_empty());
    }

    #[test]
    fn task_tool_spawns_and_resolves_children() {
        let (_tmp, conn, mut oc) = setup();
        add_part(
            &conn,
            "ses_abcdefghijklmnop",
            json!({ "type": "tool", "callID": "t1", "tool": "task", "state": {
                "status": "running",
                "input": { "subagent_type": "explore", "description": "find callers" }
            } }),
        );
        let events = oc.poll();
        assert_eq!(
            events,
            vec![Event::SpawnSubagent {
                parent_id: "main".into(),
                subagent_type: "explore".into(),
                description: "find callers".into(),
                tool_name: None,
                child_id: Some("task-t1-0".into()),
            }]
        );

        add_part(&conn, "ses_abcdefghijklmnop", tool("t1", "task", "completed"));
        assert_eq!(
            oc.poll(),
            vec![
                Event::tool_ended("main"),
                Event::tool_ended("task-t1-0"),
                Event::turn_ended("task-t1-0"),
            ]
        );
    }

    #[test]
    fn steps_text_and_malformed_rows() {
        let (_tmp, conn, mut oc) = setup();
        add_part(&conn, "ses_abcdefghijklmnop", json!({ "type": "step-start" }));
        add_part(&conn, "ses_abcdefghijklmnop", json!({ "type": "text", "text": "   " }));
        conn.execute(
            "INSERT INTO part (id, session_id, data) VALUES ('p', 'ses_abcdefghijklmnop', 'not json')",
            [],
        )
        .unwrap();
        add_part(&conn, "ses_abcdefghijklmnop", json!({ "type": "text", "text": "hello" }));
        add_part(&conn, "ses_abcdefghijklmnop", json!({ "type": "step-finish", "reason": "tool-calls" }));
        add_part(&conn, "ses_abcdefghijklmnop", json!({ "type": "step-finish", "reason": "stop" }));

        assert_eq!(
            oc.poll(),
            vec![
                Event::tool_started("main", "Thinking"),
                Event::tool_started("main", "Thinking"),
                Event::turn_ended("main"),
            ]
        );
        assert_eq!(oc.cursor.as_ref().unwrap().last_rowid, 7);
    }

    #[test]
    fn null_and_blob_rows_are_skipped() {
        let (_tmp, conn, mut oc) = setup();
        conn.execute(
            "INSERT INTO part (id, session_id, data) VALUES ('p', 'ses_abcdefghijklmnop', NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO part (id, session_id, data) VALUES ('p', 'ses_abcdefghijklmnop', ?1)",
            params![vec![0u8, 1, 2]],
        )
        .unwrap();
        add_part(&conn, "ses_abcdefghijklmnop", tool("c3", "read", "running"));

        assert_eq!(oc.poll(), vec![Event::tool_started("main", "Read")]);
        assert_eq!(oc.cursor.as_ref().unwrap().last_rowid, 4);
        assert!(oc.poll().is_empty());
    }

    #[test]
    fn failed_poll_keeps_deferred_completions() {
        let (_tmp, conn, mut oc) = setup();
        add_part(&conn, "ses_abcdefghijklmnop", tool("c4", "grep", "completed"));
        assert_eq!(oc.poll(), vec![Event::tool_started("main", "Grep")]);

        // Break the parts table so the next query fails.
        conn.execute_batch("ALTER TABLE part RENAME TO part_gone;").unwrap();
        assert!(oc.poll().is_empty());

        conn.execute_batch("ALTER TABLE part_gone RENAME TO part;").unwrap();
        assert_eq!(oc.poll(), vec![Event::tool_ended("main")]);
    }

    #[test]
    fn session_switch_skips_to_end() {
        let (_tmp, conn, mut oc) = setup();
        add_session(&conn, "ses_new", 5);
        add_part(&conn, "ses_new", tool("n1", "edit", "running"));
        assert!(oc.poll().is_empty());

        add_part(&conn, "ses_new", tool("n2", "write", "running"));
        assert_eq!(oc.poll(), vec![Event::tool_started("main", "Write")]);
    }

    #[test]
    fn missing_db_reports_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut oc = source(&tmp.path().join("none.db"));
        assert!(oc.poll().is_empty());
        assert_eq!(oc.status(), "OpenCode: DB not found");
    }
}
