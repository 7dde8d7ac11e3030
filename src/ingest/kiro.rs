use std::path::PathBuf;
use std::time::Duration;

use rusqlite::OptionalExtension;
use serde_json::Value;
use tracing::info;

use super::correlate::PendingSpawns;
use super::{
    batch_or_empty, canonical_tool, open_read_only, prefix, Event, SourceAdapter, SourceError,
    Throttle, MAIN_AGENT,
};

const TOOL_NAMES: &[(&str, &str)] = &[
    ("fs_read", "Read"),
    ("fs_write", "Write"),
    ("execute_bash", "Bash"),
    ("grep", "Grep"),
    ("glob", "Glob"),
    ("web_search", "WebSearch"),
    ("use_subagent", "Task"),
    ("resolvelibraryid", "WebSearch"),
    ("querydocs", "WebFetch"),
    ("dummy", "Read"),
];

const LATEST_CONVERSATION: &str = "SELECT key, conversation_id, updated_at, value \
     FROM conversations_v2 ORDER BY updated_at DESC LIMIT 1";

#[derive(Debug, Clone)]
pub struct KiroOptions {
    /// Default `<data dir>/kiro-cli/data.sqlite3`.
    pub db_path: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl Default for KiroOptions {
    fn default() -> Self {
        Self {
            db_path: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Position inside one conversation's history blob.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    key: String,
    conversation_id: String,
    history_len: usize,
    last_updated: i64,
}

/// Polls the Kiro CLI conversation store.
pub struct KiroSource {
    db_path: PathBuf,
    cursor: Option<Cursor>,
    throttle: Throttle,
    pending: PendingSpawns,
}

impl KiroSource {
    pub fn new(opts: KiroOptions) -> Self {
        let db_path = opts.db_path.unwrap_or_else(default_db_path);
        Self {
            db_path,
            cursor: None,
            throttle: Throttle::new(opts.poll_interval),
            pending: PendingSpawns::new(),
        }
    }

    pub fn db_path(&self) -> &std::path::Path {
        &self.db_path
    }

    fn try_poll(&mut self) -> Result<Vec<Event>, SourceError> {
        if !self.throttle.ready() {
            return Ok(Vec::new());
        }

        let conn = open_read_only(&self.db_path)?;
        let row = conn
            .query_row(LATEST_CONVERSATION, [], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;
        drop(conn);

        let Some((key, conversation_id, updated_at, value)) = row else {
            return Ok(Vec::new());
        };

        let switched = self
            .cursor
            .as_ref()
            .map_or(true, |c| c.key != key || c.conversation_id != conversation_id);
        if switched {
            let history_len = history(&serde_json::from_str(&value)?).len();
            info!(conversation = %conversation_id, history_len, "tracking kiro conversation");
            self.cursor = Some(Cursor {
                key,
                conversation_id,
                history_len,
                last_updated: updated_at,
            });
            return Ok(Vec::new());
        }

        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(Vec::new());
        };
        if updated_at == cursor.last_updated {
            return Ok(Vec::new());
        }
        cursor.last_updated = updated_at;

        let blob: Value = serde_json::from_str(&value)?;
        let entries = history(&blob);
        if entries.len() < cursor.history_len {
            cursor.history_len = entries.len();
            return Ok(Vec::new());
        }
        let new_entries = &entries[cursor.history_len..];
        cursor.history_len = entries.len();

        let mut events = Vec::new();
        for entry in new_entries {
            events.extend(parse_entry(entry, &mut self.pending));
        }
        Ok(events)
    }
}

impl SourceAdapter for KiroSource {
    fn source_name(&self) -> &str {
        "KIRO"
    }

    fn poll(&mut self) -> Vec<Event> {
        let result = self.try_poll();
        batch_or_empty("kiro", result)
    }

    fn status(&self) -> String {
        if !self.db_path.is_file() {
            return "Kiro: DB not found".to_string();
        }
        match &self.cursor {
            Some(c) => format!("Kiro: {}...", prefix(&c.conversation_id, 12)),
            None => "Kiro: scanning...".to_string(),
        }
    }

    fn watch_path(&self) -> Option<PathBuf> {
        self.db_path.parent().filter(|p| p.is_dir()).map(|p| p.to_path_buf())
    }

    fn nudge(&mut self) {
        self.throttle.reset();
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kiro-cli")
        .join("data.sqlite3")
}

fn history(blob: &Value) -> &[Value] {
    blob.get("history")
        .and_then(|h| h.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Events for one `{user, assistant}` history entry.
pub fn parse_entry(entry: &Value, pending: &mut PendingSpawns) -> Vec<Event> {
    let mut events = Vec::new();

    if let Some(results) = entry.pointer("/user/content/ToolUseResults") {
        events.push(Event::tool_ended(MAIN_AGENT));
        let ids = results
            .get("tool_use_results")
            .and_then(|r| r.as_array())
            .into_iter()
            .flatten()
            .filter_map(|r| r.get("tool_use_id").and_then(|id| id.as_str()));
        for id in ids {
            events.extend(pending.resolve(id));
        }
    }

    let Some(assistant) = entry.get("assistant") else {
        return events;
    };

    if let Some(tool_use) = assistant.get("ToolUse") {
        let uses = tool_use
            .get("tool_uses")
            .and_then(|u| u.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for tool in uses {
            let name = tool.get("name").and_then(|n| n.as_str()).unwrap_or("unknown");
            let call_id = tool.get("id").and_then(|i| i.as_str()).unwrap_or_default();
            let args = tool.get("args");
            let command = args
                .and_then(|a| a.get("command"))
                .and_then(|c| c.as_str())
                .unwrap_or_default();

            if name == "use_subagent" && command == "InvokeSubagents" {
                let subagents = args
                    .and_then(|a| a.pointer("/content/subagents"))
                    .and_then(|s| s.as_array())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                for sub in subagents {
                    let query = sub.get("query").and_then(|q| q.as_str()).unwrap_or("subtask");
                    events.push(pending.spawn(
                        call_id,
                        MAIN_AGENT,
                        "general-purpose",
                        &prefix(query, 40),
                        Some("Task".to_string()),
                    ));
                }
            } else {
                events.push(Event::tool_started(MAIN_AGENT, &canonical_tool(TOOL_NAMES, name)));
            }
        }
        events.push(Event::tool_ended(MAIN_AGENT));
    } else if assistant.get("Response").is_some() {
        events.push(Event::turn_ended(MAIN_AGENT));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};
    use serde_json::json;

    fn create_db(path: &std::path::Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE conversations_v2 (
                key TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (key, conversation_id)
            );",
        )
        .unwrap();
        conn
    }

    fn upsert(conn: &Connection, conv: &str, history: Value, updated_at: i64) {
        let value = json!({ "conversation_id": conv, "history": history }).to_string();
        conn.execute(
            "INSERT OR REPLACE INTO conversations_v2 (key, conversation_id, value, created_at, updated_at)
             VALUES ('/work/app', ?1, ?2, 0, ?3)",
            params![conv, value, updated_at],
        )
        .unwrap();
    }

    fn tool_use_entry(name: &str) -> Value {
        json!({
            "user": { "content": { "Prompt": { "prompt": "go" } } },
            "assistant": { "ToolUse": { "message_id": "m", "tool_uses": [
                { "id": "tooluse_1", "name": name, "args": {} }
            ] } }
        })
    }

    fn source(path: &std::path::Path) -> KiroSource {
        KiroSource::new(KiroOptions {
            db_path: Some(path.to_path_buf()),
            poll_interval: Duration::ZERO,
        })
    }

    #[test]
    fn tool_uses_map_through_table_then_end() {
        let mut pending = PendingSpawns::new();
        let events = parse_entry(&tool_use_entry("fs_read"), &mut pending);
        assert_eq!(
            events,
            vec![Event::tool_started("main", "Read"), Event::tool_ended("main")]
        );
        let events = parse_entry(&tool_use_entry("introspect"), &mut pending);
        assert_eq!(events[0], Event::tool_started("main", "Introspect"));
    }

    #[test]
    fn response_ends_turn() {
        let entry = json!({ "assistant": { "Response": { "content": "done" } } });
        assert_eq!(
            parse_entry(&entry, &mut PendingSpawns::new()),
            vec![Event::turn_ended("main")]
        );
    }

    #[test]
    fn invoke_subagents_spawns_and_results_resolve() {
        let mut pending = PendingSpawns::new();
        let long_query = "x".repeat(60);
        let spawn = json!({
            "assistant": { "ToolUse": { "tool_uses": [{
                "id": "tu_9",
                "name": "use_subagent",
                "args": { "command": "InvokeSubagents", "content": { "subagents": [
                    { "query": "map the codebase" },
                    { "query": long_query }
                ] } }
            }] } }
        });
        let events = parse_entry(&spawn, &mut pending);
        assert_eq!(events.len(), 3);
        match &events[1] {
            Event::SpawnSubagent { description, tool_name, child_id, subagent_type, .. } => {
                assert_eq!(description.chars().count(), 40);
                assert_eq!(tool_name.as_deref(), Some("Task"));
                assert_eq!(child_id.as_deref(), Some("task-tu_9-1"));
                assert_eq!(subagent_type, "general-purpose");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events[2], Event::tool_ended("main"));

        let results = json!({
            "user": { "content": { "ToolUseResults": { "tool_use_results": [
                { "tool_use_id": "tu_9", "content": [], "status": "Success" }
            ] } } }
        });
        let events = parse_entry(&results, &mut pending);
        assert_eq!(
            events,
            vec![
                Event::tool_ended("main"),
                Event::tool_ended("task-tu_9-0"),
                Event::turn_ended("task-tu_9-0"),
                Event::tool_ended("task-tu_9-1"),
                Event::turn_ended("task-tu_9-1"),
            ]
        );
        assert_eq!(pending.outstanding(), 0);
    }

    #[test]
    fn plain_use_subagent_is_task_tool() {
        let mut pending = PendingSpawns::new();
        let events = parse_entry(&tool_use_entry("use_subagent"), &mut pending);
        assert_eq!(events[0], Event::tool_started("main", "Task"));
        assert_eq!(pending.outstanding(), 0);
    }

    #[test]
    fn source_anchors_then_diffs_history() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("data.sqlite3");
        let conn = create_db(&db);
        upsert(&conn, "conv-aaaaaaaaaaaa-1", json!([tool_use_entry("fs_read")]), 100);

        let mut kiro = source(&db);
        assert_eq!(kiro.status(), "Kiro: scanning...");
        assert!(kiro.poll().is_empty());
        assert_eq!(kiro.status(), "Kiro: conv-aaaaaaa...");

        // unchanged timestamp: nothing
        assert!(kiro.poll().is_empty());

        upsert(
            &conn,
            "conv-aaaaaaaaaaaa-1",
            json!([tool_use_entry("fs_read"), tool_use_entry("execute_bash")]),
            200,
        );
        assert_eq!(
            kiro.poll(),
            vec![Event::tool_started("main", "Bash"), Event::tool_ended("main")]
        );
        assert!(kiro.poll().is_empty());
    }

    #[test]
    fn new_conversation_re_anchors() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("data.sqlite3");
        let conn = create_db(&db);
        upsert(&conn, "first", json!([]), 1);

        let mut kiro = source(&db);
        kiro.poll();
        upsert(&conn, "second", json!([tool_use_entry("grep"), tool_use_entry("glob")]), 2);
        assert!(kiro.poll().is_empty());

        upsert(
            &conn,
            "second",
            json!([tool_use_entry("grep"), tool_use_entry("glob"), tool_use_entry("grep")]),
            3,
        );
        assert_eq!(kiro.poll()[0], Event::tool_started("main", "Grep"));
    }

    #[test]
    fn shrunk_history_re_anchors() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("data.sqlite3");
        let conn = create_db(&db);
        upsert(&conn, "c", json!([tool_use_entry("grep"), tool_use_entry("grep")]), 1);

        let mut kiro = source(&db);
        kiro.poll();
        upsert(&conn, "c", json!([tool_use_entry("grep")]), 2);
        assert!(kiro.poll().is_empty());
        upsert(&conn, "c", json!([tool_use_entry("grep"), tool_use_entry("fs_write")]), 3);
        assert_eq!(kiro.poll()[0], Event::tool_started("main", "Write"));
    }

    #[test]
    fn missing_db_is_empty_and_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut kiro = source(&tmp.path().join("absent.sqlite3"));
        assert!(kiro.poll().is_empty());
        assert_eq!(kiro.status(), "Kiro: DB not found");
    }
}
