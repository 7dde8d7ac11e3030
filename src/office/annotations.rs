//! Transient text drawn over the office: speech bubbles and the whiteboard.

/// Short labels shown in tool bubbles.
const TOOL_ICONS: &[(&str, &str)] = &[
    ("Read", "Read"),
    ("Edit", "Edit"),
    ("Write", "Write"),
    ("Bash", "$ Bash"),
    ("Grep", "Grep"),
    ("Glob", "Glob"),
    ("Task", "Task"),
    ("WebFetch", "Web"),
    ("WebSearch", "Search"),
    ("NotebookEdit", "Notebook"),
    ("AskUserQuestion", "Ask?"),
    ("EnterPlanMode", "Plan"),
    ("ExitPlanMode", "Plan OK"),
    ("Docs", "Docs"),
    ("TodoWrite", "Todo"),
    ("SendMessage", "Msg"),
    ("TaskCreate", "Task+"),
    ("TaskUpdate", "Task~"),
    ("unknown", "..."),
];

pub const TOOL_BUBBLE_SECS: f64 = 5.0;
pub const WHITEBOARD_TTL_SECS: f64 = 15.0;
pub const WHITEBOARD_ROWS: usize = 4;

/// Bubble text for a canonical tool name.
pub fn tool_label(tool: &str) -> String {
    TOOL_ICONS
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, icon)| (*icon).to_string())
        .unwrap_or_else(|| tool.chars().take(12).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechBubble {
    pub text: String,
    /// Seconds left; `None` stays up until replaced or cleared.
    pub remaining: Option<f64>,
    /// Drawn in the alert palette.
    pub alert: bool,
}

impl SpeechBubble {
    pub fn for_tool(tool: &str) -> Self {
        Self {
            text: tool_label(tool),
            remaining: Some(TOOL_BUBBLE_SECS),
            alert: false,
        }
    }

    pub fn for_waiting(tool: &str) -> Self {
        Self {
            text: format!("HELP! {tool}?"),
            remaining: None,
            alert: true,
        }
    }

    /// Advance by `dt`; false once the bubble has expired.
    pub fn tick(&mut self, dt: f64) -> bool {
        match self.remaining.as_mut() {
            None => true,
            Some(left) => {
                *left -= dt;
                *left > 0.0
            }
        }
    }
}

/// Most recently used distinct tools, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Whiteboard {
    entries: Vec<(String, f64)>,
}

impl Whiteboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a use of `tool`. A tool already listed keeps its row and
    /// gets a fresh expiry.
    pub fn note(&mut self, tool: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == tool) {
            entry.1 = WHITEBOARD_TTL_SECS;
            return;
        }
        self.entries.push((tool.to_string(), WHITEBOARD_TTL_SECS));
        if self.entries.len() > WHITEBOARD_ROWS {
            let excess = self.entries.len() - WHITEBOARD_ROWS;
            self.entries.drain(..excess);
        }
    }

    pub fn tick(&mut self, dt: f64) {
        for entry in &mut self.entries {
            entry.1 -= dt;
        }
        self.entries.retain(|(_, left)| *left > 0.0);
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }
}
