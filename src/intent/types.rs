use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Closed set of things the assistant knows how to do. Dispatch over this
/// enum is a total match; adding a variant forces every dispatch site to
/// handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
    Chat,
    OpenApp,
    WebSearch,
    SetReminder,
    ListReminders,
    CancelReminder,
    SetPreference,
    RecallActivity,
    MoodQuery,
    DailySummary,
    Pause,
    Resume,
    Unrecognized,
}

/// Parameter keys used in [`Intent::params`].
pub mod param {
    /// Raw utterance text, carried for chat prompts.
    pub const TEXT: &str = "text";
    /// Reminder message.
    pub const MESSAGE: &str = "message";
    /// Absolute fire time, RFC 3339.
    pub const FIRE_AT: &str = "fire_at";
    /// Recurrence: "none", "daily", "weekly", or "interval:<secs>".
    pub const RECURRENCE: &str = "recurrence";
    /// Application name to launch.
    pub const APP: &str = "app";
    /// Web-search or cancel-reminder query.
    pub const QUERY: &str = "query";
    /// Preference key.
    pub const KEY: &str = "key";
    /// Preference value.
    pub const VALUE: &str = "value";
}

/// A classified utterance: one kind plus string parameters. Immutable once
/// produced; consumed exactly once by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub params: HashMap<String, String>,
}

impl Intent {
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            params: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
