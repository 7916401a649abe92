use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the bounded conversation history. Turns are appended
/// user-then-assistant per exchange and evicted FIFO past `max_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            at,
        }
    }
}

/// Re-arm policy for a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "secs", rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Interval(u64),
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::None)
    }

    /// One recurrence step forward from `from`. `None` recurrence is the
    /// caller's bug; it returns `from` unchanged.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Recurrence::None => from,
            Recurrence::Daily => from + chrono::Duration::days(1),
            Recurrence::Weekly => from + chrono::Duration::weeks(1),
            Recurrence::Interval(secs) => from + chrono::Duration::seconds(*secs as i64),
        }
    }

    /// Spoken suffix for confirmations ("I'll remind you to X every day at ...").
    pub fn spoken_suffix(&self) -> &'static str {
        match self {
            Recurrence::None => "",
            Recurrence::Daily => " every day",
            Recurrence::Weekly => " every week",
            Recurrence::Interval(_) => " on an interval",
        }
    }
}

/// A scheduled reminder. `fire_at` for a recurring reminder only ever moves
/// forward; at most one firing is emitted per `fire_at` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub message: String,
    pub fire_at: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub fired: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        message: impl Into<String>,
        fire_at: DateTime<Utc>,
        recurrence: Recurrence,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            fire_at,
            recurrence,
            fired: false,
            created_at,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.fired && self.fire_at <= now
    }
}

/// One focus span observed by the background monitor. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub app_name: String,
    pub window_title: String,
    #[serde(default)]
    pub ocr_text: String,
    pub at: DateTime<Utc>,
    pub duration_secs: u64,
}

/// One facial-emotion reading. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionSample {
    pub emotion_label: String,
    pub confidence: f32,
    pub at: DateTime<Utc>,
}

/// A remembered user preference, written by explicit "remember" intents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub key: String,
    pub value: String,
    pub at: DateTime<Utc>,
}
