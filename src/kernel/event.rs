use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::types::{ConversationTurn, Reminder};

/// Identifier tying a deferred collaborator call back to its exchange.
pub type ExchangeId = Uuid;

/// A recognized utterance entering the queue. The transcription itself is a
/// collaborator concern; the kernel only ever sees text.
#[derive(Debug, Clone)]
pub struct UtteranceEvent {
    pub text: String,
    pub at: DateTime<Utc>,
}

impl UtteranceEvent {
    pub fn new(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            at,
        }
    }
}

/// Everything the orchestrator loop consumes, from any producer: the input
/// frontend, the two timer tasks, and workers reporting back.
#[derive(Debug, Clone)]
pub enum Event {
    Utterance(UtteranceEvent),
    ReminderTick(DateTime<Utc>),
    MonitorTick(DateTime<Utc>),
    ExchangeResolved { id: ExchangeId, reply: String },
    ExchangeFailed { id: ExchangeId, error: String },
    Shutdown,
}

/// Side effects produced by a step. The kernel never performs I/O itself;
/// the driver executes these.
#[derive(Debug, Clone)]
pub enum Directive {
    /// Speak (and print) a response.
    Speak(String),
    /// Surface a due reminder: visual plus audio, exactly once.
    Notify(Reminder),
    /// Run one background-monitor sampling pass off the loop.
    RunMonitor(DateTime<Utc>),
    /// Ask the chat backend for a completion over the recent history.
    CallChat {
        id: ExchangeId,
        history: Vec<ConversationTurn>,
    },
    /// Launch an application by name.
    CallAppLaunch { id: ExchangeId, app: String },
    /// Run a web search.
    CallWebSearch { id: ExchangeId, query: String },
    /// Stop the driver loop.
    Halt,
}
