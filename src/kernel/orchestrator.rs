use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AssistantError;
use crate::intent::classifier::classify;
use crate::intent::types::IntentKind;
use crate::kernel::context::{greeting, Presence, PresenceRequest, SessionContext};
use crate::kernel::event::{Directive, Event, ExchangeId, UtteranceEvent};
use crate::kernel::handlers::{self, DeferredCall, Dispatch, HandlerEnv};
use crate::kernel::scheduler::ReminderScheduler;
use crate::store::types::{ConversationTurn, Role};
use crate::store::{Collection, Store, StoreError};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub wake_phrase: String,
    pub max_history: usize,
    pub engaged_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            wake_phrase: "hey vesper".to_string(),
            max_history: 10,
            engaged_timeout_secs: 30,
        }
    }
}

struct PendingExchange {
    kind: IntentKind,
    at: DateTime<Utc>,
}

/// The central decision loop. Consumes one event queue fed by the input
/// frontend, the two timer tasks, and workers; every `step` is synchronous
/// and returns the side effects for the driver to execute. Handler failures
/// are converted to spoken responses here and never stop the loop.
pub struct Orchestrator {
    receiver: mpsc::Receiver<Event>,
    store: Arc<dyn Store>,
    pub scheduler: ReminderScheduler,
    pub context: SessionContext,
    config: OrchestratorConfig,
    pending: HashMap<ExchangeId, PendingExchange>,
    storage_warned: bool,
}

impl Orchestrator {
    pub fn new(
        receiver: mpsc::Receiver<Event>,
        store: Arc<dyn Store>,
        config: OrchestratorConfig,
    ) -> Self {
        let scheduler = ReminderScheduler::new(store.clone());
        let context = SessionContext::new(config.wake_phrase.as_str(), config.engaged_timeout_secs);
        Self {
            receiver,
            store,
            scheduler,
            context,
            config,
            pending: HashMap::new(),
            storage_warned: false,
        }
    }

    /// Reload pending reminders from the store. Called once at startup.
    pub fn restore(&mut self) -> Result<usize, StoreError> {
        self.scheduler.load()
    }

    pub async fn next_event(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Advance the loop by one event. Never awaits I/O; never panics on a
    /// handler failure.
    pub fn step(&mut self, event: Event) -> Vec<Directive> {
        match event {
            Event::Utterance(utterance) => self.on_utterance(utterance),
            Event::ReminderTick(now) => self.on_reminder_tick(now),
            Event::MonitorTick(now) => vec![Directive::RunMonitor(now)],
            Event::ExchangeResolved { id, reply } => self.on_exchange_resolved(id, reply),
            Event::ExchangeFailed { id, error } => self.on_exchange_failed(id, error),
            Event::Shutdown => vec![Directive::Halt],
        }
    }

    fn on_utterance(&mut self, utterance: UtteranceEvent) -> Vec<Directive> {
        let text = utterance.text.trim().to_string();
        let lower = text.to_lowercase();

        match self.context.presence {
            Presence::Paused => {
                // Only resume is honored while paused.
                if classify(&text, utterance.at).kind == IntentKind::Resume {
                    self.process_command(&text, utterance.at)
                } else {
                    Vec::new()
                }
            }
            Presence::Idle => {
                let Some(remainder) = self.context.strip_wake_phrase(&lower) else {
                    // Non-wake audio while idle is treated as silence.
                    return Vec::new();
                };
                self.context.apply(PresenceRequest::WakeDetected);
                self.context.touch(utterance.at);
                info!("wake phrase detected");
                if remainder.is_empty() {
                    vec![Directive::Speak(greeting(utterance.at))]
                } else {
                    // "hey vesper, open firefox" carries the command inline.
                    let command = remainder.to_string();
                    self.process_command(&command, utterance.at)
                }
            }
            Presence::Engaged => {
                if text.is_empty() {
                    return vec![Directive::Speak(AssistantError::RecognitionFailed.spoken())];
                }
                self.process_command(&text, utterance.at)
            }
        }
    }

    fn process_command(&mut self, text: &str, at: DateTime<Utc>) -> Vec<Directive> {
        self.context.touch(at);
        let intent = classify(text, at);
        info!(kind = ?intent.kind, "dispatching intent");

        self.append_turn(Role::User, text, at);

        let mut env = HandlerEnv {
            store: &self.store,
            scheduler: &mut self.scheduler,
            context: &mut self.context,
            now: at,
        };
        match handlers::dispatch(&intent, &mut env) {
            Ok(Dispatch::Reply(reply)) => {
                self.append_turn(Role::Assistant, &reply, at);
                vec![Directive::Speak(reply)]
            }
            Ok(Dispatch::Defer(call)) => {
                let id = Uuid::new_v4();
                self.pending.insert(
                    id,
                    PendingExchange {
                        kind: intent.kind,
                        at,
                    },
                );
                vec![match call {
                    DeferredCall::Chat => Directive::CallChat {
                        id,
                        history: self.recent_history(),
                    },
                    DeferredCall::LaunchApp { app } => Directive::CallAppLaunch { id, app },
                    DeferredCall::WebSearch { query } => Directive::CallWebSearch { id, query },
                }]
            }
            Err(e) => {
                error!(kind = ?intent.kind, "handler failed: {e}");
                let reply = e.spoken();
                self.append_turn(Role::Assistant, &reply, at);
                vec![Directive::Speak(reply)]
            }
        }
    }

    fn on_reminder_tick(&mut self, now: DateTime<Utc>) -> Vec<Directive> {
        if self.context.timed_out(now) {
            self.context.apply(PresenceRequest::EngagedTimeout);
            info!("engaged session timed out, returning to idle");
        }

        let due = self.scheduler.tick(now);
        if self.context.presence == Presence::Paused {
            // Firings are committed either way; while paused they go to the
            // log instead of the voice channel.
            for reminder in &due {
                info!(message = %reminder.message, "reminder due while paused");
            }
            return Vec::new();
        }
        due.into_iter().map(Directive::Notify).collect()
    }

    fn on_exchange_resolved(&mut self, id: ExchangeId, reply: String) -> Vec<Directive> {
        let Some(exchange) = self.pending.remove(&id) else {
            warn!(%id, "result for unknown exchange dropped");
            return Vec::new();
        };
        self.append_turn(Role::Assistant, &reply, exchange.at);
        vec![Directive::Speak(reply)]
    }

    fn on_exchange_failed(&mut self, id: ExchangeId, error: String) -> Vec<Directive> {
        let Some(exchange) = self.pending.remove(&id) else {
            warn!(%id, "failure for unknown exchange dropped");
            return Vec::new();
        };
        error!(kind = ?exchange.kind, "exchange failed: {error}");
        let reply = match exchange.kind {
            IntentKind::Chat => AssistantError::Api(error).spoken(),
            _ => "Sorry, I couldn't do that.".to_string(),
        };
        self.append_turn(Role::Assistant, &reply, exchange.at);
        vec![Directive::Speak(reply)]
    }

    /// Append a conversation turn and evict past `max_history`, FIFO. A
    /// storage failure degrades to memory-only with a single warning.
    fn append_turn(&mut self, role: Role, text: &str, at: DateTime<Utc>) {
        let turn = ConversationTurn::new(role, text, at);
        let body = match serde_json::to_value(&turn) {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to serialize conversation turn: {e}");
                return;
            }
        };
        let result = self
            .store
            .append(Collection::Conversation, body)
            .and_then(|_| {
                self.store
                    .prune_oldest(Collection::Conversation, self.config.max_history)
            });
        if let Err(e) = result {
            if !self.storage_warned {
                warn!("conversation history degraded to memory only: {e}");
                self.storage_warned = true;
            }
        }
    }

    /// The most recent turns, oldest first, for the chat backend.
    fn recent_history(&self) -> Vec<ConversationTurn> {
        match self.store.read_all(Collection::Conversation) {
            Ok(records) => {
                let turns: Vec<ConversationTurn> = records
                    .into_iter()
                    .filter_map(|(_, body)| serde_json::from_value(body).ok())
                    .collect();
                let skip = turns.len().saturating_sub(self.config.max_history);
                turns.into_iter().skip(skip).collect()
            }
            Err(e) => {
                warn!("could not read conversation history: {e}");
                Vec::new()
            }
        }
    }
}
