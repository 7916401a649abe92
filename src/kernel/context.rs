use chrono::{DateTime, Duration, Timelike, Utc};

/// Wake state of the assistant. `Idle` listens only for the wake phrase,
/// `Engaged` processes commands, `Paused` honors nothing but resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Idle,
    Engaged,
    Paused,
}

/// Requests for a presence transition. These are requests, not forces; the
/// transition table decides.
#[derive(Debug, Clone, Copy)]
pub enum PresenceRequest {
    WakeDetected,
    EngagedTimeout,
    PauseRequested,
    ResumeRequested,
}

/// Pure function: (current, request) -> new state, or `None` when the
/// transition is invalid and must be ignored.
pub fn transition(current: Presence, request: PresenceRequest) -> Option<Presence> {
    use Presence::*;
    use PresenceRequest::*;

    match (current, request) {
        (Idle, WakeDetected) => Some(Engaged),
        (Idle, PauseRequested) => Some(Paused),

        (Engaged, EngagedTimeout) => Some(Idle),
        (Engaged, PauseRequested) => Some(Paused),

        (Paused, ResumeRequested) => Some(Engaged),

        _ => None,
    }
}

/// Explicit per-session state threaded through the loop; replaces the
/// module-level globals of a typical assistant main script so a single
/// iteration can be tested in isolation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub presence: Presence,
    pub wake_phrase: String,
    pub last_interaction: Option<DateTime<Utc>>,
    engaged_timeout: Duration,
}

impl SessionContext {
    pub fn new(wake_phrase: impl Into<String>, engaged_timeout_secs: u64) -> Self {
        Self {
            presence: Presence::Idle,
            wake_phrase: wake_phrase.into().to_lowercase(),
            last_interaction: None,
            engaged_timeout: Duration::seconds(engaged_timeout_secs as i64),
        }
    }

    /// Apply a transition request; returns whether it was honored.
    pub fn apply(&mut self, request: PresenceRequest) -> bool {
        match transition(self.presence, request) {
            Some(next) => {
                self.presence = next;
                true
            }
            None => false,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction = Some(now);
    }

    /// An engaged session with no interaction inside the timeout drifts
    /// back to idle.
    pub fn timed_out(&self, now: DateTime<Utc>) -> bool {
        self.presence == Presence::Engaged
            && self
                .last_interaction
                .map(|last| now - last > self.engaged_timeout)
                .unwrap_or(true)
    }

    /// Locate the wake phrase in an utterance and return the command text
    /// following it, if any.
    pub fn strip_wake_phrase<'a>(&self, lower: &'a str) -> Option<&'a str> {
        lower
            .find(&self.wake_phrase)
            .map(|idx| lower[idx + self.wake_phrase.len()..].trim_matches(|c: char| {
                c.is_whitespace() || ",.!?".contains(c)
            }))
    }
}

/// Time-of-day greeting spoken on wake.
pub fn greeting(at: DateTime<Utc>) -> String {
    let hour = at.with_timezone(&chrono::Local).hour();
    if hour < 12 {
        "Good morning! How may I be of service today?".to_string()
    } else if hour < 18 {
        "Good afternoon! What would you like me to do?".to_string()
    } else {
        "Good evening! How can I assist you tonight?".to_string()
    }
}
