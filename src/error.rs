use thiserror::Error;

/// Failure taxonomy handled at the orchestrator dispatch boundary.
/// None of these may terminate the main loop; each maps to a spoken
/// user-facing response.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// No usable utterance was produced. Reprompt, not fatal.
    #[error("no usable utterance")]
    RecognitionFailed,

    /// A reminder request could not be scheduled. Reported to the user;
    /// no reminder is created.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// The backing medium rejected a write. The assistant degrades to
    /// in-memory operation and warns.
    #[error("storage unavailable")]
    StorageUnavailable,

    /// An external backend (chat, voice, launcher, search) failed.
    #[error("backend error: {0}")]
    Api(String),

    /// Cancel/update of an id the system does not know.
    #[error("not found")]
    NotFound,
}

impl AssistantError {
    /// The spoken response for a failure caught at the dispatch boundary.
    pub fn spoken(&self) -> String {
        match self {
            AssistantError::RecognitionFailed => {
                "I didn't catch that. Could you please repeat?".to_string()
            }
            AssistantError::InvalidSchedule(_) => {
                "I couldn't understand the reminder details. Please try again.".to_string()
            }
            AssistantError::StorageUnavailable => {
                "I can't save things right now, but I'll keep going from memory.".to_string()
            }
            AssistantError::Api(_) => {
                "I'm having some trouble processing that request right now.".to_string()
            }
            AssistantError::NotFound => "I couldn't find that one.".to_string(),
        }
    }
}

impl From<crate::store::StoreError> for AssistantError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::NotFound => AssistantError::NotFound,
            _ => AssistantError::StorageUnavailable,
        }
    }
}
