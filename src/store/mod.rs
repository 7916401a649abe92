pub mod json;
pub mod summary;
pub mod types;

pub use json::{JsonStore, MemStore};

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium rejected the operation. Callers degrade to
    /// in-memory operation rather than crash.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Unknown record id for update/delete.
    #[error("record not found")]
    NotFound,

    /// A collection file failed to parse on load. Fatal: proceeding would
    /// risk silent data loss.
    #[error("corrupt collection file {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },
}

/// The logical partitions of persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Conversation,
    Reminders,
    Activity,
    Preferences,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Conversation,
        Collection::Reminders,
        Collection::Activity,
        Collection::Preferences,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Conversation => "conversation.json",
            Collection::Reminders => "reminders.json",
            Collection::Activity => "activity.json",
            Collection::Preferences => "preferences.json",
        }
    }
}

/// Store-assigned identifier of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable key-partitioned storage. Every successful `append`/`update` is
/// flushed before the call returns; writers are serialized per collection;
/// readers get a consistent snapshot. Records are JSON documents so the
/// on-disk layout stays human-inspectable.
pub trait Store: Send + Sync {
    fn append(&self, collection: Collection, record: Value) -> Result<RecordId, StoreError>;

    /// All records of a collection in insertion order.
    fn read_all(&self, collection: Collection) -> Result<Vec<(RecordId, Value)>, StoreError>;

    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        mutate: &dyn Fn(&mut Value),
    ) -> Result<(), StoreError>;

    fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError>;

    /// FIFO eviction: drop the oldest records until at most `keep` remain.
    /// Returns how many were dropped.
    fn prune_oldest(&self, collection: Collection, keep: usize) -> Result<usize, StoreError>;
}
