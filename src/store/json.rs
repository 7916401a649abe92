use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, RecordId, Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: RecordId,
    body: Value,
}

struct CollectionFile {
    path: PathBuf,
    records: Vec<StoredRecord>,
}

impl CollectionFile {
    fn load(path: PathBuf) -> Result<Self, StoreError> {
        let records = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            // A structurally broken file is fatal; an empty one is fine.
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
                    path: path.clone(),
                    detail: e.to_string(),
                })?
            }
        } else {
            Vec::new()
        };
        Ok(Self { path, records })
    }

    /// Durable flush: write a sibling temp file, sync, then rename over the
    /// target so readers never observe a torn record.
    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut file =
            fs::File::create(&tmp).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        file.write_all(json.as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        file.sync_all()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

/// File-backed store: one pretty-printed JSON file per collection under a
/// data directory. One mutex per collection serializes writers; a flush
/// completes before any mutating call returns.
pub struct JsonStore {
    collections: HashMap<Collection, Mutex<CollectionFile>>,
}

impl JsonStore {
    /// Open (or create) the data directory and load every collection.
    /// `StoreError::Corrupt` here should halt the process with a diagnostic;
    /// `StoreError::Unavailable` should degrade to a [`MemStore`].
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut collections = HashMap::new();
        for collection in Collection::ALL {
            let file = CollectionFile::load(root.join(collection.file_name()))?;
            collections.insert(collection, Mutex::new(file));
        }
        Ok(Self { collections })
    }

    fn locked(&self, collection: Collection) -> MutexGuard<'_, CollectionFile> {
        self.collections[&collection]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for JsonStore {
    fn append(&self, collection: Collection, record: Value) -> Result<RecordId, StoreError> {
        let id = RecordId(Uuid::new_v4().to_string());
        let mut state = self.locked(collection);
        state.records.push(StoredRecord {
            id: id.clone(),
            body: record,
        });
        // The record stays in memory even when the flush fails, so a
        // degraded session keeps a consistent view of its own writes.
        state.flush()?;
        Ok(id)
    }

    fn read_all(&self, collection: Collection) -> Result<Vec<(RecordId, Value)>, StoreError> {
        let state = self.locked(collection);
        Ok(state
            .records
            .iter()
            .map(|r| (r.id.clone(), r.body.clone()))
            .collect())
    }

    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        mutate: &dyn Fn(&mut Value),
    ) -> Result<(), StoreError> {
        let mut state = self.locked(collection);
        let record = state
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or(StoreError::NotFound)?;
        mutate(&mut record.body);
        state.flush()
    }

    fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.locked(collection);
        let before = state.records.len();
        state.records.retain(|r| &r.id != id);
        if state.records.len() == before {
            return Err(StoreError::NotFound);
        }
        state.flush()
    }

    fn prune_oldest(&self, collection: Collection, keep: usize) -> Result<usize, StoreError> {
        let mut state = self.locked(collection);
        if state.records.len() <= keep {
            return Ok(0);
        }
        let dropped = state.records.len() - keep;
        state.records.drain(..dropped);
        state.flush()?;
        Ok(dropped)
    }
}

/// In-memory fallback used when the backing medium is unavailable, and by
/// tests. Same contract minus durability.
#[derive(Default)]
pub struct MemStore {
    collections: Mutex<HashMap<Collection, Vec<StoredRecord>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<Collection, Vec<StoredRecord>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemStore {
    fn append(&self, collection: Collection, record: Value) -> Result<RecordId, StoreError> {
        let id = RecordId(Uuid::new_v4().to_string());
        self.locked().entry(collection).or_default().push(StoredRecord {
            id: id.clone(),
            body: record,
        });
        Ok(id)
    }

    fn read_all(&self, collection: Collection) -> Result<Vec<(RecordId, Value)>, StoreError> {
        Ok(self
            .locked()
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .map(|r| (r.id.clone(), r.body.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        mutate: &dyn Fn(&mut Value),
    ) -> Result<(), StoreError> {
        let mut state = self.locked();
        let record = state
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or(StoreError::NotFound)?;
        mutate(&mut record.body);
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.locked();
        let records = state.entry(collection).or_default();
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn prune_oldest(&self, collection: Collection, keep: usize) -> Result<usize, StoreError> {
        let mut state = self.locked();
        let records = state.entry(collection).or_default();
        if records.len() <= keep {
            return Ok(0);
        }
        let dropped = records.len() - keep;
        records.drain(..dropped);
        Ok(dropped)
    }
}
