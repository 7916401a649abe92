use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::AssistantError;
use crate::store::types::{Recurrence, Reminder};
use crate::store::{Collection, RecordId, Store, StoreError};

struct Entry {
    reminder: Reminder,
    /// Insertion order, the tie-break for simultaneous fire times.
    seq: u64,
    /// Backing record, when the store accepted the write.
    record: Option<RecordId>,
}

/// Owns every pending reminder. State machine per reminder:
/// `Pending -> Due -> Fired` (terminal for non-recurring) or
/// `Pending -> Due -> Pending` with `fire_at` advanced monotonically.
/// Every add/cancel/fire is mirrored to the store so a restart reloads
/// pending reminders; a store failure degrades to in-memory scheduling
/// rather than dropping the reminder.
pub struct ReminderScheduler {
    store: Arc<dyn Store>,
    entries: Vec<Entry>,
    next_seq: u64,
}

impl ReminderScheduler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Rebuild pending reminders from the store after a restart.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        self.entries.clear();
        for (record, body) in self.store.read_all(Collection::Reminders)? {
            match serde_json::from_value::<Reminder>(body) {
                Ok(reminder) if !reminder.fired => {
                    let seq = self.next_seq;
                    self.next_seq += 1;
                    self.entries.push(Entry {
                        reminder,
                        seq,
                        record: Some(record),
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(%record, "skipping malformed reminder record: {e}"),
            }
        }
        Ok(self.entries.len())
    }

    /// Schedule a reminder. A `fire_at` already behind `now` is rejected,
    /// except for an interval recurrence template, which re-anchors to
    /// `now + interval`.
    pub fn add(
        &mut self,
        message: &str,
        fire_at: DateTime<Utc>,
        recurrence: Recurrence,
        now: DateTime<Utc>,
    ) -> Result<Reminder, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::InvalidSchedule(
                "reminder has no message".to_string(),
            ));
        }

        let fire_at = if fire_at < now {
            match recurrence {
                Recurrence::Interval(secs) => now + chrono::Duration::seconds(secs as i64),
                _ => {
                    return Err(AssistantError::InvalidSchedule(format!(
                        "fire time {fire_at} is in the past"
                    )))
                }
            }
        } else {
            fire_at
        };

        let reminder = Reminder::new(message, fire_at, recurrence, now);
        let record = self.persist_new(&reminder);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry {
            reminder: reminder.clone(),
            seq,
            record,
        });
        Ok(reminder)
    }

    /// Cancel a pending reminder. A fired or unknown id is `NotFound` and
    /// leaves stored state untouched.
    pub fn cancel(&mut self, id: Uuid) -> Result<Reminder, AssistantError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.reminder.id == id)
            .ok_or(AssistantError::NotFound)?;
        let entry = self.entries.remove(pos);
        if let Some(record) = &entry.record {
            if let Err(e) = self.store.delete(Collection::Reminders, record) {
                warn!("failed to delete cancelled reminder from store: {e}");
            }
        }
        Ok(entry.reminder)
    }

    /// Cancel by spoken description: the first pending reminder whose
    /// message contains `query`. An empty query cancels the sole pending
    /// reminder, if there is exactly one.
    pub fn cancel_matching(&mut self, query: &str) -> Result<Reminder, AssistantError> {
        let query = query.trim().to_lowercase();
        let id = if query.is_empty() {
            match self.entries.as_slice() {
                [only] => only.reminder.id,
                _ => return Err(AssistantError::NotFound),
            }
        } else {
            self.entries
                .iter()
                .find(|e| e.reminder.message.to_lowercase().contains(&query))
                .map(|e| e.reminder.id)
                .ok_or(AssistantError::NotFound)?
        };
        self.cancel(id)
    }

    /// Return every reminder due at `now`, ascending by `fire_at` with
    /// insertion order breaking ties. Each scheduled instant is returned
    /// exactly once across the scheduler's lifetime: non-recurring
    /// reminders leave the pending set, recurring ones re-arm strictly
    /// past `now` (a backlog missed during downtime collapses into this
    /// single firing).
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Reminder> {
        let mut due: Vec<(DateTime<Utc>, u64, Uuid)> = self
            .entries
            .iter()
            .filter(|e| e.reminder.is_due(now))
            .map(|e| (e.reminder.fire_at, e.seq, e.reminder.id))
            .collect();
        due.sort();

        let mut fired = Vec::with_capacity(due.len());
        for (_, _, id) in due {
            let Some(pos) = self.entries.iter().position(|e| e.reminder.id == id) else {
                continue;
            };
            fired.push(self.entries[pos].reminder.clone());

            if self.entries[pos].reminder.recurrence.is_recurring() {
                let entry = &mut self.entries[pos];
                while entry.reminder.fire_at <= now {
                    entry.reminder.fire_at = entry.reminder.recurrence.advance(entry.reminder.fire_at);
                }
                self.persist_rearm(pos);
            } else {
                let mut entry = self.entries.remove(pos);
                entry.reminder.fired = true;
                if let Some(record) = &entry.record {
                    if let Err(e) = self.store.delete(Collection::Reminders, record) {
                        warn!("failed to remove fired reminder from store: {e}");
                    }
                }
            }
        }
        fired
    }

    /// Pending reminders soonest-first.
    pub fn upcoming(&self, limit: usize) -> Vec<Reminder> {
        let mut pending: Vec<&Entry> = self.entries.iter().collect();
        pending.sort_by_key(|e| (e.reminder.fire_at, e.seq));
        pending
            .into_iter()
            .take(limit)
            .map(|e| e.reminder.clone())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    fn persist_new(&self, reminder: &Reminder) -> Option<RecordId> {
        let body = match serde_json::to_value(reminder) {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to serialize reminder: {e}");
                return None;
            }
        };
        match self.store.append(Collection::Reminders, body) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("reminder not persisted, scheduling in memory only: {e}");
                None
            }
        }
    }

    fn persist_rearm(&self, pos: usize) {
        let entry = &self.entries[pos];
        let Some(record) = &entry.record else {
            return;
        };
        let body = match serde_json::to_value(&entry.reminder) {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to serialize re-armed reminder: {e}");
                return;
            }
        };
        if let Err(e) = self
            .store
            .update(Collection::Reminders, record, &|value| *value = body.clone())
        {
            warn!("failed to persist re-armed reminder: {e}");
        }
    }
}
