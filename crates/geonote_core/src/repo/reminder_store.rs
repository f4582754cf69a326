//! Reminder store over a single serialized collection blob.
//!
//! # Responsibility
//! - Persist the ordered reminder collection as one JSON array under one key.
//! - Provide create/list/delete and `triggered` latch mutation.
//!
//! # Invariants
//! - Every mutation is a load-modify-store under one store-wide mutex.
//! - `save` never overwrites an existing id.
//! - A malformed element is skipped on read and written back untouched.
//! - A blob that is not a JSON array is never overwritten.

use crate::model::reminder::{NewReminder, Reminder, ReminderValidationError};
use crate::storage::{KeyValueStorage, StorageError};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

/// Storage key holding the serialized reminder collection.
pub const REMINDERS_STORAGE_KEY: &str = "locationReminders";

pub type StoreResult<T> = Result<T, StoreError>;

/// Reminder store failure.
#[derive(Debug)]
pub enum StoreError {
    Validation(ReminderValidationError),
    DuplicateId(String),
    Storage(StorageError),
    /// The stored blob is not a JSON array of records.
    MalformedCollection(String),
    Encode(serde_json::Error),
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "reminder id already exists: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::MalformedCollection(message) => {
                write!(f, "stored reminder collection is malformed: {message}")
            }
            Self::Encode(err) => write!(f, "failed to encode reminder collection: {err}"),
            Self::Poisoned => write!(f, "reminder store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::DuplicateId(_) | Self::MalformedCollection(_) | Self::Poisoned => None,
        }
    }
}

impl From<ReminderValidationError> for StoreError {
    fn from(value: ReminderValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Durable reminder collection.
pub struct ReminderStore<S: KeyValueStorage> {
    storage: S,
    key: String,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStorage> ReminderStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, REMINDERS_STORAGE_KEY)
    }

    /// Creates a store persisting under a custom storage key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Appends one reminder and returns the stored record.
    ///
    /// # Contract
    /// - Generates `id` and `created_at` when absent; `triggered` is `false`.
    /// - Returns `DuplicateId` instead of overwriting an existing record.
    pub fn save(&self, input: NewReminder) -> StoreResult<Reminder> {
        input.validate()?;
        let reminder = input.into_reminder();

        let _guard = self.lock()?;
        let mut entries = self.load_entries()?;
        if entries
            .iter()
            .any(|entry| entry_id(entry) == Some(reminder.id.as_str()))
        {
            return Err(StoreError::DuplicateId(reminder.id));
        }

        entries.push(serde_json::to_value(&reminder).map_err(StoreError::Encode)?);
        self.store_entries(&entries)?;

        info!(
            "event=reminder_save module=store status=ok reminder_id={} radius_m={} total={}",
            reminder.id,
            reminder.radius,
            entries.len()
        );
        Ok(reminder)
    }

    /// Returns all well-formed reminders in insertion order.
    ///
    /// Fails closed: a storage failure yields an empty list plus an `error`
    /// diagnostic. Use [`ReminderStore::try_list`] to tell "unknown" from
    /// "empty".
    pub fn list(&self) -> Vec<Reminder> {
        match self.try_list() {
            Ok(reminders) => reminders,
            Err(err) => {
                error!(
                    "event=reminder_list module=store status=error result=unknown error={}",
                    err
                );
                Vec::new()
            }
        }
    }

    /// Returns all well-formed reminders, surfacing storage failures.
    pub fn try_list(&self) -> StoreResult<Vec<Reminder>> {
        let _guard = self.lock()?;
        let entries = self.load_entries()?;
        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| parse_entry(index, entry))
            .collect())
    }

    /// Number of well-formed reminders.
    pub fn count(&self) -> StoreResult<usize> {
        self.try_list().map(|reminders| reminders.len())
    }

    /// Removes the reminder with `id`; returns whether one was removed.
    ///
    /// Storage failures are logged and reported as `false`.
    pub fn delete(&self, id: &str) -> bool {
        match self.try_delete(id) {
            Ok(removed) => removed,
            Err(err) => {
                error!(
                    "event=reminder_delete module=store status=error reminder_id={} error={}",
                    id, err
                );
                false
            }
        }
    }

    pub fn try_delete(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock()?;
        let mut entries = self.load_entries()?;
        let before = entries.len();
        entries.retain(|entry| entry_id(entry) != Some(id));
        if entries.len() == before {
            debug!("event=reminder_delete module=store status=noop reminder_id={id}");
            return Ok(false);
        }

        self.store_entries(&entries)?;
        info!(
            "event=reminder_delete module=store status=ok reminder_id={} total={}",
            id,
            entries.len()
        );
        Ok(true)
    }

    /// Updates only the `triggered` latch of `id`.
    ///
    /// A missing id is tolerated (the record may have been deleted while an
    /// evaluation was in flight). Storage failures are logged, not surfaced.
    pub fn set_triggered(&self, id: &str, value: bool) {
        if let Err(err) = self.try_set_triggered(id, value) {
            error!(
                "event=reminder_set_triggered module=store status=error reminder_id={} error={}",
                id, err
            );
        }
    }

    /// Returns whether a record was updated.
    pub fn try_set_triggered(&self, id: &str, value: bool) -> StoreResult<bool> {
        let _guard = self.lock()?;
        let mut entries = self.load_entries()?;

        let Some(Value::Object(record)) = entries
            .iter_mut()
            .find(|entry| entry_id(entry) == Some(id))
        else {
            debug!("event=reminder_set_triggered module=store status=noop reminder_id={id}");
            return Ok(false);
        };
        record.insert("triggered".to_string(), Value::Bool(value));

        self.store_entries(&entries)?;
        debug!(
            "event=reminder_set_triggered module=store status=ok reminder_id={} triggered={}",
            id, value
        );
        Ok(true)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| StoreError::Poisoned)
    }

    fn load_entries(&self) -> StoreResult<Vec<Value>> {
        let Some(blob) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        if blob.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(other) => Err(StoreError::MalformedCollection(format!(
                "expected array, found {}",
                json_kind(&other)
            ))),
            Err(err) => Err(StoreError::MalformedCollection(err.to_string())),
        }
    }

    fn store_entries(&self, entries: &[Value]) -> StoreResult<()> {
        let blob = serde_json::to_string(entries).map_err(StoreError::Encode)?;
        self.storage.set(&self.key, &blob)?;
        Ok(())
    }
}

fn parse_entry(index: usize, entry: Value) -> Option<Reminder> {
    let reminder = match serde_json::from_value::<Reminder>(entry) {
        Ok(reminder) => reminder,
        Err(err) => {
            warn!(
                "event=reminder_record_skipped module=store index={} reason=decode error={}",
                index, err
            );
            return None;
        }
    };

    if let Err(err) = reminder.validate() {
        warn!(
            "event=reminder_record_skipped module=store index={} reminder_id={} reason=invalid error={}",
            index, reminder.id, err
        );
        return None;
    }
    Some(reminder)
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
