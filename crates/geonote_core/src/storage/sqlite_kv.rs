//! SQLite-backed key-value storage.
//!
//! # Invariants
//! - The wrapped connection has migrations applied (`kv_store` exists).
//! - Each `set` is a single upsert statement, so replacement is atomic.

use super::{KeyValueStorage, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Key-value storage over the `kv_store` table.
pub struct SqliteKeyValueStorage {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStorage {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl KeyValueStorage for SqliteKeyValueStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKeyValueStorage;
    use crate::storage::KeyValueStorage;

    #[test]
    fn upsert_replaces_existing_value() {
        let storage = SqliteKeyValueStorage::open_in_memory().unwrap();
        assert_eq!(storage.get("locationReminders").unwrap(), None);

        storage.set("locationReminders", "[]").unwrap();
        storage.set("locationReminders", "[{}]").unwrap();
        assert_eq!(
            storage.get("locationReminders").unwrap().as_deref(),
            Some("[{}]")
        );
    }
}
