//! SQLite backing for the reminder key-value table.
//!
//! Every connection handed out by [`open_db`] or [`open_db_in_memory`] has
//! the `kv_store` table at the latest schema version. Schema versions live in
//! `PRAGMA user_version`; a file written by a newer build is refused rather
//! than downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the reminder database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file carries a `kv_store` schema this build cannot read.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "reminder database error: {err}"),
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "kv_store schema v{found} was written by a newer build; this build reads up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
