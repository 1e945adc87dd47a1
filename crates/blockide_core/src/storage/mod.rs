//! Local persistence mirror: key/value storage for the last saved project,
//! the reload-recovery copy and UI preferences.
//!
//! # Responsibility
//! - Provide a `LocalStore` contract with SQLite and in-memory backends.
//! - Expose project/preference accessors through `StorageManager`.
//!
//! # Invariants
//! - `take` returns a value at most once.
//! - Values are stored as UTF-8 strings; structure is the caller's concern.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod local_store;
pub mod manager;

pub use local_store::{LocalStore, MemoryLocalStore, SqliteLocalStore};
pub use manager::{
    StorageManager, LOCAL_STORAGE_KEY, LOCAL_STORAGE_KEY_RELOAD, LOCAL_STORAGE_LANG,
    LOCAL_STORAGE_PERSIST, LOCAL_STORAGE_WS_MODE,
};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    /// Stored value is not the JSON shape the reader expects.
    Malformed { key: String, message: String },
    Serialize(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Malformed { key, message } => {
                write!(f, "stored value for `{key}` is malformed: {message}")
            }
            Self::Serialize(message) => write!(f, "failed to serialize value: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Malformed { .. } | Self::Serialize(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
