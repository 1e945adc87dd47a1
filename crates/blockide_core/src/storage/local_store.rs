//! `LocalStore` contract and its SQLite / in-memory backends.

use super::StorageResult;
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

/// String key/value store with single-consumption reads.
pub trait LocalStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
    /// Reads and deletes `key` in one step.
    fn take(&self, key: &str) -> StorageResult<Option<String>>;
}

/// SQLite-backed store over the `local_storage` table.
pub struct SqliteLocalStore {
    conn: Connection,
}

impl SqliteLocalStore {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn take(&self, key: &str) -> StorageResult<Option<String>> {
        let tx = self.conn.unchecked_transaction()?;
        let value = tx
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        if value.is_some() {
            tx.execute("DELETE FROM local_storage WHERE key = ?1;", [key])?;
        }
        tx.commit()?;
        Ok(value)
    }
}

/// Volatile store for tests and for running without a database file.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn take(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow_mut().remove(key))
    }
}
