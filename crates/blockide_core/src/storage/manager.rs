//! Project and preference accessors over a `LocalStore`.
//!
//! # Invariants
//! - The reload slot is single-consumption: `load_temp_project` deletes it.
//! - Preferences live in the `persist:storage` blob whose `common` field is
//!   itself a JSON-encoded object.

use super::{LocalStore, StorageError, StorageResult};
use crate::model::project::Project;
use log::debug;
use serde_json::{Map, Value};

pub const LOCAL_STORAGE_KEY: &str = "localStorageProject";
pub const LOCAL_STORAGE_KEY_RELOAD: &str = "localStorageProjectReload";
pub const LOCAL_STORAGE_PERSIST: &str = "persist:storage";
pub const LOCAL_STORAGE_LANG: &str = "lang";
pub const LOCAL_STORAGE_WS_MODE: &str = "mode";

const PERSIST_COMMON_FIELD: &str = "common";

pub struct StorageManager<S: LocalStore> {
    store: S,
}

impl<S: LocalStore> StorageManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save_project(&self, project: &Project) -> StorageResult<()> {
        self.save_project_json(&to_json(project)?)
    }

    /// Stores an already serialized project as-is.
    pub fn save_project_json(&self, project_json: &str) -> StorageResult<()> {
        self.store.set(LOCAL_STORAGE_KEY, project_json)
    }

    pub fn load_project(&self) -> StorageResult<Option<String>> {
        self.store.get(LOCAL_STORAGE_KEY)
    }

    pub fn save_temp_project(&self, project: &Project) -> StorageResult<()> {
        self.save_temp_project_json(&to_json(project)?)
    }

    pub fn save_temp_project_json(&self, project_json: &str) -> StorageResult<()> {
        self.store.set(LOCAL_STORAGE_KEY_RELOAD, project_json)
    }

    /// Returns the reload-recovery project and deletes it.
    pub fn load_temp_project(&self) -> StorageResult<Option<String>> {
        let value = self.store.take(LOCAL_STORAGE_KEY_RELOAD)?;
        debug!(
            "event=temp_project_take module=storage status=ok present={}",
            value.is_some()
        );
        Ok(value)
    }

    pub fn get_persist_lang_type(&self) -> StorageResult<Option<String>> {
        self.persist_preference(LOCAL_STORAGE_LANG)
    }

    pub fn get_persist_workspace_mode(&self) -> StorageResult<Option<String>> {
        self.persist_preference(LOCAL_STORAGE_WS_MODE)
    }

    /// Writes one preference into the nested `common` object, keeping every
    /// other field of the blob.
    pub fn set_persist_preference(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut outer = match self.store.get(LOCAL_STORAGE_PERSIST)? {
            Some(raw) => parse_object(&raw)?,
            None => Map::new(),
        };
        let mut common = match outer.get(PERSIST_COMMON_FIELD) {
            Some(Value::String(raw)) => parse_object(raw)?,
            Some(_) => return Err(malformed("`common` is not a JSON string")),
            None => Map::new(),
        };
        common.insert(key.to_string(), Value::String(value.to_string()));

        let common_json = serde_json::to_string(&common)
            .map_err(|err| StorageError::Serialize(err.to_string()))?;
        outer.insert(PERSIST_COMMON_FIELD.to_string(), Value::String(common_json));
        let outer_json = serde_json::to_string(&outer)
            .map_err(|err| StorageError::Serialize(err.to_string()))?;
        self.store.set(LOCAL_STORAGE_PERSIST, &outer_json)
    }

    fn persist_preference(&self, key: &str) -> StorageResult<Option<String>> {
        let Some(raw) = self.store.get(LOCAL_STORAGE_PERSIST)? else {
            return Ok(None);
        };
        let outer = parse_object(&raw)?;
        let common = match outer.get(PERSIST_COMMON_FIELD) {
            Some(Value::String(raw)) => parse_object(raw)?,
            Some(_) => return Err(malformed("`common` is not a JSON string")),
            None => return Ok(None),
        };
        Ok(match common.get(key) {
            Some(Value::String(value)) => Some(value.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }
}

fn to_json(project: &Project) -> StorageResult<String> {
    serde_json::to_string(project).map_err(|err| StorageError::Serialize(err.to_string()))
}

fn parse_object(raw: &str) -> StorageResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(malformed("expected a JSON object")),
        Err(err) => Err(malformed(err)),
    }
}

fn malformed(message: impl std::fmt::Display) -> StorageError {
    StorageError::Malformed {
        key: LOCAL_STORAGE_PERSIST.to_string(),
        message: message.to_string(),
    }
}
