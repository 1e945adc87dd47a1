//! Shell configuration shared by the dispatcher, session and catalog.
//!
//! # Responsibility
//! - Hold every path and identity value the shell needs, in one value that
//!   is passed explicitly to constructors.
//! - Resolve defaults from environment variables once, at startup.
//!
//! # Invariants
//! - All paths are absolute after `from_env()` or `with_home()`.

use std::env;
use std::path::{Path, PathBuf};

const ENV_HOME: &str = "BLOCKIDE_HOME";
const ENV_APP_DIR: &str = "BLOCKIDE_APP_DIR";
const ENV_STATIC_DIR: &str = "BLOCKIDE_STATIC_DIR";
const ENV_DB_PATH: &str = "BLOCKIDE_DB_PATH";
const ENV_BASE_URL: &str = "BLOCKIDE_BASE_URL";
const ENV_UPDATE_URL: &str = "BLOCKIDE_UPDATE_URL";

const DEFAULT_HOME_DIR_NAME: &str = "blockide";
const WORKSPACE_DIR_NAME: &str = "workspace";
const BACKUP_DIR_NAME: &str = "backup";
const STATIC_DIR_NAME: &str = "static";
const LOG_DIR_NAME: &str = "logs";
const DB_FILE_NAME: &str = "local_storage.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Install root; relative `renderer/...` resource urls resolve against
    /// `<app_dir>/src`.
    pub app_dir: PathBuf,
    /// Working copy of the open project (manifest + `assets/`).
    pub workspace_dir: PathBuf,
    /// Backup slot storage for load-with-rollback.
    pub backup_dir: PathBuf,
    /// Bundled resource library (`uploads/` media, static downloads).
    pub static_dir: PathBuf,
    pub log_dir: PathBuf,
    /// SQLite file backing the local persistence mirror.
    pub db_path: PathBuf,
    pub version: String,
    pub base_url: Option<String>,
    pub update_url: Option<String>,
}

impl ShellConfig {
    /// Lays out every directory below `home`.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        Self {
            app_dir: home.to_path_buf(),
            workspace_dir: home.join(WORKSPACE_DIR_NAME),
            backup_dir: home.join(BACKUP_DIR_NAME),
            static_dir: home.join(STATIC_DIR_NAME),
            log_dir: home.join(LOG_DIR_NAME),
            db_path: home.join(DB_FILE_NAME),
            version: crate::core_version().to_string(),
            base_url: None,
            update_url: None,
        }
    }

    /// Resolves configuration from `BLOCKIDE_*` variables with temp-dir
    /// defaults.
    pub fn from_env() -> Self {
        let home = env_path(ENV_HOME)
            .unwrap_or_else(|| env::temp_dir().join(DEFAULT_HOME_DIR_NAME));
        let mut config = Self::with_home(home);
        if let Some(app_dir) = env_path(ENV_APP_DIR) {
            config.static_dir = app_dir.join(STATIC_DIR_NAME);
            config.app_dir = app_dir;
        }
        if let Some(static_dir) = env_path(ENV_STATIC_DIR) {
            config.static_dir = static_dir;
        }
        if let Some(db_path) = env_path(ENV_DB_PATH) {
            config.db_path = db_path;
        }
        config.base_url = env_string(ENV_BASE_URL);
        config.update_url = env_string(ENV_UPDATE_URL);
        config
    }

    /// Root of workspace media.
    pub fn asset_root(&self) -> PathBuf {
        self.workspace_dir.join(crate::project::ASSETS_DIR)
    }

    /// Root of bundled library media.
    pub fn resource_root(&self) -> PathBuf {
        self.static_dir.join("uploads")
    }
}

fn env_string(key: &str) -> Option<String> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::ShellConfig;
    use std::path::PathBuf;

    #[test]
    fn with_home_lays_out_directories() {
        let config = ShellConfig::with_home("/opt/blockide");
        assert_eq!(config.workspace_dir, PathBuf::from("/opt/blockide/workspace"));
        assert_eq!(config.backup_dir, PathBuf::from("/opt/blockide/backup"));
        assert_eq!(
            config.asset_root(),
            PathBuf::from("/opt/blockide/workspace/assets")
        );
        assert_eq!(
            config.resource_root(),
            PathBuf::from("/opt/blockide/static/uploads")
        );
        assert!(!config.version.is_empty());
    }
}
