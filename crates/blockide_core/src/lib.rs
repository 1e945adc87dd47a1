//! Core logic for the BlockIDE desktop shell.
//! The UI process owns presentation; this crate owns project files, the
//! request dispatcher and local persistence.

pub mod catalog;
pub mod config;
pub mod db;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod project;
pub mod storage;
pub mod update;

pub use catalog::{compose_catalog, default_overrides, BlockCategory, BlockOverride, CatalogContext};
pub use config::ShellConfig;
pub use ipc::{Channel, Dispatcher, Handled, Payload, Reply, Request};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::asset::{AssetKind, AssetRef, AssetRefError};
pub use model::project::{EntryObject, Picture, Project, Sound};
pub use project::{
    load_project, save_project, BackupSlot, CanvasImage, ErrorKind, LoadPhase, LoadedProject,
    ProjectError, ProjectResult, ProjectSession, SystemUrlOpener, UrlOpener,
};
pub use storage::{
    LocalStore, MemoryLocalStore, SqliteLocalStore, StorageError, StorageManager, StorageResult,
};
pub use update::{check_update, UpdateInfo, UpdateSource};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
