//! FFI use-case API for UI-facing calls.
//!
//! # Responsibility
//! - Expose the request dispatcher, local storage mirror and block catalog
//!   to the UI process via FRB.
//! - Translate core results into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - One dispatcher per process; requests are handled one at a time.

use blockide_core::{
    compose_catalog, core_version as core_version_inner, default_log_level,
    init_logging as init_logging_inner, ping as ping_inner, BlockCategory, CatalogContext,
    Dispatcher, Request, ShellConfig, SqliteLocalStore, StorageManager, StorageResult,
};
use log::warn;
use std::sync::{Mutex, MutexGuard, OnceLock};

static SHELL_CONFIG: OnceLock<ShellConfig> = OnceLock::new();
static DISPATCHER: OnceLock<Mutex<Dispatcher>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Initializes logging under the configured log directory at the build's
/// default level.
#[flutter_rust_bridge::frb(sync)]
pub fn init_default_logging() -> String {
    let log_dir = shell_config().log_dir.display().to_string();
    init_logging(default_log_level().to_string(), log_dir)
}

/// Reply envelope for one dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    /// Whether the request completed without error.
    pub ok: bool,
    /// Serialized reply to deliver on the request's channel, if any.
    pub reply_json: Option<String>,
    /// Diagnostic message; empty on success.
    pub message: String,
}

/// Handles one channel-tagged JSON request.
///
/// # FFI contract
/// - Sync call; may perform file-system and network work.
/// - Concurrent calls are serialized; a load never overlaps another request.
/// - Never panics. Unparseable requests return `ok=false` and no reply.
#[flutter_rust_bridge::frb(sync)]
pub fn dispatch(request_json: String) -> DispatchResponse {
    let request = match serde_json::from_str::<Request>(&request_json) {
        Ok(request) => request,
        Err(err) => {
            warn!("event=ipc_decode module=ffi status=error error={err}");
            return DispatchResponse {
                ok: false,
                reply_json: None,
                message: format!("invalid request: {err}"),
            };
        }
    };

    let handled = lock_dispatcher().handle(request);
    let reply_json = match handled.reply.as_ref().map(serde_json::to_string).transpose() {
        Ok(reply_json) => reply_json,
        Err(err) => {
            return DispatchResponse {
                ok: false,
                reply_json: None,
                message: format!("reply encoding failed: {err}"),
            };
        }
    };
    DispatchResponse {
        ok: handled.error.is_none(),
        reply_json,
        message: handled
            .error
            .map(|err| format!("{}: {err}", err.code()))
            .unwrap_or_default(),
    }
}

/// Whether a `quit` request has been dispatched.
#[flutter_rust_bridge::frb(sync)]
pub fn should_quit() -> bool {
    lock_dispatcher().should_quit()
}

/// Response envelope for local storage calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageResponse {
    pub ok: bool,
    /// Stored value for reads; `None` when absent or on writes.
    pub value: Option<String>,
    pub message: String,
}

impl StorageResponse {
    fn from_result(operation: &str, result: StorageResult<Option<String>>) -> Self {
        match result {
            Ok(value) => Self {
                ok: true,
                value,
                message: String::new(),
            },
            Err(err) => Self {
                ok: false,
                value: None,
                message: format!("{operation} failed: {err}"),
            },
        }
    }
}

/// Stores the serialized project in the persistent slot.
#[flutter_rust_bridge::frb(sync)]
pub fn storage_save_project(project_json: String) -> StorageResponse {
    StorageResponse::from_result(
        "storage_save_project",
        with_storage(|storage| storage.save_project_json(&project_json).map(|()| None)),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn storage_load_project() -> StorageResponse {
    StorageResponse::from_result(
        "storage_load_project",
        with_storage(|storage| storage.load_project()),
    )
}

/// Stores the reload-recovery copy of the project.
#[flutter_rust_bridge::frb(sync)]
pub fn storage_save_temp_project(project_json: String) -> StorageResponse {
    StorageResponse::from_result(
        "storage_save_temp_project",
        with_storage(|storage| storage.save_temp_project_json(&project_json).map(|()| None)),
    )
}

/// Returns the reload-recovery copy once; later calls return no value.
#[flutter_rust_bridge::frb(sync)]
pub fn storage_load_temp_project() -> StorageResponse {
    StorageResponse::from_result(
        "storage_load_temp_project",
        with_storage(|storage| storage.load_temp_project()),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn storage_get_lang_type() -> StorageResponse {
    StorageResponse::from_result(
        "storage_get_lang_type",
        with_storage(|storage| storage.get_persist_lang_type()),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn storage_get_workspace_mode() -> StorageResponse {
    StorageResponse::from_result(
        "storage_get_workspace_mode",
        with_storage(|storage| storage.get_persist_workspace_mode()),
    )
}

/// Writes one UI preference (`lang`, `mode`, ...) into the persisted blob.
#[flutter_rust_bridge::frb(sync)]
pub fn storage_set_preference(key: String, value: String) -> StorageResponse {
    StorageResponse::from_result(
        "storage_set_preference",
        with_storage(|storage| storage.set_persist_preference(&key, &value).map(|()| None)),
    )
}

/// Block palette after desktop overrides, plus the configured static base url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    pub ok: bool,
    pub catalog_json: Option<String>,
    pub base_url: Option<String>,
    pub message: String,
}

/// Applies the desktop override table to a JSON base catalog.
///
/// `base_json` is an array of `{"category": ..., "blocks": [...]}`.
#[flutter_rust_bridge::frb(sync)]
pub fn compose_block_catalog(base_json: String) -> CatalogResponse {
    let context = CatalogContext::from_config(shell_config());
    let composed = serde_json::from_str::<Vec<BlockCategory>>(&base_json)
        .map(|base| compose_catalog(&base, &context.overrides))
        .and_then(|catalog| serde_json::to_string(&catalog));
    match composed {
        Ok(catalog_json) => CatalogResponse {
            ok: true,
            catalog_json: Some(catalog_json),
            base_url: context.base_url,
            message: String::new(),
        },
        Err(err) => CatalogResponse {
            ok: false,
            catalog_json: None,
            base_url: context.base_url,
            message: format!("compose_block_catalog failed: {err}"),
        },
    }
}

fn shell_config() -> &'static ShellConfig {
    SHELL_CONFIG.get_or_init(ShellConfig::from_env)
}

fn lock_dispatcher() -> MutexGuard<'static, Dispatcher> {
    DISPATCHER
        .get_or_init(|| Mutex::new(Dispatcher::new(shell_config().clone())))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_storage<T>(
    f: impl FnOnce(&StorageManager<SqliteLocalStore>) -> StorageResult<T>,
) -> StorageResult<T> {
    let store = SqliteLocalStore::open(&shell_config().db_path)?;
    f(&StorageManager::new(store))
}
