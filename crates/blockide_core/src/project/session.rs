//! Workspace session: the open project's working copy and its backup slot.
//!
//! # Responsibility
//! - Run the load-with-rollback protocol against the workspace directory.
//! - Track which archive is currently considered open.
//!
//! # Invariants
//! - Loads are serialized by `&mut self`; one backup slot serves them all.
//! - Backup failures never block a load attempt.
//! - After every load the session is back in `LoadPhase::Idle`.

use super::backup::{remove_path, BackupSlot};
use super::codec::{load_project, save_project, LoadedProject};
use super::link::{SystemUrlOpener, UrlOpener};
use super::{IoContext, ProjectResult};
use crate::config::ShellConfig;
use crate::model::project::Project;
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Step of the load-with-rollback protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    BackingUp,
    Loading,
    Committed,
    RollingBack,
}

impl LoadPhase {
    fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BackingUp => "backing_up",
            Self::Loading => "loading",
            Self::Committed => "committed",
            Self::RollingBack => "rolling_back",
        }
    }
}

pub struct ProjectSession {
    config: ShellConfig,
    backup: BackupSlot,
    current_project: Option<PathBuf>,
    phase: LoadPhase,
    last_trace: Vec<LoadPhase>,
    url_opener: Box<dyn UrlOpener + Send>,
}

impl ProjectSession {
    pub fn new(config: ShellConfig) -> Self {
        let backup = BackupSlot::new(config.backup_dir.clone());
        Self {
            config,
            backup,
            current_project: None,
            phase: LoadPhase::Idle,
            last_trace: Vec::new(),
            url_opener: Box::new(SystemUrlOpener),
        }
    }

    /// Replaces the handler used by `open_url`.
    pub fn set_url_opener(&mut self, opener: impl UrlOpener + Send + 'static) {
        self.url_opener = Box::new(opener);
    }

    pub(crate) fn url_opener(&self) -> &dyn UrlOpener {
        self.url_opener.as_ref()
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.config.workspace_dir
    }

    pub fn asset_root(&self) -> PathBuf {
        self.config.asset_root()
    }

    /// Archive most recently saved or successfully loaded.
    pub fn current_project(&self) -> Option<&Path> {
        self.current_project.as_deref()
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Phases visited by the most recent `load_with_rollback` call.
    pub fn last_trace(&self) -> &[LoadPhase] {
        &self.last_trace
    }

    pub fn backup_slot(&self) -> &BackupSlot {
        &self.backup
    }

    /// Saves `project` using the workspace media and remembers `target`.
    pub fn save(&mut self, project: &Project, target: &Path) -> ProjectResult<()> {
        save_project(project, &self.asset_root(), target)?;
        self.current_project = Some(target.to_path_buf());
        Ok(())
    }

    /// Loads `archive` into the workspace, restoring the previous workspace
    /// when the load fails.
    ///
    /// The caller's in-memory project stays authoritative on failure; only
    /// file-level state is rolled back.
    pub fn load_with_rollback(&mut self, archive: &Path) -> ProjectResult<LoadedProject> {
        self.last_trace.clear();

        self.enter(LoadPhase::BackingUp);
        let workspace = self.config.workspace_dir.clone();
        if let Err(err) = self.backup.backup(&workspace) {
            warn!(
                "event=project_backup module=project status=error error_code={} error={}",
                err.code(),
                err
            );
        }

        self.enter(LoadPhase::Loading);
        let result = load_project(archive, &workspace);

        match &result {
            Ok(_) => {
                self.enter(LoadPhase::Committed);
                if let Err(err) = self.backup.clear() {
                    warn!(
                        "event=project_backup_clear module=project status=error error={}",
                        err
                    );
                }
                self.current_project = Some(archive.to_path_buf());
            }
            Err(_) => {
                self.enter(LoadPhase::RollingBack);
                match self.backup.rollback() {
                    Ok(restored) => info!(
                        "event=project_rollback module=project status=ok restored={}",
                        restored
                    ),
                    Err(err) => error!(
                        "event=project_rollback module=project status=error error_code={} error={}",
                        err.code(),
                        err
                    ),
                }
            }
        }

        self.enter(LoadPhase::Idle);
        result
    }

    /// Empties the workspace and forgets the current project.
    pub fn reset_directory(&mut self) -> ProjectResult<()> {
        let workspace = self.config.workspace_dir.clone();
        remove_path(&workspace)?;
        fs::create_dir_all(&workspace).at(&workspace)?;
        self.current_project = None;
        info!(
            "event=workspace_reset module=project status=ok dir={}",
            workspace.display()
        );
        Ok(())
    }

    fn enter(&mut self, phase: LoadPhase) {
        debug!(
            "event=load_phase module=project from={} to={}",
            self.phase.label(),
            phase.label()
        );
        self.phase = phase;
        self.last_trace.push(phase);
    }
}
