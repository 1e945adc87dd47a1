//! Single-slot backup used to make project loads recoverable.
//!
//! # Responsibility
//! - Copy the current workspace (file or directory tree) aside before a load.
//! - Restore or discard that copy once the load outcome is known.
//!
//! # Invariants
//! - At most one backup exists; a new `backup()` replaces the previous one.
//! - `rollback()` and `clear()` are no-ops when no backup exists.
//! - A backup taken of a missing path rolls back by removing that path.

use super::{IoContext, ProjectResult};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const SLOT_ENTRY_NAME: &str = "slot";

#[derive(Debug, Clone, PartialEq, Eq)]
struct BackupRecord {
    origin: PathBuf,
    /// `false` when the origin did not exist at backup time.
    existed: bool,
}

/// Process-scoped backup slot.
#[derive(Debug)]
pub struct BackupSlot {
    slot_dir: PathBuf,
    record: Option<BackupRecord>,
}

impl BackupSlot {
    /// Creates an empty slot that stores its copy below `slot_dir`.
    pub fn new(slot_dir: impl Into<PathBuf>) -> Self {
        Self {
            slot_dir: slot_dir.into(),
            record: None,
        }
    }

    pub fn has_backup(&self) -> bool {
        self.record.is_some()
    }

    /// Path that the current backup would be restored to.
    pub fn origin(&self) -> Option<&Path> {
        self.record.as_ref().map(|record| record.origin.as_path())
    }

    fn slot_path(&self) -> PathBuf {
        self.slot_dir.join(SLOT_ENTRY_NAME)
    }

    /// Copies `current` into the slot, replacing any previous backup.
    ///
    /// # Errors
    /// - Returns a file-system error when the copy fails. The previous backup
    ///   is already gone at that point and the slot is left empty.
    pub fn backup(&mut self, current: &Path) -> ProjectResult<()> {
        self.clear()?;
        let slot = self.slot_path();
        fs::create_dir_all(&self.slot_dir).at(&self.slot_dir)?;

        let existed = current.exists();
        if existed {
            copy_tree(current, &slot)?;
        }
        debug!(
            "event=backup module=project status=ok origin={} existed={}",
            current.display(),
            existed
        );
        self.record = Some(BackupRecord {
            origin: current.to_path_buf(),
            existed,
        });
        Ok(())
    }

    /// Restores the backup over its origin and empties the slot.
    ///
    /// Returns `Ok(false)` when there was nothing to restore.
    pub fn rollback(&mut self) -> ProjectResult<bool> {
        let Some(record) = self.record.clone() else {
            return Ok(false);
        };

        remove_path(&record.origin)?;
        if record.existed {
            copy_tree(&self.slot_path(), &record.origin)?;
        }
        info!(
            "event=rollback module=project status=ok origin={}",
            record.origin.display()
        );
        self.clear()?;
        Ok(true)
    }

    /// Deletes the slot contents.
    pub fn clear(&mut self) -> ProjectResult<()> {
        remove_path(&self.slot_path())?;
        self.record = None;
        Ok(())
    }
}

/// Copies a file or a directory tree. `dst` must not exist yet.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> ProjectResult<()> {
    let metadata = fs::symlink_metadata(src).at(src)?;
    if metadata.is_dir() {
        fs::create_dir_all(dst).at(dst)?;
        for entry in fs::read_dir(src).at(src)? {
            let entry = entry.at(src)?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::copy(src, dst).at(src)?;
    }
    Ok(())
}

/// Removes a file or directory tree; missing paths are fine.
pub(crate) fn remove_path(path: &Path) -> ProjectResult<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(super::ProjectError::io(path, err)),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path).at(path)
    } else {
        fs::remove_file(path).at(path)
    }
}
