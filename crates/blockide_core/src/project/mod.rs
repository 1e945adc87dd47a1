//! Project file handling: backup slot, archive codec, workspace session and
//! media import/export utilities.
//!
//! # Responsibility
//! - Persist projects as self-contained archives and load them back.
//! - Keep the working directory recoverable across failed loads.
//!
//! # Invariants
//! - Load never writes to the archive it reads.
//! - A failed load leaves the workspace as it was.
//! - No archive entry or asset reference resolves outside its root.

use crate::model::asset::AssetRefError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

mod archive;
pub mod backup;
pub mod codec;
pub mod link;
pub mod media;
pub mod session;
pub mod sheet;

pub use backup::BackupSlot;
pub use codec::{load_project, save_project, LoadedProject, ASSETS_DIR, PROJECT_MANIFEST};
pub use link::{SystemUrlOpener, UrlOpener};
pub use media::{CanvasImage, DownloadEntry, EXPORTED_OBJECT_MANIFEST};
pub use session::{LoadPhase, ProjectSession};

pub type ProjectResult<T> = Result<T, ProjectError>;

/// Coarse error taxonomy reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, unreadable or unwritable path.
    FileSystem,
    /// Malformed manifest or archive layout.
    Parse,
    /// Rejected input (bad asset reference, unknown download type, ...).
    Validation,
    /// Update metadata could not be fetched or understood.
    Update,
}

/// Error returned by project codec and workspace operations.
#[derive(Debug)]
pub enum ProjectError {
    Io { path: PathBuf, source: io::Error },
    MissingAsset(PathBuf),
    Manifest { path: PathBuf, message: String },
    Archive(String),
    InvalidAsset(AssetRefError),
    InvalidInput(String),
    /// Download request with neither a source url nor a known media type.
    UnknownResourceType(String),
    Update(crate::update::UpdateError),
}

impl ProjectError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn manifest(path: impl AsRef<Path>, message: impl Display) -> Self {
        Self::Manifest {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::MissingAsset(_) => ErrorKind::FileSystem,
            Self::Manifest { .. } | Self::Archive(_) => ErrorKind::Parse,
            Self::InvalidAsset(_) | Self::InvalidInput(_) | Self::UnknownResourceType(_) => {
                ErrorKind::Validation
            }
            Self::Update(_) => ErrorKind::Update,
        }
    }

    /// Stable short code used in log events and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::FileSystem => "file_system",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Update => "update",
        }
    }
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::MissingAsset(path) => write!(f, "asset file is missing: {}", path.display()),
            Self::Manifest { path, message } => {
                write!(f, "malformed manifest {}: {message}", path.display())
            }
            Self::Archive(message) => write!(f, "invalid archive: {message}"),
            Self::InvalidAsset(err) => write!(f, "{err}"),
            Self::InvalidInput(message) => write!(f, "{message}"),
            Self::UnknownResourceType(_) => write!(f, "invalid Type"),
            Self::Update(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidAsset(err) => Some(err),
            Self::Update(err) => Some(err),
            Self::MissingAsset(_)
            | Self::Manifest { .. }
            | Self::Archive(_)
            | Self::InvalidInput(_)
            | Self::UnknownResourceType(_) => None,
        }
    }
}

impl From<AssetRefError> for ProjectError {
    fn from(value: AssetRefError) -> Self {
        Self::InvalidAsset(value)
    }
}

impl From<crate::update::UpdateError> for ProjectError {
    fn from(value: crate::update::UpdateError) -> Self {
        Self::Update(value)
    }
}

/// Attaches a path to `io::Result` values.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> ProjectResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> ProjectResult<T> {
        self.map_err(|err| ProjectError::io(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ProjectError};
    use crate::model::asset::AssetRefError;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn kinds_follow_taxonomy() {
        let io_err = ProjectError::io("/x", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(io_err.kind(), ErrorKind::FileSystem);
        assert_eq!(
            ProjectError::MissingAsset(PathBuf::from("/a")).kind(),
            ErrorKind::FileSystem
        );
        assert_eq!(
            ProjectError::manifest("/p", "eof").kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            ProjectError::from(AssetRefError::InvalidFilename("..".into())).code(),
            "validation"
        );
    }

    #[test]
    fn display_includes_path() {
        let err = ProjectError::io("/nope/file", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().contains("/nope/file"));
    }
}
