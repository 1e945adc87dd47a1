//! Media asset references and their archive layout.
//!
//! # Invariants
//! - `AssetRef::validate()` must pass before a reference is turned into a path.
//! - Relative paths never contain separators supplied by the manifest, so they
//!   cannot escape the asset root.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Minimum filename length; the first four characters pick the shard dirs.
const MIN_FILENAME_LEN: usize = 4;
const MAX_EXT_LEN: usize = 8;

/// Kind of media asset referenced by a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    Image,
    Sound,
}

impl AssetKind {
    /// Directory name used inside a shard directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Sound => "sound",
        }
    }

    /// Extension assumed when a descriptor does not carry one.
    pub fn default_ext(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Sound => "mp3",
        }
    }

    /// Parses the `image|sound` type strings used by download requests.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "sound" => Some(Self::Sound),
            _ => None,
        }
    }
}

/// Reference from a manifest entry to one media file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetRef {
    pub kind: AssetKind,
    /// Asset identifier, also the file stem on disk.
    pub filename: String,
    /// Lowercase extension without the dot.
    pub ext: String,
}

impl AssetRef {
    pub fn new(kind: AssetKind, filename: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            kind,
            filename: filename.into(),
            ext: ext.into(),
        }
    }

    /// Creates a reference with a freshly generated filename.
    pub fn generate(kind: AssetKind, ext: impl Into<String>) -> Self {
        Self::new(kind, generate_asset_filename(), ext)
    }

    /// Checks that the reference can be turned into a contained path.
    pub fn validate(&self) -> Result<(), AssetRefError> {
        if !is_valid_filename(&self.filename) {
            return Err(AssetRefError::InvalidFilename(self.filename.clone()));
        }
        if !is_valid_ext(&self.ext) {
            return Err(AssetRefError::InvalidExtension(self.ext.clone()));
        }
        Ok(())
    }

    /// Path relative to an asset root:
    /// `<f[0..2]>/<f[2..4]>/<image|sound>/<filename>.<ext>`.
    pub fn relative_path(&self) -> Result<PathBuf, AssetRefError> {
        self.validate()?;
        let mut path = PathBuf::from(&self.filename[0..2]);
        path.push(&self.filename[2..4]);
        path.push(self.kind.dir_name());
        path.push(format!("{}.{}", self.filename, self.ext));
        Ok(path)
    }

    /// Absolute path of this asset below `root`.
    pub fn resolve(&self, root: &Path) -> Result<PathBuf, AssetRefError> {
        Ok(root.join(self.relative_path()?))
    }
}

/// Generates a 32 character hex asset filename.
pub fn generate_asset_filename() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generates a short entity id in the style of block program manifests.
pub fn generate_entity_id() -> String {
    Uuid::new_v4().simple().to_string()[..4].to_string()
}

/// Normalizes a file extension taken from a user supplied path.
///
/// Falls back to the kind default when the extension is missing or unusable.
pub fn normalize_ext(path: &Path, kind: AssetKind) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| is_valid_ext(ext))
        .unwrap_or_else(|| kind.default_ext().to_string())
}

fn is_valid_filename(value: &str) -> bool {
    if value.len() < MIN_FILENAME_LEN || !value.is_ascii() {
        return false;
    }
    let (shard, rest) = value.split_at(MIN_FILENAME_LEN);
    shard.chars().all(|c| c.is_ascii_alphanumeric())
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_valid_ext(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_EXT_LEN
        && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Asset reference validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRefError {
    InvalidFilename(String),
    InvalidExtension(String),
}

impl Display for AssetRefError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFilename(value) => write!(f, "asset filename is invalid: `{value}`"),
            Self::InvalidExtension(value) => write!(f, "asset extension is invalid: `{value}`"),
        }
    }
}

impl Error for AssetRefError {}

#[cfg(test)]
mod tests {
    use super::{generate_asset_filename, normalize_ext, AssetKind, AssetRef, AssetRefError};
    use std::path::{Path, PathBuf};

    #[test]
    fn relative_path_uses_shard_layout() {
        let asset = AssetRef::new(AssetKind::Image, "abcd1234", "png");
        assert_eq!(
            asset.relative_path(),
            Ok(PathBuf::from("ab/cd/image/abcd1234.png"))
        );
    }

    #[test]
    fn relative_path_of_short_or_non_ascii_name_is_an_error() {
        for bad in ["ab", "\u{e9}\u{e9}cd"] {
            let asset = AssetRef::new(AssetKind::Image, bad, "png");
            assert!(matches!(
                asset.relative_path(),
                Err(AssetRefError::InvalidFilename(_))
            ));
        }
    }

    #[test]
    fn rejects_filenames_that_could_escape_root() {
        for bad in ["..", "../etc", "ab/cd", "abc", "ab..cd", "\u{e9}abc"] {
            let asset = AssetRef::new(AssetKind::Sound, bad, "mp3");
            assert!(
                matches!(asset.validate(), Err(AssetRefError::InvalidFilename(_))),
                "`{bad}` should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_extensions() {
        let asset = AssetRef::new(AssetKind::Image, "abcd", "p/g");
        assert_eq!(
            asset.validate(),
            Err(AssetRefError::InvalidExtension("p/g".to_string()))
        );
    }

    #[test]
    fn generated_filenames_are_valid() {
        let asset = AssetRef::new(AssetKind::Image, generate_asset_filename(), "png");
        assert!(asset.validate().is_ok());
    }

    #[test]
    fn normalize_ext_lowercases_and_falls_back() {
        assert_eq!(normalize_ext(Path::new("/a/cat.PNG"), AssetKind::Image), "png");
        assert_eq!(normalize_ext(Path::new("/a/beep"), AssetKind::Sound), "mp3");
        assert_eq!(normalize_ext(Path::new("/a/odd.w@v"), AssetKind::Sound), "mp3");
    }
}
