//! gzip + tar container used for project and object archives.
//!
//! # Invariants
//! - Written archives carry zeroed owner ids and mtimes.
//! - Unpacking rejects absolute paths, `..` components, links and devices.
//! - Writes go to a sibling temp file that is renamed over the target.

use super::{IoContext, ProjectError, ProjectResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, EntryType, Header};

/// One regular file to store in an archive.
pub(crate) struct ArchiveFile<'a> {
    /// Path inside the archive, `/` separated and relative.
    pub name: PathBuf,
    pub source: &'a Path,
}

/// Writes `manifest` plus `files` as a gzip tar at `target`.
pub(crate) fn write_archive(
    target: &Path,
    manifest_name: &str,
    manifest: &[u8],
    files: &[ArchiveFile<'_>],
) -> ProjectResult<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    let tmp_path = temp_sibling(target);
    let result = write_archive_to(&tmp_path, manifest_name, manifest, files);
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    fs::rename(&tmp_path, target).at(target)
}

fn write_archive_to(
    path: &Path,
    manifest_name: &str,
    manifest: &[u8],
    files: &[ArchiveFile<'_>],
) -> ProjectResult<()> {
    let file = File::create(path).at(path)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);

    let mut header = regular_header(manifest.len() as u64);
    builder
        .append_data(&mut header, manifest_name, manifest)
        .at(path)?;

    for entry in files {
        let source = File::open(entry.source).at(entry.source)?;
        let len = source.metadata().at(entry.source)?.len();
        let mut header = regular_header(len);
        builder
            .append_data(&mut header, &entry.name, source)
            .at(path)?;
    }

    let encoder = builder.into_inner().at(path)?;
    let mut writer = encoder.finish().at(path)?;
    writer.flush().at(path)?;
    Ok(())
}

fn regular_header(size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_size(size);
    header
}

fn temp_sibling(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Unpacks `archive` below `dest`, creating `dest` when needed.
///
/// # Errors
/// - File-system error when the archive cannot be opened or a file cannot be
///   written.
/// - Parse error when the stream is corrupt or an entry is not a plain,
///   contained file or directory.
pub(crate) fn unpack_archive(archive: &Path, dest: &Path) -> ProjectResult<()> {
    let file = File::open(archive).at(archive)?;
    fs::create_dir_all(dest).at(dest)?;
    let mut reader = Archive::new(GzDecoder::new(file));

    let entries = reader
        .entries()
        .map_err(|err| ProjectError::Archive(err.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| ProjectError::Archive(err.to_string()))?;
        let name = entry
            .path()
            .map_err(|err| ProjectError::Archive(err.to_string()))?
            .into_owned();
        let relative = contained_path(&name)?;
        let target = dest.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&target).at(&target)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).at(parent)?;
                }
                entry.unpack(&target).at(&target)?;
            }
            other => {
                return Err(ProjectError::Archive(format!(
                    "unsupported entry type {other:?} for {}",
                    name.display()
                )));
            }
        }
    }
    Ok(())
}

fn contained_path(name: &Path) -> ProjectResult<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ProjectError::Archive(format!(
                    "entry escapes archive root: {}",
                    name.display()
                )));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(ProjectError::Archive("archive entry path is empty".to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::{contained_path, unpack_archive, write_archive, ArchiveFile};
    use crate::project::ErrorKind;
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn contained_path_rejects_escapes() {
        assert!(contained_path(Path::new("../evil")).is_err());
        assert!(contained_path(Path::new("/etc/passwd")).is_err());
        assert!(contained_path(Path::new(".")).is_err());
        assert_eq!(
            contained_path(Path::new("./assets/a.png")).unwrap(),
            PathBuf::from("assets/a.png")
        );
    }

    #[test]
    fn written_archive_unpacks_with_same_files() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("cat.png");
        fs::write(&asset, b"\x89PNG fake").unwrap();
        let target = dir.path().join("out/demo.ent");

        write_archive(
            &target,
            "project.json",
            b"{}",
            &[ArchiveFile {
                name: PathBuf::from("assets/ab/cd/image/abcd.png"),
                source: &asset,
            }],
        )
        .unwrap();
        assert!(!dir.path().join("out/demo.ent.tmp").exists());

        let dest = dir.path().join("unpacked");
        unpack_archive(&target, &dest).unwrap();
        assert_eq!(fs::read(dest.join("project.json")).unwrap(), b"{}");
        assert_eq!(
            fs::read(dest.join("assets/ab/cd/image/abcd.png")).unwrap(),
            b"\x89PNG fake"
        );
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ent");
        fs::write(&bogus, b"definitely not gzip").unwrap();

        let err = unpack_archive(&bogus, &dir.path().join("dest")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn unwritable_entry_target_is_a_file_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("demo.ent");
        write_archive(&target, "project.json", b"{}", &[]).unwrap();

        let dest = dir.path().join("dest");
        fs::create_dir_all(dest.join("project.json").join("occupied")).unwrap();
        let err = unpack_archive(&target, &dest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }

    #[test]
    fn missing_archive_is_a_file_system_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = unpack_archive(&dir.path().join("nope.ent"), &dir.path().join("dest"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }
}
