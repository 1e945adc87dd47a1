//! Project archive codec.
//!
//! # Responsibility
//! - Serialize a `Project` plus its media into a self-contained archive.
//! - Reconstruct a `Project` from an archive unpacked into a workspace.
//!
//! # Invariants
//! - Manifest is `project.json` at the archive root; media lives below
//!   `assets/` using `AssetRef::relative_path()`.
//! - `save_project` fails before writing anything when an asset is missing.
//! - `load_project` only reads the source archive.

use super::archive::{unpack_archive, write_archive, ArchiveFile};
use super::backup::remove_path;
use super::{IoContext, ProjectError, ProjectResult};
use crate::model::asset::AssetRef;
use crate::model::project::Project;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Manifest file name inside project archives.
pub const PROJECT_MANIFEST: &str = "project.json";
/// Media directory inside archives and workspaces.
pub const ASSETS_DIR: &str = "assets";

const LOAD_STAGING_SUFFIX: &str = ".loading";

/// Project reconstructed from an archive, with its unpacked media root.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProject {
    pub project: Project,
    pub asset_root: PathBuf,
}

impl LoadedProject {
    /// Absolute path of one media file inside the unpacked archive.
    pub fn asset_path(&self, asset: &AssetRef) -> ProjectResult<PathBuf> {
        Ok(asset.resolve(&self.asset_root)?)
    }
}

/// Saves `project` to `target`, copying media from `asset_root`.
///
/// # Errors
/// - Validation error for malformed asset references.
/// - File-system error when an asset is missing below `asset_root` or the
///   target cannot be written.
///
/// Writing is not transactional per asset: the archive is assembled in a
/// temp file next to `target` and renamed over it at the end.
pub fn save_project(project: &Project, asset_root: &Path, target: &Path) -> ProjectResult<()> {
    let started_at = Instant::now();
    let result = save_project_inner(project, asset_root, target);
    match &result {
        Ok(asset_count) => info!(
            "event=project_save module=project status=ok assets={} duration_ms={}",
            asset_count,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=project_save module=project status=error error_code={} error={}",
            err.code(),
            err
        ),
    }
    result.map(|_| ())
}

fn save_project_inner(project: &Project, asset_root: &Path, target: &Path) -> ProjectResult<usize> {
    let sources = collect_assets(project.asset_refs(), asset_root)?;
    let manifest = serde_json::to_vec(project)
        .map_err(|err| ProjectError::manifest(PROJECT_MANIFEST, err))?;

    let files = sources
        .iter()
        .map(|(relative, source)| ArchiveFile {
            name: Path::new(ASSETS_DIR).join(relative),
            source: source.as_path(),
        })
        .collect::<Vec<_>>();
    write_archive(target, PROJECT_MANIFEST, &manifest, &files)?;
    Ok(files.len())
}

/// Resolves and de-duplicates asset sources, failing on the first missing one.
pub(crate) fn collect_assets(
    refs: Vec<AssetRef>,
    asset_root: &Path,
) -> ProjectResult<Vec<(PathBuf, PathBuf)>> {
    let unique = refs.into_iter().collect::<BTreeSet<_>>();
    let mut sources = Vec::with_capacity(unique.len());
    for asset in unique {
        let relative = asset.relative_path()?;
        let source = asset_root.join(&relative);
        if !source.is_file() {
            return Err(ProjectError::MissingAsset(source));
        }
        sources.push((relative, source));
    }
    Ok(sources)
}

/// Loads the archive at `archive` into `workspace`, replacing its contents.
///
/// # Errors
/// - File-system error when the archive cannot be read, the workspace cannot
///   be written, or a referenced asset is absent from the archive.
/// - Parse error for corrupt archives and malformed or missing manifests.
///
/// The archive is unpacked and checked in a sibling staging directory, so
/// on error the workspace is left as it was. The archive may itself live
/// inside the workspace.
pub fn load_project(archive: &Path, workspace: &Path) -> ProjectResult<LoadedProject> {
    let started_at = Instant::now();
    let result = load_project_inner(archive, workspace);
    match &result {
        Ok(loaded) => info!(
            "event=project_load module=project status=ok objects={} duration_ms={}",
            loaded.project.objects.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=project_load module=project status=error error_code={} error={}",
            err.code(),
            err
        ),
    }
    result
}

fn load_project_inner(archive: &Path, workspace: &Path) -> ProjectResult<LoadedProject> {
    // Fail fast on an unreadable source before the workspace is touched.
    fs::metadata(archive).at(archive)?;

    // The archive may live inside the workspace, so unpack next to it and
    // swap the result in only once it is complete.
    let staging = staging_dir(workspace);
    remove_path(&staging)?;
    let project = match unpack_and_check(archive, &staging) {
        Ok(project) => project,
        Err(err) => {
            if let Err(cleanup) = remove_path(&staging) {
                warn!(
                    "event=project_load_cleanup module=project status=error error={}",
                    cleanup
                );
            }
            return Err(err);
        }
    };

    remove_path(workspace)?;
    fs::rename(&staging, workspace).at(workspace)?;
    Ok(LoadedProject {
        project,
        asset_root: workspace.join(ASSETS_DIR),
    })
}

fn unpack_and_check(archive: &Path, staging: &Path) -> ProjectResult<Project> {
    unpack_archive(archive, staging)?;
    let project = read_manifest::<Project>(&staging.join(PROJECT_MANIFEST))?;
    collect_assets(project.asset_refs(), &staging.join(ASSETS_DIR))?;
    Ok(project)
}

/// Sibling of `workspace` used while an archive is being unpacked.
fn staging_dir(workspace: &Path) -> PathBuf {
    let mut name = workspace
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(LOAD_STAGING_SUFFIX);
    workspace.with_file_name(name)
}

pub(crate) fn read_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> ProjectResult<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProjectError::manifest(path, "manifest not found in archive"));
        }
        Err(err) => return Err(ProjectError::io(path, err)),
    };
    serde_json::from_slice(&bytes).map_err(|err| ProjectError::manifest(path, err))
}
