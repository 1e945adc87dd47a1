//! Media and object import/export against the session workspace.
//!
//! # Responsibility
//! - Copy external or bundled media into the workspace under fresh ids.
//! - Export single objects as archives and import them back.
//! - Serve static and temp resource downloads.
//!
//! # Invariants
//! - Empty input lists return empty results without touching the disk.
//! - Imported media never reuses the source filename; copies cannot collide
//!   with workspace files.

use super::archive::{unpack_archive, write_archive, ArchiveFile};
use super::backup::remove_path;
use super::codec::{collect_assets, read_manifest, ASSETS_DIR};
use super::session::ProjectSession;
use super::{IoContext, ProjectError, ProjectResult};
use crate::model::asset::{generate_entity_id, normalize_ext, AssetKind, AssetRef};
use crate::model::project::{Dimension, EntryObject, Picture, Sound};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Manifest file name inside exported object archives.
pub const EXPORTED_OBJECT_MANIFEST: &str = "object.json";

const IMPORT_STAGING_DIR: &str = ".import";
const RENDERER_URL_PREFIX: &str = "renderer";
const CANVAS_DEFAULT_NAME: &str = "canvas";

/// Resource descriptor accepted by `temp_resource_download`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEntry {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "fileurl")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
}

/// Image produced by the paint editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasImage {
    #[serde(default)]
    pub name: Option<String>,
    /// Base64 image data, bare or as a `data:image/...;base64,` url.
    pub image: String,
}

impl ProjectSession {
    /// Writes `object` and its workspace media as an object archive.
    pub fn export_object(&self, target: &Path, object: &EntryObject) -> ProjectResult<()> {
        let sources = collect_assets(object.asset_refs(), &self.asset_root())?;
        let manifest = serde_json::to_vec(object)
            .map_err(|err| ProjectError::manifest(EXPORTED_OBJECT_MANIFEST, err))?;
        let files = sources
            .iter()
            .map(|(relative, source)| ArchiveFile {
                name: Path::new(ASSETS_DIR).join(relative),
                source: source.as_path(),
            })
            .collect::<Vec<_>>();
        write_archive(target, EXPORTED_OBJECT_MANIFEST, &manifest, &files)?;
        info!(
            "event=object_export module=project status=ok assets={}",
            files.len()
        );
        Ok(())
    }

    /// Imports object archives, re-identifying each object and its media.
    pub fn import_objects(&self, paths: &[PathBuf]) -> ProjectResult<Vec<EntryObject>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let staging_root = self.workspace_dir().join(IMPORT_STAGING_DIR);
        let result = paths
            .iter()
            .map(|path| self.import_object_archive(path, &staging_root))
            .collect::<ProjectResult<Vec<_>>>();
        remove_path(&staging_root)?;

        let objects = result?;
        info!(
            "event=object_import module=project status=ok count={}",
            objects.len()
        );
        Ok(objects)
    }

    fn import_object_archive(&self, archive: &Path, staging_root: &Path) -> ProjectResult<EntryObject> {
        let staging = staging_root.join(Uuid::new_v4().simple().to_string());
        unpack_archive(archive, &staging)?;
        let object = read_manifest::<EntryObject>(&staging.join(EXPORTED_OBJECT_MANIFEST))?;
        self.adopt_object(object, &staging.join(ASSETS_DIR))
    }

    /// Imports library objects whose media lives in the resource root.
    pub fn import_objects_from_resource(
        &self,
        objects: Vec<EntryObject>,
    ) -> ProjectResult<Vec<EntryObject>> {
        let resource_root = self.config().resource_root();
        objects
            .into_iter()
            .map(|object| self.adopt_object(object, &resource_root))
            .collect()
    }

    /// Stores paint editor images as new workspace pictures.
    ///
    /// Every image is re-encoded as PNG, whatever format it was posted in.
    pub fn import_pictures_from_canvas(
        &self,
        images: &[CanvasImage],
    ) -> ProjectResult<Vec<Picture>> {
        let pictures = images
            .iter()
            .map(|canvas| {
                let decoded = decode_canvas_image(&canvas.image)?;
                let mut png = Vec::new();
                decoded
                    .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                    .map_err(|err| {
                        ProjectError::InvalidInput(format!("canvas image cannot be encoded: {err}"))
                    })?;

                let stored = AssetRef::generate(AssetKind::Image, AssetKind::Image.default_ext());
                let target = stored.resolve(&self.asset_root())?;
                write_file(&png, &target)?;

                let name = canvas
                    .name
                    .as_deref()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(CANVAS_DEFAULT_NAME);
                let mut picture =
                    Picture::new(generate_entity_id(), name, stored.filename, stored.ext);
                picture.dimension = Some(Dimension::new(decoded.width(), decoded.height()));
                Ok(picture)
            })
            .collect::<ProjectResult<Vec<_>>>()?;
        debug!(
            "event=canvas_import module=project status=ok count={}",
            pictures.len()
        );
        Ok(pictures)
    }

    /// Copies external image files into the workspace.
    pub fn import_pictures(&self, paths: &[PathBuf]) -> ProjectResult<Vec<Picture>> {
        paths
            .iter()
            .map(|path| {
                let ext = normalize_ext(path, AssetKind::Image);
                let stored = self.store_file(path, AssetKind::Image, &ext)?;
                let mut picture =
                    Picture::new(generate_entity_id(), display_name(path), stored.filename, ext);
                picture.dimension = image_dimension(path);
                Ok(picture)
            })
            .collect()
    }

    /// Copies library pictures into the workspace under fresh filenames.
    pub fn import_pictures_from_resource(
        &self,
        pictures: Vec<Picture>,
    ) -> ProjectResult<Vec<Picture>> {
        let resource_root = self.config().resource_root();
        pictures
            .into_iter()
            .map(|picture| self.adopt_picture(picture, &resource_root))
            .collect()
    }

    /// Copies external sound files into the workspace.
    pub fn import_sounds(&self, paths: &[PathBuf]) -> ProjectResult<Vec<Sound>> {
        paths
            .iter()
            .map(|path| {
                let ext = normalize_ext(path, AssetKind::Sound);
                let stored = self.store_file(path, AssetKind::Sound, &ext)?;
                Ok(Sound::new(
                    generate_entity_id(),
                    display_name(path),
                    stored.filename,
                    ext,
                ))
            })
            .collect()
    }

    pub fn import_sounds_from_resource(&self, sounds: Vec<Sound>) -> ProjectResult<Vec<Sound>> {
        let resource_root = self.config().resource_root();
        sounds
            .into_iter()
            .map(|sound| self.adopt_sound(sound, &resource_root))
            .collect()
    }

    /// Copies `<static_dir>/<segments...>` to `target`.
    ///
    /// Segments are single path components; separators and `..` are rejected.
    pub fn static_download(&self, segments: &[String], target: &Path) -> ProjectResult<()> {
        if segments.is_empty() {
            return Err(ProjectError::InvalidInput(
                "static download needs at least one path segment".to_string(),
            ));
        }
        let mut source = self.config().static_dir.clone();
        for segment in segments {
            if !is_plain_segment(segment) {
                return Err(ProjectError::InvalidInput(format!(
                    "invalid static path segment `{segment}`"
                )));
            }
            source.push(segment);
        }
        download_file(&source, target)
    }

    /// Copies a picture or sound to `target`.
    ///
    /// The entry's `fileurl` wins when present; otherwise `kind`
    /// (`image|sound`) selects the workspace media path. Anything else fails
    /// with `UnknownResourceType` and writes nothing.
    pub fn temp_resource_download(
        &self,
        entry: &DownloadEntry,
        kind: &str,
        target: &Path,
    ) -> ProjectResult<()> {
        let source = self.resolve_download_source(entry, kind)?;
        download_file(&source, target)
    }

    fn resolve_download_source(&self, entry: &DownloadEntry, kind: &str) -> ProjectResult<PathBuf> {
        if let Some(url) = entry.file_url.as_deref().filter(|url| !url.is_empty()) {
            if url.starts_with(RENDERER_URL_PREFIX) {
                return Ok(self.config().app_dir.join("src").join(url));
            }
            return Ok(PathBuf::from(url));
        }

        let Some(kind) = AssetKind::parse(kind) else {
            return Err(ProjectError::UnknownResourceType(kind.to_string()));
        };
        let ext = match kind {
            AssetKind::Image => entry.image_type.as_deref().or(entry.ext.as_deref()),
            AssetKind::Sound => entry.ext.as_deref(),
        }
        .unwrap_or(kind.default_ext());
        let filename = entry.filename.as_deref().unwrap_or_default();
        Ok(AssetRef::new(kind, filename, ext).resolve(&self.asset_root())?)
    }

    fn adopt_object(&self, mut object: EntryObject, source_root: &Path) -> ProjectResult<EntryObject> {
        object.id = generate_entity_id();
        object.sprite.pictures = std::mem::take(&mut object.sprite.pictures)
            .into_iter()
            .map(|picture| self.adopt_picture(picture, source_root))
            .collect::<ProjectResult<_>>()?;
        object.sprite.sounds = std::mem::take(&mut object.sprite.sounds)
            .into_iter()
            .map(|sound| self.adopt_sound(sound, source_root))
            .collect::<ProjectResult<_>>()?;
        Ok(object)
    }

    fn adopt_picture(&self, mut picture: Picture, source_root: &Path) -> ProjectResult<Picture> {
        picture.id = generate_entity_id();
        if picture.file_url.is_none() {
            picture.filename = self.copy_asset(&picture.asset_ref(), source_root)?.filename;
        }
        Ok(picture)
    }

    fn adopt_sound(&self, mut sound: Sound, source_root: &Path) -> ProjectResult<Sound> {
        sound.id = generate_entity_id();
        if sound.file_url.is_none() {
            sound.filename = self.copy_asset(&sound.asset_ref(), source_root)?.filename;
        }
        Ok(sound)
    }

    /// Copies one asset from `source_root` into the workspace under a new
    /// filename.
    fn copy_asset(&self, asset: &AssetRef, source_root: &Path) -> ProjectResult<AssetRef> {
        let source = asset.resolve(source_root)?;
        if !source.is_file() {
            return Err(ProjectError::MissingAsset(source));
        }
        self.store_file(&source, asset.kind, &asset.ext)
    }

    fn store_file(&self, source: &Path, kind: AssetKind, ext: &str) -> ProjectResult<AssetRef> {
        let stored = AssetRef::generate(kind, ext);
        let target = stored.resolve(&self.asset_root())?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::copy(source, &target).at(source)?;
        debug!(
            "event=asset_store module=project status=ok kind={} filename={}",
            kind.dir_name(),
            stored.filename
        );
        Ok(stored)
    }
}

/// Writes `data` to `target`, creating parent directories.
pub fn write_file(data: &[u8], target: &Path) -> ProjectResult<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(target, data).at(target)
}

fn download_file(source: &Path, target: &Path) -> ProjectResult<()> {
    if !source.is_file() {
        return Err(ProjectError::MissingAsset(source.to_path_buf()));
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::copy(source, target).at(target)?;
    Ok(())
}

fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !segment.contains(['/', '\\'])
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn decode_canvas_image(data: &str) -> ProjectResult<image::DynamicImage> {
    let encoded = match data.strip_prefix("data:") {
        Some(url) => url
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| {
                ProjectError::InvalidInput("canvas data url is not base64 encoded".to_string())
            })?,
        None => data,
    };
    let bytes = STANDARD.decode(encoded.trim()).map_err(|err| {
        ProjectError::InvalidInput(format!("canvas image is not valid base64: {err}"))
    })?;
    image::load_from_memory(&bytes)
        .map_err(|err| ProjectError::InvalidInput(format!("canvas image cannot be decoded: {err}")))
}

fn image_dimension(path: &Path) -> Option<Dimension> {
    image::image_dimensions(path)
        .ok()
        .map(|(width, height)| Dimension::new(width, height))
}
