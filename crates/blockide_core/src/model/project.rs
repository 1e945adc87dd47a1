//! Saved block program (project manifest) model.
//!
//! # Responsibility
//! - Mirror the JSON manifest stored inside project archives.
//! - Enumerate media references so codecs can copy the matching files.
//!
//! # Invariants
//! - Field names are camelCase on the wire.
//! - Keys this model does not know are kept in `extra` and written back.

use crate::model::asset::{AssetKind, AssetRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// In-memory project: scenes, objects, variables and their asset references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub objects: Vec<EntryObject>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    /// Manifest keys owned by the block engine (speed, interface, expansion
    /// blocks, ...). Opaque to the shell.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Every media reference in manifest order, duplicates included.
    pub fn asset_refs(&self) -> Vec<AssetRef> {
        self.objects
            .iter()
            .flat_map(EntryObject::asset_refs)
            .collect()
    }
}

/// One scene of the program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Sprite or text-box object with its block script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryObject {
    pub id: String,
    pub name: String,
    #[serde(default = "default_object_type")]
    pub object_type: String,
    #[serde(default)]
    pub scene: String,
    /// Serialized block script, owned by the block engine.
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub sprite: Sprite,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_object_type() -> String {
    "sprite".to_string()
}

impl EntryObject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            object_type: default_object_type(),
            scene: String::new(),
            script: String::new(),
            sprite: Sprite::default(),
            extra: Map::new(),
        }
    }

    /// Workspace media of this object. Entries with a `fileurl` point at
    /// bundled files and are not part of the workspace.
    pub fn asset_refs(&self) -> Vec<AssetRef> {
        let pictures = self
            .sprite
            .pictures
            .iter()
            .filter(|picture| picture.file_url.is_none())
            .map(Picture::asset_ref);
        let sounds = self
            .sprite
            .sounds
            .iter()
            .filter(|sound| sound.file_url.is_none())
            .map(Sound::asset_ref);
        pictures.chain(sounds).collect()
    }
}

/// Media owned by an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprite {
    #[serde(default)]
    pub pictures: Vec<Picture>,
    #[serde(default)]
    pub sounds: Vec<Sound>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Picture size in pixels. Editors may write fractional sizes and extra
/// layout keys; both are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Dimension {
    pub fn new(width: impl Into<f64>, height: impl Into<f64>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            extra: Map::new(),
        }
    }
}

/// Image descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub id: String,
    pub name: String,
    pub filename: String,
    #[serde(default = "default_image_type")]
    pub image_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<Dimension>,
    /// Direct source url. Set for bundled defaults that live outside the
    /// workspace.
    #[serde(default, rename = "fileurl", skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_image_type() -> String {
    AssetKind::Image.default_ext().to_string()
}

impl Picture {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        filename: impl Into<String>,
        image_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            filename: filename.into(),
            image_type: image_type.into(),
            dimension: None,
            file_url: None,
            extra: Map::new(),
        }
    }

    pub fn asset_ref(&self) -> AssetRef {
        AssetRef::new(AssetKind::Image, &self.filename, &self.image_type)
    }
}

/// Sound descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub id: String,
    pub name: String,
    pub filename: String,
    #[serde(default = "default_sound_ext")]
    pub ext: String,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, rename = "fileurl", skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_sound_ext() -> String {
    AssetKind::Sound.default_ext().to_string()
}

impl Sound {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        filename: impl Into<String>,
        ext: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            filename: filename.into(),
            ext: ext.into(),
            duration: None,
            file_url: None,
            extra: Map::new(),
        }
    }

    pub fn asset_ref(&self) -> AssetRef {
        AssetRef::new(AssetKind::Sound, &self.filename, &self.ext)
    }
}

/// Program variable, list or message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    pub name: String,
    #[serde(default = "default_variable_type")]
    pub variable_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_variable_type() -> String {
    "variable".to_string()
}
