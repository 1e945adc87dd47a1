//! Wire messages. JSON shape: `{"channel": "<name>", ...fields}` for
//! requests and `{"channel": "<name>", "payload": {...}}` for replies.

use crate::model::project::{EntryObject, Picture, Project, Sound};
use crate::project::{CanvasImage, DownloadEntry};
use crate::update::UpdateInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    SaveProject,
    LoadProject,
    ResetDirectory,
    ExportObject,
    ImportObjects,
    ImportObjectsFromResource,
    ImportPictures,
    ImportPicturesFromResource,
    ImportPictureFromCanvas,
    ImportSounds,
    ImportSoundsFromResource,
    StaticDownload,
    TempResourceDownload,
    WriteFile,
    SaveExcel,
    CheckUpdate,
    OpenUrl,
    Quit,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaveProject => "saveProject",
            Self::LoadProject => "loadProject",
            Self::ResetDirectory => "resetDirectory",
            Self::ExportObject => "exportObject",
            Self::ImportObjects => "importObjects",
            Self::ImportObjectsFromResource => "importObjectsFromResource",
            Self::ImportPictures => "importPictures",
            Self::ImportPicturesFromResource => "importPicturesFromResource",
            Self::ImportPictureFromCanvas => "importPictureFromCanvas",
            Self::ImportSounds => "importSounds",
            Self::ImportSoundsFromResource => "importSoundsFromResource",
            Self::StaticDownload => "staticDownload",
            Self::TempResourceDownload => "tempResourceDownload",
            Self::WriteFile => "writeFile",
            Self::SaveExcel => "saveExcel",
            Self::CheckUpdate => "checkUpdate",
            Self::OpenUrl => "openUrl",
            Self::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    SaveProject {
        project: Project,
        target_path: PathBuf,
    },
    LoadProject {
        file_path: PathBuf,
    },
    ResetDirectory,
    ExportObject {
        file_path: PathBuf,
        object: EntryObject,
    },
    ImportObjects {
        #[serde(default)]
        file_paths: Vec<PathBuf>,
    },
    ImportObjectsFromResource {
        #[serde(default)]
        objects: Vec<EntryObject>,
    },
    ImportPictures {
        #[serde(default)]
        file_paths: Vec<PathBuf>,
    },
    ImportPicturesFromResource {
        #[serde(default)]
        pictures: Vec<Picture>,
    },
    ImportPictureFromCanvas {
        #[serde(default)]
        images: Vec<CanvasImage>,
    },
    ImportSounds {
        #[serde(default)]
        file_paths: Vec<PathBuf>,
    },
    ImportSoundsFromResource {
        #[serde(default)]
        sounds: Vec<Sound>,
    },
    StaticDownload {
        segments: Vec<String>,
        target_path: PathBuf,
    },
    TempResourceDownload {
        entry: DownloadEntry,
        #[serde(default, rename = "type")]
        kind: String,
        target_path: PathBuf,
    },
    WriteFile {
        data: String,
        file_path: PathBuf,
    },
    SaveExcel {
        file_path: PathBuf,
        #[serde(default)]
        rows: Vec<Vec<Value>>,
    },
    CheckUpdate,
    /// Opens a web or mail link externally. Never answered.
    OpenUrl {
        url: String,
    },
    Quit,
}

impl Request {
    pub fn channel(&self) -> Channel {
        match self {
            Self::SaveProject { .. } => Channel::SaveProject,
            Self::LoadProject { .. } => Channel::LoadProject,
            Self::ResetDirectory => Channel::ResetDirectory,
            Self::ExportObject { .. } => Channel::ExportObject,
            Self::ImportObjects { .. } => Channel::ImportObjects,
            Self::ImportObjectsFromResource { .. } => Channel::ImportObjectsFromResource,
            Self::ImportPictures { .. } => Channel::ImportPictures,
            Self::ImportPicturesFromResource { .. } => Channel::ImportPicturesFromResource,
            Self::ImportPictureFromCanvas { .. } => Channel::ImportPictureFromCanvas,
            Self::ImportSounds { .. } => Channel::ImportSounds,
            Self::ImportSoundsFromResource { .. } => Channel::ImportSoundsFromResource,
            Self::StaticDownload { .. } => Channel::StaticDownload,
            Self::TempResourceDownload { .. } => Channel::TempResourceDownload,
            Self::WriteFile { .. } => Channel::WriteFile,
            Self::SaveExcel { .. } => Channel::SaveExcel,
            Self::CheckUpdate => Channel::CheckUpdate,
            Self::OpenUrl { .. } => Channel::OpenUrl,
            Self::Quit => Channel::Quit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Payload {
    Error { code: String, message: String },
    Project(Project),
    Objects(Vec<EntryObject>),
    Pictures(Vec<Picture>),
    Sounds(Vec<Sound>),
    Update { version: String, info: UpdateInfo },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Reply {
    pub fn empty(channel: Channel) -> Self {
        Self {
            channel,
            payload: None,
        }
    }

    pub fn with(channel: Channel, payload: Payload) -> Self {
        Self {
            channel,
            payload: Some(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Channel, Payload, Reply, Request};
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn requests_parse_from_channel_tagged_json() {
        let request: Request = serde_json::from_value(json!({
            "channel": "loadProject",
            "filePath": "/tmp/demo.ent"
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::LoadProject {
                file_path: PathBuf::from("/tmp/demo.ent")
            }
        );
        assert_eq!(request.channel(), Channel::LoadProject);

        let quit: Request = serde_json::from_value(json!({"channel": "quit"})).unwrap();
        assert_eq!(quit, Request::Quit);
    }

    #[test]
    fn temp_download_reads_type_field() {
        let request: Request = serde_json::from_value(json!({
            "channel": "tempResourceDownload",
            "entry": {"filename": "abcd"},
            "type": "image",
            "targetPath": "/tmp/x.png"
        }))
        .unwrap();
        match request {
            Request::TempResourceDownload { kind, entry, .. } => {
                assert_eq!(kind, "image");
                assert_eq!(entry.filename.as_deref(), Some("abcd"));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn import_lists_default_to_empty() {
        let request: Request =
            serde_json::from_value(json!({"channel": "importPictures"})).unwrap();
        assert_eq!(request, Request::ImportPictures { file_paths: vec![] });
    }

    #[test]
    fn canvas_excel_and_url_requests_parse() {
        let canvas: Request = serde_json::from_value(json!({
            "channel": "importPictureFromCanvas",
            "images": [{"name": "drawing", "image": "data:image/png;base64,AAAA"}]
        }))
        .unwrap();
        assert_eq!(canvas.channel(), Channel::ImportPictureFromCanvas);

        let excel: Request = serde_json::from_value(json!({
            "channel": "saveExcel",
            "filePath": "/tmp/list.xlsx",
            "rows": [["a", 1], [true, null]]
        }))
        .unwrap();
        match excel {
            Request::SaveExcel { file_path, rows } => {
                assert_eq!(file_path, PathBuf::from("/tmp/list.xlsx"));
                assert_eq!(rows[1], vec![json!(true), json!(null)]);
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let url: Request = serde_json::from_value(json!({
            "channel": "openUrl",
            "url": "https://example.org"
        }))
        .unwrap();
        assert_eq!(
            url,
            Request::OpenUrl {
                url: "https://example.org".to_string()
            }
        );
    }

    #[test]
    fn channel_names_match_serde_names() {
        for channel in [
            Channel::SaveProject,
            Channel::ImportSoundsFromResource,
            Channel::ImportPictureFromCanvas,
            Channel::SaveExcel,
            Channel::OpenUrl,
            Channel::Quit,
        ] {
            assert_eq!(
                serde_json::to_value(channel).unwrap(),
                json!(channel.as_str())
            );
        }
    }

    #[test]
    fn empty_reply_omits_payload() {
        let value = serde_json::to_value(Reply::empty(Channel::SaveProject)).unwrap();
        assert_eq!(value, json!({"channel": "saveProject"}));

        let value = serde_json::to_value(Reply::with(Channel::ImportObjects, Payload::Objects(vec![])))
            .unwrap();
        assert_eq!(
            value,
            json!({"channel": "importObjects", "payload": {"type": "objects", "value": []}})
        );
    }
}
