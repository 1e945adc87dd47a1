//! Request router over one `ProjectSession`.
//!
//! # Invariants
//! - `saveProject`, `writeFile` and `saveExcel` answer with an error payload
//!   on failure.
//! - `loadProject` answers without payload on failure; the workspace has
//!   been rolled back by then.
//! - `tempResourceDownload` answers `invalid Type` when it cannot pick a
//!   source.
//! - `openUrl` is never answered.
//! - Any other failure is logged and gets no reply.

use super::message::{Channel, Payload, Reply, Request};
use crate::config::ShellConfig;
use crate::project::media::write_file;
use crate::project::{ProjectError, ProjectResult, ProjectSession};
use crate::update::{check_update, HttpUpdateSource, UpdateError, UpdateSource};
use log::{error, info, warn};

/// Outcome of one request.
#[derive(Debug)]
pub struct Handled {
    /// Message to send back to the UI process, if any.
    pub reply: Option<Reply>,
    /// Failure behind the reply, including failures the wire reply hides.
    pub error: Option<ProjectError>,
}

impl Handled {
    fn ok(reply: Reply) -> Self {
        Self {
            reply: Some(reply),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Dispatcher {
    session: ProjectSession,
    updates: Option<Box<dyn UpdateSource + Send>>,
    quit_requested: bool,
}

impl Dispatcher {
    /// Builds a dispatcher whose update source follows `config.update_url`.
    pub fn new(config: ShellConfig) -> Self {
        let updates = config.update_url.as_deref().and_then(|url| {
            match HttpUpdateSource::new(url) {
                Ok(source) => Some(Box::new(source) as Box<dyn UpdateSource + Send>),
                Err(err) => {
                    warn!("event=update_source_init module=ipc status=error error={err}");
                    None
                }
            }
        });
        Self {
            session: ProjectSession::new(config),
            updates,
            quit_requested: false,
        }
    }

    pub fn with_update_source(mut self, source: Box<dyn UpdateSource + Send>) -> Self {
        self.updates = Some(source);
        self
    }

    pub fn session(&self) -> &ProjectSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ProjectSession {
        &mut self.session
    }

    /// Whether a `quit` request has been handled.
    pub fn should_quit(&self) -> bool {
        self.quit_requested
    }

    pub fn handle(&mut self, request: Request) -> Handled {
        let channel = request.channel();
        info!(
            "event=ipc_request module=ipc status=start channel={}",
            channel.as_str()
        );

        match request {
            Request::SaveProject {
                project,
                target_path,
            } => reply_or_error(channel, self.session.save(&project, &target_path)),
            Request::LoadProject { file_path } => {
                match self.session.load_with_rollback(&file_path) {
                    Ok(loaded) => {
                        Handled::ok(Reply::with(channel, Payload::Project(loaded.project)))
                    }
                    Err(err) => {
                        log_failure(channel, &err);
                        Handled {
                            reply: Some(Reply::empty(channel)),
                            error: Some(err),
                        }
                    }
                }
            }
            Request::ResetDirectory => {
                reply_or_log(channel, self.session.reset_directory(), |()| None)
            }
            Request::ExportObject { file_path, object } => reply_or_log(
                channel,
                self.session.export_object(&file_path, &object),
                |()| None,
            ),
            Request::ImportObjects { file_paths } => reply_or_log(
                channel,
                self.session.import_objects(&file_paths),
                |objects| Some(Payload::Objects(objects)),
            ),
            Request::ImportObjectsFromResource { objects } => reply_or_log(
                channel,
                self.session.import_objects_from_resource(objects),
                |objects| Some(Payload::Objects(objects)),
            ),
            Request::ImportPictures { file_paths } => reply_or_log(
                channel,
                self.session.import_pictures(&file_paths),
                |pictures| Some(Payload::Pictures(pictures)),
            ),
            Request::ImportPicturesFromResource { pictures } => reply_or_log(
                channel,
                self.session.import_pictures_from_resource(pictures),
                |pictures| Some(Payload::Pictures(pictures)),
            ),
            Request::ImportPictureFromCanvas { images } => reply_or_log(
                channel,
                self.session.import_pictures_from_canvas(&images),
                |pictures| Some(Payload::Pictures(pictures)),
            ),
            Request::ImportSounds { file_paths } => reply_or_log(
                channel,
                self.session.import_sounds(&file_paths),
                |sounds| Some(Payload::Sounds(sounds)),
            ),
            Request::ImportSoundsFromResource { sounds } => reply_or_log(
                channel,
                self.session.import_sounds_from_resource(sounds),
                |sounds| Some(Payload::Sounds(sounds)),
            ),
            Request::StaticDownload {
                segments,
                target_path,
            } => reply_or_log(
                channel,
                self.session.static_download(&segments, &target_path),
                |()| None,
            ),
            Request::TempResourceDownload {
                entry,
                kind,
                target_path,
            } => match self
                .session
                .temp_resource_download(&entry, &kind, &target_path)
            {
                Err(err @ ProjectError::UnknownResourceType(_)) => {
                    reply_or_error(channel, Err(err))
                }
                result => reply_or_log(channel, result, |()| None),
            },
            Request::WriteFile { data, file_path } => {
                reply_or_error(channel, write_file(data.as_bytes(), &file_path))
            }
            Request::SaveExcel { file_path, rows } => {
                reply_or_error(channel, self.session.save_excel(&file_path, &rows))
            }
            Request::CheckUpdate => {
                let result = self.check_update();
                let version = self.session.config().version.clone();
                reply_or_log(channel, result, |info| {
                    Some(Payload::Update { version, info })
                })
            }
            Request::OpenUrl { url } => {
                let error = self.session.open_url(&url).err();
                if let Some(err) = &error {
                    log_failure(channel, err);
                }
                Handled { reply: None, error }
            }
            Request::Quit => {
                self.quit_requested = true;
                info!("event=quit_requested module=ipc status=ok");
                Handled::ok(Reply::empty(channel))
            }
        }
    }

    fn check_update(&self) -> ProjectResult<crate::update::UpdateInfo> {
        let source = self.updates.as_deref().ok_or(UpdateError::NotConfigured)?;
        Ok(check_update(&self.session.config().version, source)?)
    }
}

/// Success → empty reply; failure → reply carrying the error.
fn reply_or_error(channel: Channel, result: ProjectResult<()>) -> Handled {
    match result {
        Ok(()) => Handled::ok(Reply::empty(channel)),
        Err(err) => {
            log_failure(channel, &err);
            let payload = Payload::Error {
                code: err.code().to_string(),
                message: err.to_string(),
            };
            Handled {
                reply: Some(Reply::with(channel, payload)),
                error: Some(err),
            }
        }
    }
}

/// Success → reply built by `payload`; failure → logged, no reply.
fn reply_or_log<T>(
    channel: Channel,
    result: ProjectResult<T>,
    payload: impl FnOnce(T) -> Option<Payload>,
) -> Handled {
    match result {
        Ok(value) => Handled::ok(Reply {
            channel,
            payload: payload(value),
        }),
        Err(err) => {
            log_failure(channel, &err);
            Handled {
                reply: None,
                error: Some(err),
            }
        }
    }
}

fn log_failure(channel: Channel, err: &ProjectError) {
    error!(
        "event=ipc_request module=ipc status=error channel={} error_code={} error={}",
        channel.as_str(),
        err.code(),
        err
    );
}

#[cfg(test)]
mod tests {
    use super::Dispatcher;
    use crate::config::ShellConfig;
    use crate::ipc::message::{Channel, Payload, Reply, Request};
    use crate::project::{ErrorKind, UrlOpener};
    use crate::update::{StaticUpdateSource, UpdateManifest};
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingOpener {
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) -> io::Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[test]
    fn quit_sets_flag_and_replies() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = Dispatcher::new(ShellConfig::with_home(dir.path()));
        let handled = dispatcher.handle(Request::Quit);
        assert_eq!(handled.reply, Some(Reply::empty(Channel::Quit)));
        assert!(dispatcher.should_quit());
    }

    #[test]
    fn check_update_reports_version_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShellConfig::with_home(dir.path());
        let current = config.version.clone();
        let mut dispatcher =
            Dispatcher::new(config).with_update_source(Box::new(StaticUpdateSource::new(
                UpdateManifest {
                    version: "999.0.0".to_string(),
                    url: None,
                    notes: Some("big release".to_string()),
                },
            )));

        let handled = dispatcher.handle(Request::CheckUpdate);
        match handled.reply.and_then(|reply| reply.payload) {
            Some(Payload::Update { version, info }) => {
                assert_eq!(version, current);
                assert!(info.has_new_version);
                assert_eq!(info.notes.as_deref(), Some("big release"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn check_update_without_source_is_logged_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = Dispatcher::new(ShellConfig::with_home(dir.path()));
        let handled = dispatcher.handle(Request::CheckUpdate);
        assert!(handled.reply.is_none());
        assert_eq!(handled.error.map(|err| err.kind()), Some(ErrorKind::Update));
    }

    #[test]
    fn write_file_failure_replies_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not dir").unwrap();
        let mut dispatcher = Dispatcher::new(ShellConfig::with_home(dir.path()));

        let handled = dispatcher.handle(Request::WriteFile {
            data: "x".to_string(),
            file_path: blocker.join("child.txt"),
        });
        match handled.reply.and_then(|reply| reply.payload) {
            Some(Payload::Error { code, .. }) => assert_eq!(code, "file_system"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn save_excel_replies_empty_then_with_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = Dispatcher::new(ShellConfig::with_home(dir.path()));
        let target = dir.path().join("table.xlsx");

        let handled = dispatcher.handle(Request::SaveExcel {
            file_path: target.clone(),
            rows: vec![vec![json!("item"), json!(3)]],
        });
        assert_eq!(handled.reply, Some(Reply::empty(Channel::SaveExcel)));
        assert!(target.is_file());

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not dir").unwrap();
        let handled = dispatcher.handle(Request::SaveExcel {
            file_path: blocker.join("table.xlsx"),
            rows: vec![],
        });
        match handled.reply.and_then(|reply| reply.payload) {
            Some(Payload::Error { code, .. }) => assert_eq!(code, "file_system"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn canvas_import_replies_with_pictures() {
        use base64::Engine;

        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = Dispatcher::new(ShellConfig::with_home(dir.path()));
        let mut png = Vec::new();
        image::RgbaImage::new(5, 2)
            .write_to(&mut io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let request: Request = serde_json::from_value(json!({
            "channel": "importPictureFromCanvas",
            "images": [{
                "name": "sketch",
                "image": format!(
                    "data:image/png;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(&png)
                )
            }]
        }))
        .unwrap();

        let handled = dispatcher.handle(request);
        assert!(handled.is_ok());
        match handled.reply.and_then(|reply| reply.payload) {
            Some(Payload::Pictures(pictures)) => {
                assert_eq!(pictures.len(), 1);
                assert_eq!(pictures[0].name, "sketch");
                let dimension = pictures[0].dimension.clone().unwrap();
                assert_eq!((dimension.width, dimension.height), (5.0, 2.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        let handled = dispatcher.handle(Request::ImportPictureFromCanvas { images: vec![] });
        assert_eq!(
            handled.reply.and_then(|reply| reply.payload),
            Some(Payload::Pictures(vec![]))
        );
    }

    #[test]
    fn open_url_is_never_answered() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = Dispatcher::new(ShellConfig::with_home(dir.path()));
        let opener = RecordingOpener::default();
        dispatcher.session_mut().set_url_opener(opener.clone());

        let handled = dispatcher.handle(Request::OpenUrl {
            url: "https://example.org/manual".to_string(),
        });
        assert!(handled.reply.is_none());
        assert!(handled.is_ok());

        let handled = dispatcher.handle(Request::OpenUrl {
            url: "file:///etc/hosts".to_string(),
        });
        assert!(handled.reply.is_none());
        assert_eq!(handled.error.map(|err| err.kind()), Some(ErrorKind::Validation));
        assert_eq!(
            *opener.opened.lock().unwrap(),
            vec!["https://example.org/manual"]
        );
    }
}
