//! External links opened from the editor (help pages, mail, vendor sites).
//!
//! # Invariants
//! - Only `http`, `https` and `mailto` urls reach the system handler.

use super::session::ProjectSession;
use super::{ProjectError, ProjectResult};
use log::info;
use std::io;

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Hands a url to something that can display it.
pub trait UrlOpener {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens urls with the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUrlOpener;

impl UrlOpener for SystemUrlOpener {
    fn open(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

impl ProjectSession {
    /// Opens `url` in the user's browser or mail client.
    pub fn open_url(&self, url: &str) -> ProjectResult<()> {
        let url = url.trim();
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .filter(|scheme| ALLOWED_SCHEMES.contains(&scheme.as_str()))
            .ok_or_else(|| ProjectError::InvalidInput(format!("refusing to open url `{url}`")))?;

        self.url_opener()
            .open(url)
            .map_err(|err| ProjectError::io(url, err))?;
        info!("event=open_url module=project status=ok scheme={scheme}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::UrlOpener;
    use crate::config::ShellConfig;
    use crate::project::{ErrorKind, ProjectSession};
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

    struct FailingOpener;

    impl UrlOpener for FailingOpener {
        fn open(&self, _url: &str) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn session_with(
        opener: impl UrlOpener + Send + 'static,
    ) -> (tempfile::TempDir, ProjectSession) {
        let dir = tempfile::tempdir().unwrap();
        let mut session = ProjectSession::new(ShellConfig::with_home(dir.path()));
        session.set_url_opener(opener);
        (dir, session)
    }

    #[test]
    fn web_and_mail_urls_are_handed_to_the_opener() {
        let opener = RecordingOpener::default();
        let (_dir, session) = session_with(opener.clone());

        session.open_url("https://example.org/help").unwrap();
        session.open_url(" HTTP://example.org ").unwrap();
        session.open_url("mailto:support@example.org").unwrap();

        assert_eq!(
            *opener.opened.lock().unwrap(),
            vec![
                "https://example.org/help",
                "HTTP://example.org",
                "mailto:support@example.org"
            ]
        );
    }

    #[test]
    fn local_and_script_urls_are_rejected() {
        let opener = RecordingOpener::default();
        let (_dir, session) = session_with(opener.clone());

        for url in ["file:///etc/passwd", "javascript:alert(1)", "example.org", ""] {
            let err = session.open_url(url).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{url}");
        }
        assert!(opener.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn opener_failure_is_a_file_system_error() {
        let (_dir, session) = session_with(FailingOpener);
        let err = session.open_url("https://example.org").unwrap_err();
        assert_eq!(err.code(), "file_system");
    }
}
