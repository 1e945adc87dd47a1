//! Update availability check.
//!
//! # Responsibility
//! - Fetch the published release manifest from an `UpdateSource`.
//! - Compare it with the running version.
//!
//! # Invariants
//! - Versions compare as numeric `major.minor.patch` triplets; anything else
//!   is rejected instead of guessed.

use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Release manifest as published by the update server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateManifest {
    pub version: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of comparing the running version against the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub current_version: String,
    pub latest_version: String,
    pub has_new_version: bool,
    pub url: Option<String>,
    pub notes: Option<String>,
}

/// Where release metadata comes from.
pub trait UpdateSource {
    fn fetch(&self) -> Result<UpdateManifest, UpdateError>;
}

/// Blocking HTTP source returning the JSON manifest at `url`.
pub struct HttpUpdateSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpUpdateSource {
    pub fn new(url: impl Into<String>) -> Result<Self, UpdateError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| UpdateError::Http {
                status: None,
                message: err.to_string(),
            })?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl UpdateSource for HttpUpdateSource {
    fn fetch(&self) -> Result<UpdateManifest, UpdateError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|err| UpdateError::Http {
                status: err.status().map(|status| status.as_u16()),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Http {
                status: Some(status.as_u16()),
                message: format!("update server answered {status}"),
            });
        }

        response
            .json::<UpdateManifest>()
            .map_err(|err| UpdateError::InvalidManifest(err.to_string()))
    }
}

/// Fixed manifest, used offline and in tests.
#[derive(Debug, Clone)]
pub struct StaticUpdateSource {
    manifest: UpdateManifest,
}

impl StaticUpdateSource {
    pub fn new(manifest: UpdateManifest) -> Self {
        Self { manifest }
    }
}

impl UpdateSource for StaticUpdateSource {
    fn fetch(&self) -> Result<UpdateManifest, UpdateError> {
        Ok(self.manifest.clone())
    }
}

/// Fetches release metadata and reports whether `current` is outdated.
pub fn check_update(current: &str, source: &dyn UpdateSource) -> Result<UpdateInfo, UpdateError> {
    let manifest = source.fetch()?;
    let current_triplet = parse_version(current)?;
    let latest_triplet = parse_version(&manifest.version)?;
    let has_new_version = latest_triplet > current_triplet;
    info!(
        "event=update_check module=update status=ok current={} latest={} has_new={}",
        current, manifest.version, has_new_version
    );
    Ok(UpdateInfo {
        current_version: current.to_string(),
        latest_version: manifest.version,
        has_new_version,
        url: manifest.url,
        notes: manifest.notes,
    })
}

fn parse_version(value: &str) -> Result<(u64, u64, u64), UpdateError> {
    let trimmed = value.trim().trim_start_matches('v');
    let parts = trimmed
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| UpdateError::InvalidVersion(value.to_string()))?;
    match parts.as_slice() {
        [major, minor, patch] => Ok((*major, *minor, *patch)),
        _ => Err(UpdateError::InvalidVersion(value.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    Http {
        status: Option<u16>,
        message: String,
    },
    InvalidManifest(String),
    InvalidVersion(String),
    /// No update url is configured for this build.
    NotConfigured,
}

impl Display for UpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(status),
                message,
            } => write!(f, "update request failed ({status}): {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "update request failed: {message}"),
            Self::InvalidManifest(message) => write!(f, "invalid update manifest: {message}"),
            Self::InvalidVersion(value) => {
                write!(f, "invalid version `{value}` (expected major.minor.patch)")
            }
            Self::NotConfigured => write!(f, "no update source configured"),
        }
    }
}

impl Error for UpdateError {}

#[cfg(test)]
mod tests {
    use super::{check_update, parse_version, StaticUpdateSource, UpdateError, UpdateManifest};

    fn source(version: &str) -> StaticUpdateSource {
        StaticUpdateSource::new(UpdateManifest {
            version: version.to_string(),
            url: Some("https://example.invalid/download".to_string()),
            notes: None,
        })
    }

    #[test]
    fn newer_release_is_reported() {
        let info = check_update("1.9.3", &source("1.10.0")).unwrap();
        assert!(info.has_new_version);
        assert_eq!(info.latest_version, "1.10.0");
        assert_eq!(info.current_version, "1.9.3");
    }

    #[test]
    fn same_or_older_release_is_not_new() {
        assert!(!check_update("2.0.0", &source("2.0.0")).unwrap().has_new_version);
        assert!(!check_update("2.0.1", &source("v2.0.0")).unwrap().has_new_version);
    }

    #[test]
    fn malformed_versions_are_rejected() {
        assert!(matches!(
            parse_version("1.2"),
            Err(UpdateError::InvalidVersion(_))
        ));
        assert!(matches!(
            check_update("1.0.0", &source("latest")),
            Err(UpdateError::InvalidVersion(_))
        ));
    }
}
