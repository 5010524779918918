//! Client configuration, loaded from TOML.
//!
//! ```toml
//! api_base_url = "https://ats.example.com/api"
//! debounce_ms = 300
//! on_status_failure = "rollback"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::attachment::{AttachmentPolicy, DEFAULT_MAX_BYTES, DOC, DOCX, PDF};
use crate::app::status_updater::StatusFailurePolicy;

/// Overrides `api_base_url`.
pub const API_URL_ENV: &str = "ATS_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub debounce_ms: u64,
    pub max_attachment_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub login_path: String,
    pub on_status_failure: StatusFailurePolicy,
    pub request_timeout_secs: u64,
    /// Where the session is kept; the platform data directory when unset.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            debounce_ms: 300,
            max_attachment_bytes: DEFAULT_MAX_BYTES,
            allowed_mime_types: [PDF, DOC, DOCX].map(String::from).to_vec(),
            login_path: "/login".to_string(),
            on_status_failure: StatusFailurePolicy::default(),
            request_timeout_secs: 30,
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// `config.toml` next to the stored session, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ats").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply `ATS_API_URL` if it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.allowed_mime_types.is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_mime_types must not be empty".to_string(),
            ));
        }
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "login_path must start with '/', got '{}'",
                self.login_path
            )));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::new(self.allowed_mime_types.iter().cloned(), self.max_attachment_bytes)
    }
}
