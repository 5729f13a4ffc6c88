use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use jpics_adapters::EncodeMode;
use jpics_application::{CoordinatorConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "jpics.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("cannot write config {path}: {message}")]
    Write { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadEncoding {
    #[default]
    Reencode,
    Original,
}

impl From<UploadEncoding> for EncodeMode {
    fn from(encoding: UploadEncoding) -> Self {
        match encoding {
            UploadEncoding::Reencode => EncodeMode::Reencode,
            UploadEncoding::Original => EncodeMode::Original,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantUploadConfig {
    pub roots: Vec<PathBuf>,
    pub ignored_folders: Vec<PathBuf>,
    /// Album id overriding the instant-upload system album.
    pub target_album: Option<i64>,
    /// Checkpoint of the last complete run.
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub auto_login: bool,
    pub catalog_path: PathBuf,
    pub request_timeout_secs: u64,
    pub stage_timeout_secs: u64,
    pub retry_attempts: u32,
    pub upload_encoding: UploadEncoding,
    pub instant_upload: InstantUploadConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            password: String::new(),
            auto_login: false,
            catalog_path: PathBuf::from("jpics.sqlite3"),
            request_timeout_secs: 30,
            stage_timeout_secs: 120,
            retry_attempts: 2,
            upload_encoding: UploadEncoding::default(),
            instant_upload: InstantUploadConfig::default(),
        }
    }
}

impl AppConfig {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                })
            }
        };
        serde_json::from_str(&text).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |message: String| ConfigError::Write {
            path: path.to_path_buf(),
            message,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|error| write_error(error.to_string()))?;
            }
        }
        let text =
            serde_json::to_string_pretty(self).map_err(|error| write_error(error.to_string()))?;
        fs::write(path, text).map_err(|error| write_error(error.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            stage_timeout: Duration::from_secs(self.stage_timeout_secs.max(1)),
            retry: RetryPolicy {
                attempts: self.retry_attempts.max(1),
                ..RetryPolicy::default()
            },
            ..CoordinatorConfig::default()
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
