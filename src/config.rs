//! Configuration loading and stored message defaults.
//!
//! Configuration is a TOML file; secrets can also come from the environment
//! (`MAILBURST_API_KEY`, `MAILBURST_ACCESS_TOKEN`, `MAILBURST_TG_TOKEN`,
//! `MAILBURST_TG_CHAT`), which wins over the file. Message defaults filled
//! in through the web form persist to their own small TOML file so the
//! scheduled trigger can reuse them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{dispatcher::BatchPolicy, error::ConfigError, sender::RetryPolicy};

/// Delivery API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Send endpoint of the delivery API.
    pub endpoint: String,
    /// Bearer credential. Left unset, every dispatch run aborts with a
    /// config error rather than failing at startup.
    pub key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.mailersend.com/v1/email".to_string(),
            key: None,
        }
    }
}

/// Notification sink settings (Telegram bot API).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub tg_token: Option<String>,
    pub tg_chat: Option<String>,
    /// Base URL of the bot API; overridable for tests.
    pub api_base: String,
    /// Per-fragment request timeout.
    pub timeout_secs: u64,
    /// Pause between fragments of an oversized report.
    pub fragment_pause_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            tg_token: None,
            tg_chat: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 30,
            fragment_pause_ms: 1000,
        }
    }
}

/// Inbound HTTP surface settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub listen_address: String,
    /// When set, requests must carry `?token=<value>`.
    pub access_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:8080".to_string(),
            access_token: None,
        }
    }
}

/// Timer-driven dispatch using stored defaults only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub retry: RetryPolicy,
    pub batch: BatchPolicy,
    pub notifier: NotifierConfig,
    pub http: HttpConfig,
    pub schedule: Option<ScheduleConfig>,
    /// Where stored message defaults live.
    pub defaults_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path`, then apply environment overrides.
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("MAILBURST_API_KEY") {
            self.api.key = Some(key);
        }
        if let Ok(token) = std::env::var("MAILBURST_ACCESS_TOKEN") {
            self.http.access_token = Some(token);
        }
        if let Ok(token) = std::env::var("MAILBURST_TG_TOKEN") {
            self.notifier.tg_token = Some(token);
        }
        if let Ok(chat) = std::env::var("MAILBURST_TG_CHAT") {
            self.notifier.tg_chat = Some(chat);
        }
    }

    #[must_use]
    pub fn defaults_path(&self) -> PathBuf {
        self.defaults_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("./mailburst.defaults.toml"))
    }
}

/// Message defaults saved from the web form, reused for blank form fields
/// and for scheduled runs. Field names mirror the form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredDefaults {
    pub from_email: String,
    pub to_emails: String,
    pub subject: String,
    pub body: String,
}

/// File-backed store for [`StoredDefaults`].
#[derive(Clone, Debug)]
pub struct DefaultsStore {
    path: PathBuf,
}

impl DefaultsStore {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load stored defaults; a missing file yields empty defaults.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the file exists but cannot be read or
    /// parsed.
    pub async fn load(&self) -> Result<StoredDefaults, ConfigError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: self.path.display().to_string(),
                source,
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(StoredDefaults::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Persist `defaults`, replacing whatever was stored before.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the file cannot be written.
    pub async fn save(&self, defaults: &StoredDefaults) -> Result<(), ConfigError> {
        // StoredDefaults always serializes; toml::to_string cannot fail on it
        let raw = toml::to_string(defaults).unwrap_or_default();
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|source| ConfigError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }
}
