use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use dirs_next as dirs;

use crate::coach::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::error::ConfigError;
use crate::session::StartPolicy;
use crate::sync::DEFAULT_TIMEOUT;

/// User settings persisted between runs.
///
/// Every field is `#[serde(default)]` so settings files written by older
/// versions keep loading. Environment variables override the file:
/// `TITAN_DATA_DIR`, `TITAN_REMOTE_URL`, `TITAN_USER_ID`,
/// `TITAN_REMOTE_TOKEN` and `GEMINI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory for the local store. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub user_id: Option<String>,
    pub remote_token: Option<String>,
    pub remote_timeout_secs: u64,
    pub coach_api_key: Option<String>,
    pub coach_endpoint: String,
    pub coach_model: String,
    pub start_policy: StartPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            remote_url: None,
            user_id: None,
            remote_token: None,
            remote_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            coach_api_key: None,
            coach_endpoint: DEFAULT_ENDPOINT.to_string(),
            coach_model: DEFAULT_MODEL.to_string(),
            start_policy: StartPolicy::default(),
        }
    }
}

impl Settings {
    const FILE: &'static str = "titan_fit_settings.json";

    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings from the JSON configuration file, then apply
    /// environment overrides. A missing or unreadable file yields defaults.
    pub fn load() -> Self {
        let mut settings = match Self::path() {
            Some(path) => match Self::read(&path) {
                Ok(s) => s,
                Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    Self::default()
                }
                Err(e) => {
                    log::warn!("Ignoring settings at {}: {e}", path.display());
                    Self::default()
                }
            },
            None => Self::default(),
        };
        settings.apply_env();
        settings
    }

    pub fn read(path: &std::path::Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Persist the settings to the configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = Self::path() else {
            log::warn!("No configuration directory; settings not saved");
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os("TITAN_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(url) = std::env::var("TITAN_REMOTE_URL") {
            self.remote_url = Some(url);
        }
        if let Ok(user) = std::env::var("TITAN_USER_ID") {
            self.user_id = Some(user);
        }
        self.remote_token = crate::sync::resolve_token(self.remote_token.as_deref());
        self.coach_api_key = crate::coach::resolve_api_key(self.coach_api_key.as_deref());
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }

    /// Remote base URL and user id, when both are configured.
    pub fn remote(&self) -> Option<(&str, &str)> {
        match (self.remote_url.as_deref(), self.user_id.as_deref()) {
            (Some(url), Some(user)) if !url.is_empty() && !user.is_empty() => Some((url, user)),
            _ => None,
        }
    }
}
