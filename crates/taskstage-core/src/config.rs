//! Application configuration management.
//!
//! Settings are read from `~/.config/taskstage/config.json` when it exists,
//! then overridden by environment variables (a `.env` file is loaded by the
//! binary before this runs). The account password is never part of the file:
//! it comes from `PASSWORD` or from the OS keychain.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_LOGIN_SUCCESS, DEFAULT_REFRESH_SUCCESS};
use crate::api::SessionConfig;
use crate::poll::{
    Backoff, PollConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
use crate::staging::StagingConfig;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "taskstage";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_BASE_URL: &str = "https://app.adbraze.com/api/v1";

/// Per-request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub email: Option<String>,
    pub user_id: Option<String>,
    /// Folder holding the template project and one folder per task
    pub task_root: Option<PathBuf>,
    /// Second root that receives an empty folder per task
    pub mirror_root: Option<PathBuf>,
    /// Template project file name inside `task_root`
    pub template_project: Option<String>,
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
    pub request_timeout_secs: u64,
    /// Cap for exponential backoff; fixed interval when unset
    pub backoff_max_secs: Option<u64>,
    pub login_success_codes: Vec<u16>,
    pub refresh_success_codes: Vec<u16>,
    /// Overrides the platform data directory
    pub data_dir: Option<PathBuf>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            email: None,
            user_id: None,
            task_root: None,
            mirror_root: None,
            template_project: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            backoff_max_secs: None,
            login_success_codes: DEFAULT_LOGIN_SUCCESS.to_vec(),
            refresh_success_codes: DEFAULT_REFRESH_SUCCESS.to_vec(),
            data_dir: None,
            password: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) => Self::load_from(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("EMAIL") {
            self.email = Some(v);
        }
        if let Some(v) = get("PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = get("USERID") {
            self.user_id = Some(v);
        }
        if let Some(v) = get("TASKFOLDERPASS") {
            self.task_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("DROPBOX") {
            self.mirror_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("PROJECT") {
            self.template_project = Some(v);
        }
        if let Some(v) = get("POLL_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.poll_interval_secs = v;
        }
        if let Some(v) = get("MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.max_attempts = v;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where credentials, the task cache and logs live.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn require_email(&self) -> Result<&str> {
        self.email
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("EMAIL is not configured"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_config(&self) -> PollConfig {
        let backoff = match self.backoff_max_secs {
            Some(max) => Backoff::Exponential {
                max: Duration::from_secs(max),
            },
            None => Backoff::Fixed,
        };
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs).max(MIN_POLL_INTERVAL),
            max_attempts: self.max_attempts,
            backoff,
        }
    }

    pub fn session_config(&self, password: String) -> Result<SessionConfig> {
        let mut session = SessionConfig::new(self.require_email()?, password);
        session.user_id = self.user_id.clone();
        session.login_success_codes = self.login_success_codes.clone();
        session.refresh_success_codes = self.refresh_success_codes.clone();
        Ok(session)
    }

    pub fn staging_config(&self) -> Result<StagingConfig> {
        let task_root = self
            .task_root
            .clone()
            .ok_or_else(|| anyhow::anyhow!("TASKFOLDERPASS (task root) is not configured"))?;
        Ok(StagingConfig {
            task_root,
            mirror_root: self.mirror_root.clone(),
            template_project: self.template_project.clone(),
        })
    }
}
