//! Configuration and file locations

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::inspect::DEFAULT_EXPIRY_THRESHOLD_MINUTES;

pub const DEFAULT_API_BASE_URL: &str = "https://dtcvfgct9ga1.cloudfront.net";

/// Environment variable that overrides `api_base_url`.
pub const API_BASE_URL_ENV: &str = "BOARD_API_BASE_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the task-board REST API
    pub api_base_url: String,
    /// Upper bound on a single `/auth/refresh` round trip
    pub refresh_timeout_secs: u64,
    /// Upper bound on ordinary API calls
    pub request_timeout_secs: u64,
    /// Window used by `status` to flag tokens as expiring soon
    pub expiry_threshold_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            refresh_timeout_secs: 30,
            request_timeout_secs: 60,
            expiry_threshold_minutes: DEFAULT_EXPIRY_THRESHOLD_MINUTES,
        }
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "board-cli", "board-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Credentials file path (tokens and cached user)
    pub fn credentials_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("credentials.toml"))
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read config file")?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = url;
            }
        }

        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Base URL parsed, with a trailing slash so relative joins keep any path prefix.
    pub fn base_url(&self) -> Result<url::Url> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        url::Url::parse(&raw).with_context(|| format!("Invalid API base URL: {}", self.api_base_url))
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Config pointing at `base` with defaults elsewhere.
    #[cfg(test)]
    pub fn for_base_url(base: &str) -> Self {
        Self {
            api_base_url: base.to_string(),
            ..Self::default()
        }
    }
}
