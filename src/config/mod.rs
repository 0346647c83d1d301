//! Configuration storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::models::UserId;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:9590";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the hub REST API
    pub server_url: String,
    /// Push WebSocket URL. Derived from `server_url` when unset.
    pub push_url: Option<String>,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Id of the signed-in user (used to recognise our own messages)
    pub user_id: Option<UserId>,
    /// How many recent messages a channel view loads
    pub history_limit: usize,
    /// Consecutive failed reconnects before going offline
    pub reconnect_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            push_url: None,
            token: None,
            user_id: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
        }
    }
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "heronix", "heronix-hub")
            .context("Could not determine config directory")
    }

    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Path of the log file written while the TUI owns the terminal
    pub fn log_path() -> Result<PathBuf> {
        let dir = Self::project_dirs()?.data_local_dir().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create data directory")?;
        Ok(dir.join("hub.log"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::parse(&content)
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

        // Set restrictive permissions on config file (contains the token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Push URL, explicit or derived from the server URL.
    pub fn push_url(&self) -> Result<String> {
        match &self.push_url {
            Some(url) => Ok(url.clone()),
            None => crate::push::derive_push_url(&self.server_url),
        }
    }
}
