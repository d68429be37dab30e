//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the shared application secret, session lifetime
//! overrides, and the durable store backend choice.
//!
//! Configuration is stored at `~/.config/tillvault/config.json`. The
//! secret can also come from the `TILLVAULT_SECRET` environment variable,
//! which takes priority over the file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "tillvault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the configured secret
pub const SECRET_ENV_VAR: &str = "TILLVAULT_SECRET";

/// File name of the per-install KDF salt inside the data directory
pub const SALT_FILE: &str = "kdf_salt";

/// Durable store backend choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub shared_secret: Option<String>,
    pub short_session_minutes: Option<i64>,
    pub long_session_days: Option<i64>,
    #[serde(default)]
    pub durable_backend: DurableBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the durable session record and the KDF salt.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// The effective application secret: environment variable first, then
    /// the config file. None means the installation is not set up yet.
    pub fn resolve_secret(&self) -> Option<String> {
        std::env::var(SECRET_ENV_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.shared_secret.clone())
    }
}
