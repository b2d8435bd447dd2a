//! On-disk configuration, loaded from `<root>/config.toml`.

use crate::api::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Settings read at startup; a missing file yields the defaults.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Behavior of the git sync coordinator.
#[derive(Deserialize, Debug, Clone)]
pub struct SyncConfig {
    /// Minutes between background pulls; 0 disables the loop.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Whether reconciliation may fall back to a hard reset onto the
    /// remote after merge and rebase both fail.
    #[serde(default = "default_allow_reset")]
    pub allow_reset: bool,
}

/// HTTP adapter settings.
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_minutes: default_interval_minutes(),
            allow_reset: default_allow_reset(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
        }
    }
}

fn default_interval_minutes() -> u64 {
    5
}

fn default_allow_reset() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load the configuration file under the library root.
    pub fn load(root: &Path) -> Result<Config> {
        let path = root.join("config.toml");
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| Error::Parse(format!("config.toml: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.sync.interval_minutes, 5);
        assert!(config.sync.allow_reset);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[sync]\ninterval_minutes = 1\nallow_reset = false\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.sync.interval_minutes, 1);
        assert!(!config.sync.allow_reset);
        assert_eq!(config.server.port, 8080);
    }
}
