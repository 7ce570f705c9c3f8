//! Replay configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/fusion/replay.toml`
//! - Windows: `%APPDATA%/fusion/replay.toml`

use std::path::{Path, PathBuf};

use fusion_dispatcher::config::DEFAULT_CHANNEL_CAPACITY;
use fusion_protocol::StatusFilter;
use serde::{Deserialize, Serialize};

/// Replay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Capacity of the push event channel.
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Status tab the printed library view is filtered by.
    #[serde(default)]
    pub default_status_filter: StatusFilter,

    /// Show hidden games in the printed library view.
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_channel_capacity: default_channel_capacity(),
            default_status_filter: StatusFilter::default(),
            include_hidden: false,
        }
    }
}

impl ReplayConfig {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: ReplayConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = ReplayConfig::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("fusion")
            .join("replay.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")?;
        Ok(PathBuf::from(appdata).join("fusion").join("replay.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(std::env::temp_dir().join("fusion").join("replay.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ReplayConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.event_channel_capacity, 64);
        assert_eq!(config.default_status_filter, StatusFilter::All);
        assert!(!config.include_hidden);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ReplayConfig = toml::from_str(r#"default_status_filter = "installed""#).unwrap();
        assert_eq!(config.default_status_filter, StatusFilter::Installed);
        assert_eq!(config.event_channel_capacity, 64);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn missing_file_writes_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("replay.toml");

        let config = ReplayConfig::load_from(&path).unwrap();

        assert_eq!(config, ReplayConfig::default());
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("event_channel_capacity = 64"));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("replay.toml");
        let config = ReplayConfig {
            log_level: "debug".into(),
            event_channel_capacity: 8,
            default_status_filter: StatusFilter::NotInstalled,
            include_hidden: true,
        };

        config.save_to(&path).unwrap();
        let loaded = ReplayConfig::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("replay.toml");
        std::fs::write(&path, "event_channel_capacity = \"lots\"").unwrap();

        assert!(ReplayConfig::load_from(&path).is_err());
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("fusion"));
    }
}
