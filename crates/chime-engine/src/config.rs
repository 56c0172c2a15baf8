//! Player configuration.
//!
//! Volume tiers, tick rate, playlist behaviour and the default log
//! directive. Loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use chime_mixer::VolumeLevels;

/// Configuration file name.
const CONFIG_FILE: &str = "chime.toml";

/// Player configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChimeConfig {
    /// Milliseconds between audio system updates
    pub tick_interval_ms: u64,
    /// Seconds of overlap between consecutive playlist tracks
    pub crossfade_secs: f32,
    /// Start over after the last track
    pub loop_playlist: bool,
    /// Default tracing directive when `RUST_LOG` does not override it
    pub log_filter: String,
    /// Volume tiers applied at startup
    pub volumes: VolumeLevels,
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            crossfade_secs: 2.0,
            loop_playlist: false,
            log_filter: "chime=info".to_string(),
            volumes: VolumeLevels::default(),
        }
    }
}

impl ChimeConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default configuration file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from(CONFIG_FILE),
            |dir| dir.join("chime").join(CONFIG_FILE),
        )
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.volumes = self.volumes.clamped();
        self.tick_interval_ms = self.tick_interval_ms.clamp(5, 1000);
        self.crossfade_secs = if self.crossfade_secs.is_finite() {
            self.crossfade_secs.clamp(0.0, 30.0)
        } else {
            0.0
        };
        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
    }

    /// Tick interval as a duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ChimeConfig::default();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert!(!config.loop_playlist);
        assert_relative_eq!(config.volumes.master, 1.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ChimeConfig::default();
        config.volumes.music = 2.0;
        config.tick_interval_ms = 0;
        config.crossfade_secs = f32::NAN;
        config.log_filter = "  ".to_string();

        config.validate();

        assert_relative_eq!(config.volumes.music, 1.0);
        assert_eq!(config.tick_interval_ms, 5);
        assert_relative_eq!(config.crossfade_secs, 0.0);
        assert_eq!(config.log_filter, "chime=info");
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("chime.toml");

        let mut config = ChimeConfig::default();
        config.volumes.master = 0.5;
        config.crossfade_secs = 4.0;
        config.loop_playlist = true;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = ChimeConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = ChimeConfig::load_from("/nonexistent/path/chime.toml");
        assert_eq!(config, ChimeConfig::default());
    }

    #[test]
    fn test_config_load_invalid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("chime.toml");
        fs::write(&config_path, "tick_interval_ms = \"fast\"").expect("Failed to write");

        assert_eq!(ChimeConfig::load_from(&config_path), ChimeConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ChimeConfig = toml::from_str(
            r#"
            crossfade_secs = 1.5

            [volumes]
            music = 0.6
            "#,
        )
        .expect("Failed to parse");

        assert_relative_eq!(config.crossfade_secs, 1.5);
        assert_relative_eq!(config.volumes.music, 0.6);
        assert_relative_eq!(config.volumes.master, 1.0);
        assert_eq!(config.tick_interval_ms, 50);
    }
}
