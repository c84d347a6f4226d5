//! Configuration management for HapticPlayer
//!
//! This module handles loading and managing application configuration
//! from various sources including config files and environment variables.

use crate::utils::error::{HapticPlayerError, IntoPlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted scrubber resolution
pub const MAX_PROGRESS_RESOLUTION: u32 = 1_000_000;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transport controller timings
    pub controller: ControllerConfig,

    /// Playback session settings
    pub playback: PlaybackConfig,

    /// Haptic channel settings
    pub haptics: HapticsConfig,

    /// Simulated media parameters for the driver binary
    pub engine: EngineConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Transport controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Auto-hide delay used by a plain `show()`
    pub default_timeout_ms: u64,

    /// Controls stay up once this little playback time remains
    pub near_end_threshold_ms: u64,

    /// Redelivery interval of the position polling loop
    pub progress_interval_ms: u64,

    /// Fade-out animation length
    pub fade_out_ms: u64,

    /// Fade-in animation length after an interrupted fade-out
    pub fade_in_ms: u64,

    /// Show timeout requested while the scrubber is being dragged
    pub scrub_hold_timeout_ms: u64,

    /// Scrubber resolution
    pub progress_max: u32,
}

/// Playback session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Delay of the first controller show after playback starts
    pub first_show_delay_ms: u64,

    /// Display width in pixels
    pub display_width: u32,

    /// Display height in pixels
    pub display_height: u32,
}

/// Haptic channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticsConfig {
    /// Attach the haptic channel when a video asks for it
    pub enabled: bool,

    /// Interval between position pushes into the haptic channel
    pub sync_interval_ms: u64,
}

/// Parameters of the simulated media engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reported media duration
    pub duration_ms: u64,

    /// Native video width
    pub video_width: u32,

    /// Native video height
    pub video_height: u32,

    /// Delay before the prepared event is delivered
    pub prepare_delay_ms: u64,
}

/// General application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 2000,
            near_end_threshold_ms: 10_000,
            progress_interval_ms: 16,
            fade_out_ms: 600,
            fade_in_ms: 400,
            scrub_hold_timeout_ms: 3_600_000,
            progress_max: 1000,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            first_show_delay_ms: 1000,
            display_width: 1920,
            display_height: 1080,
        }
    }
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_interval_ms: 1000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duration_ms: 60_000,
            video_width: 1920,
            video_height: 1080,
            prepare_delay_ms: 150,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/hapticplayer/config.toml on Linux)
    /// 3. User config file (~/.config/hapticplayer/config.toml on Linux)
    /// 4. Environment variables (HAPTICPLAYER_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config.merge_from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from an explicit file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| HapticPlayerError::Config("Cannot determine user config path".to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).config_err("Failed to create config directory")?;
        }

        let toml = toml::to_string_pretty(self).config_err("Failed to serialize config")?;
        std::fs::write(&path, toml).config_err("Failed to write config file")?;

        Ok(())
    }

    /// Merge configuration from a TOML file
    ///
    /// Sections and keys missing from the file keep their current values.
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        let overlay: toml::Value = toml::from_str(&contents).config_err("Failed to parse config file")?;

        let mut merged = toml::Value::try_from(&*self).config_err("Failed to serialize config")?;
        merge_values(&mut merged, overlay);
        *self = Config::deserialize(merged).config_err("Failed to parse config file")?;
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_u64("HAPTICPLAYER_CONTROLLER_TIMEOUT_MS")? {
            self.controller.default_timeout_ms = v;
        }

        if let Some(v) = env_u64("HAPTICPLAYER_PROGRESS_INTERVAL_MS")? {
            self.controller.progress_interval_ms = v;
        }

        if let Some(v) = env_u64("HAPTICPLAYER_HAPTIC_SYNC_MS")? {
            self.haptics.sync_interval_ms = v;
        }

        if let Ok(enabled) = std::env::var("HAPTICPLAYER_HAPTICS") {
            self.haptics.enabled = enabled
                .parse()
                .map_err(|_| HapticPlayerError::Config("Invalid HAPTICPLAYER_HAPTICS".to_string()))?;
        }

        if let Ok(log_level) = std::env::var("HAPTICPLAYER_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.playback.display_width == 0 || self.playback.display_height == 0 {
            return Err(HapticPlayerError::Config("Display dimensions must be non-zero".to_string()));
        }

        if self.controller.progress_interval_ms == 0 {
            return Err(HapticPlayerError::Config("Progress interval must be non-zero".to_string()));
        }

        if self.haptics.sync_interval_ms == 0 {
            return Err(HapticPlayerError::Config("Haptic sync interval must be non-zero".to_string()));
        }

        if self.controller.progress_max == 0 || self.controller.progress_max > MAX_PROGRESS_RESOLUTION {
            return Err(HapticPlayerError::Config(format!(
                "Scrubber resolution must be between 1 and {}",
                MAX_PROGRESS_RESOLUTION
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(HapticPlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/hapticplayer/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("HapticPlayer").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/HapticPlayer/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hapticplayer").join("config.toml"))
    }
}

/// Overlay `overlay` onto `base`, table by table
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| HapticPlayerError::Config(format!("Invalid {}", key))),
        Err(_) => Ok(None),
    }
}
