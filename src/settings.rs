//! Sandbox settings with persistence
//!
//! Settings are read from `~/.config/outpost/settings.toml`

use std::fs;
use std::path::PathBuf;

use outpost_core::TimeConfig;
use outpost_game::{DEFAULT_INVENTORY_SLOTS, DEFAULT_STATION_BUFFER_SLOTS};
use outpost_net::SessionConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All sandbox settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub session: SessionSettings,
    pub log: LogSettings,
    pub sandbox: SandboxSettings,
}

impl Settings {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("outpost"))
    }

    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let path = dir.join("settings.toml");
        fs::write(&path, toml::to_string_pretty(self)?)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Host session tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub inventory_slots: usize,
    pub station_buffer_slots: usize,
    /// Simulation ticks per second
    pub tick_rate: f32,
    /// Seconds between clock sync broadcasts
    pub clock_sync_interval: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            inventory_slots: DEFAULT_INVENTORY_SLOTS,
            station_buffer_slots: DEFAULT_STATION_BUFFER_SLOTS,
            tick_rate: 30.0,
            clock_sync_interval: 5.0,
        }
    }
}

impl SessionSettings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            inventory_slots: self.inventory_slots,
            station_buffer_slots: self.station_buffer_slots,
            clock_sync_interval: self.clock_sync_interval,
        }
    }

    pub fn time_config(&self) -> TimeConfig {
        TimeConfig {
            tick_rate: self.tick_rate,
            ..Default::default()
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Scripted sandbox run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Number of simulation ticks to run
    pub ticks: u32,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self { ticks: 300 }
    }
}
