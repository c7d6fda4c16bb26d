// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection
    pub mqtt: MqttConfig,

    /// On-disk storage
    pub storage: StorageConfig,

    /// Threshold alerting
    pub alerts: AlertConfig,

    /// Chart regeneration and liveness checks
    pub graph: GraphConfig,

    /// Daily timelapse compaction
    pub timelapse: TimelapseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            storage: StorageConfig::default(),
            alerts: AlertConfig::default(),
            graph: GraphConfig::default(),
            timelapse: TimelapseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("thermowatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Storage layout rooted at the configured prefix
    pub fn layout(&self) -> Layout {
        Layout::new(&self.storage.prefix)
    }
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Pause before polling again after a connection error
    pub reconnect_delay_secs: u64,
    /// Request channel capacity of the async client
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "thermowatch-server".to_string(),
            keep_alive_secs: 60,
            reconnect_delay_secs: 5,
            channel_capacity: 100,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for catalog, series, images and logs
    pub prefix: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("/mnt/data/surveillance"),
        }
    }
}

/// Threshold alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Notify when a reading drops below this value
    pub min: Option<f64>,

    /// Notify when a reading rises above this value
    pub max: Option<f64>,

    /// Display names of the sensors being watched
    pub sensors: Vec<String>,

    /// Distance past the previous alert point before firing again
    pub hysteresis: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            sensors: Vec::new(),
            hysteresis: 1.0,
        }
    }
}

/// Graph scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub interval_secs: u64,

    /// Sensors silent for longer than this are reported once
    pub liveness_window_secs: u64,

    /// Observer location used for night shading
    pub latitude: f64,
    pub longitude: f64,

    pub rrdtool: PathBuf,
    pub width: u32,
    pub height: u32,
    pub upper_limit: f64,
    pub lower_limit: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            liveness_window_secs: 600,
            // Copenhagen
            latitude: 55.6761,
            longitude: 12.5683,
            rrdtool: PathBuf::from("/usr/bin/rrdtool"),
            width: 700,
            height: 400,
            upper_limit: 35.0,
            lower_limit: -10.0,
        }
    }
}

impl GraphConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Timelapse scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelapseConfig {
    pub interval_secs: u64,

    /// Rendered videos older than this are deleted
    pub retention_days: u32,

    pub mencoder: PathBuf,
    pub fps: u32,
}

impl Default for TimelapseConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            retention_days: 7,
            mencoder: PathBuf::from("/usr/bin/mencoder"),
            fps: 24,
        }
    }
}

impl TimelapseConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * 86_400)
    }
}

/// Directory layout under the storage prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub prefix: PathBuf,
    pub database_dir: PathBuf,
    pub rrd_dir: PathBuf,
    pub images_dir: PathBuf,
    pub surveillance_dir: PathBuf,
    pub charts_dir: PathBuf,
    pub timelapse_dir: PathBuf,
}

impl Layout {
    pub fn new(prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref().to_path_buf();
        let images_dir = prefix.join("images");
        Self {
            database_dir: prefix.join("database"),
            rrd_dir: prefix.join("rrd"),
            surveillance_dir: images_dir.join("surveillance"),
            charts_dir: images_dir.join("rrd"),
            timelapse_dir: images_dir.join("timelapse"),
            images_dir,
            prefix,
        }
    }

    pub fn database_file(&self) -> PathBuf {
        self.database_dir.join("surveillance.sqlite3")
    }

    pub fn log_file(&self) -> PathBuf {
        self.prefix.join("thermometer_server.log")
    }

    fn dirs(&self) -> [&Path; 6] {
        [
            &self.database_dir,
            &self.rrd_dir,
            &self.images_dir,
            &self.surveillance_dir,
            &self.charts_dir,
            &self.timelapse_dir,
        ]
    }

    /// Create every missing directory
    pub fn ensure(&self) -> Result<()> {
        for dir in self.dirs() {
            info!("PATH: {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
