//! Configuration for the sensor telemetry pipeline.

use crate::core::export::{ExportHeader, ExportOptions};
use crate::core::smoothing::{SmoothingFilter, SmoothingStrategy, DEFAULT_WINDOW_RADIUS};
use crate::pipeline::worker::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Samples on each side of the center in the moving average
    pub window_radius: usize,

    /// How smoothing is updated per arrival
    pub strategy: SmoothingStrategy,

    /// Decimal places for the exported value column
    pub precision: usize,

    /// Decimal places for the exported rate-of-change column
    pub change_precision: usize,

    /// Export header row
    pub header: ExportHeader,

    /// Optional unit label for the live readout
    pub unit: Option<String>,

    /// Interval between simulated readings
    #[serde(with = "duration_ms_serde")]
    pub sample_interval: Duration,

    /// Readings that may queue ahead of the pipeline worker
    pub channel_capacity: usize,

    /// Directory for CSV exports
    pub export_path: PathBuf,

    /// Directory for persisted statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensor-telemetry");

        Self {
            window_radius: DEFAULT_WINDOW_RADIUS,
            strategy: SmoothingStrategy::default(),
            precision: 2,
            change_precision: 4,
            header: ExportHeader::default(),
            unit: None,
            sample_interval: Duration::from_millis(1000),
            channel_capacity: 10_000,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensor-telemetry")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            precision: self.precision,
            change_precision: self.change_precision,
            header: self.header,
        }
    }

    /// Worker settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            filter: SmoothingFilter::new(self.window_radius, self.strategy),
            export: self.export_options(),
            unit: self.unit.clone(),
            capacity: self.channel_capacity,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
