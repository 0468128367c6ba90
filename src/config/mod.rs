//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::device::BackendKind;
use crate::domain::DEFAULT_THRESHOLD;
use crate::error::ConfigError;
use crate::observe::{RecordFormat, DEFAULT_LOG_FILE};
use crate::services::control_loop::DEFAULT_INTERVAL_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// GPU selection settings
    pub gpu: GpuConfig,
    /// Control law settings
    pub control: ControlSettings,
    /// Record output settings
    pub log: LogConfig,
}

impl Config {
    /// Check values that serde alone cannot constrain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "general.interval_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.control.threshold > 100 {
            return Err(ConfigError::InvalidValue {
                key: "control.threshold".to_string(),
                message: format!("{} is not a percentage (0-100)", self.control.threshold),
            });
        }
        if self.general.smi_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "general.smi_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Polling interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.general.interval_ms)
    }
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Dry run mode
    pub dry_run: bool,
    /// Control loop interval in milliseconds
    pub interval_ms: u64,
    /// Device backend
    pub backend: BackendKind,
    /// Program used by the nvidia-smi backend
    pub smi_path: String,
    /// Arguments placed before every nvidia-smi query (e.g. when wrapping with sudo)
    pub smi_args: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            interval_ms: DEFAULT_INTERVAL_MS,
            backend: BackendKind::default(),
            smi_path: crate::device::smi::DEFAULT_PROGRAM.to_string(),
            smi_args: Vec::new(),
        }
    }
}

/// GPU selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GpuConfig {
    /// Target GPU by index
    pub index: u32,
}

/// Control law configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Utilization percentage at or above which the limit is raised
    pub threshold: u32,
    /// Allow raising the limit above the factory default, up to the device max
    pub overclock: bool,
    /// Stop after this many failed samples in a row (unset: never)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            threshold: u32::from(DEFAULT_THRESHOLD),
            overclock: false,
            max_consecutive_failures: None,
        }
    }
}

/// Record output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log tick records to the console
    pub stdout: bool,
    /// Append tick records to this file
    pub file: Option<PathBuf>,
    /// Line format of the log file
    pub format: RecordFormat,
}

impl LogConfig {
    /// Log file to append to; an empty path disables the file
    pub fn file_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            format: RecordFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.interval_ms, 1000);
        assert_eq!(config.interval(), crate::services::control_loop::DEFAULT_INTERVAL);
        assert_eq!(config.general.backend, BackendKind::Smi);
        assert_eq!(config.gpu.index, 0);
        assert_eq!(config.control.threshold, 95);
        assert!(!config.control.overclock);
        assert!(config.log.stdout);
        assert_eq!(config.log.file, Some(PathBuf::from("gpu_leaf.log")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [general]
            interval_ms = 500
            backend = "nvml"

            [control]
            threshold = 80
            overclock = true
            max_consecutive_failures = 5

            [log]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.general.backend, BackendKind::Nvml);
        assert_eq!(config.control.threshold, 80);
        assert!(config.control.overclock);
        assert_eq!(config.control.max_consecutive_failures, Some(5));
        assert_eq!(config.log.format, RecordFormat::Json);
        // Untouched sections keep their defaults
        assert!(config.log.stdout);
        assert_eq!(config.general.smi_path, "nvidia-smi");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.general.interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "general.interval_ms"
        ));
    }

    #[test]
    fn test_validate_rejects_threshold_over_100() {
        let mut config = Config::default();
        config.control.threshold = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_file_disables_file() {
        let config: Config = toml::from_str("[log]\nfile = \"\"\n").unwrap();
        assert!(config.log.file_path().is_none());
        assert!(Config::default().log.file_path().is_some());
    }

    #[test]
    fn test_unknown_backend_is_a_parse_error() {
        let result: Result<Config, _> = toml::from_str("[general]\nbackend = \"rocm\"\n");
        assert!(result.is_err());
    }
}
