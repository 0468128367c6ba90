//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::device::BackendKind;
use crate::error::ConfigError;
use crate::observe::RecordFormat;

use std::path::PathBuf;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// An explicit path must load; without one the default locations are
    /// searched and missing files are fine.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with CLI dry-run flag
    pub fn with_dry_run(mut self, dry_run: Option<bool>) -> Self {
        if let Some(d) = dry_run {
            self.config.general.dry_run = d;
        }
        self
    }

    /// Override with CLI interval
    pub fn with_interval_ms(mut self, interval: Option<u64>) -> Self {
        if let Some(i) = interval {
            self.config.general.interval_ms = i;
        }
        self
    }

    /// Override with CLI backend
    pub fn with_backend(mut self, backend: Option<BackendKind>) -> Self {
        if let Some(b) = backend {
            self.config.general.backend = b;
        }
        self
    }

    /// Override with CLI nvidia-smi path
    pub fn with_smi_path(mut self, path: Option<String>) -> Self {
        if let Some(p) = path {
            self.config.general.smi_path = p;
        }
        self
    }

    /// Override with CLI GPU index
    pub fn with_gpu_index(mut self, index: Option<u32>) -> Self {
        if let Some(i) = index {
            self.config.gpu.index = i;
        }
        self
    }

    /// Override with CLI utilization threshold
    pub fn with_threshold(mut self, threshold: Option<u32>) -> Self {
        if let Some(t) = threshold {
            self.config.control.threshold = t;
        }
        self
    }

    /// Override with CLI overclock flag
    pub fn with_overclock(mut self, overclock: Option<bool>) -> Self {
        if let Some(o) = overclock {
            self.config.control.overclock = o;
        }
        self
    }

    /// Override with CLI failure escalation limit
    pub fn with_max_consecutive_failures(mut self, failures: Option<u32>) -> Self {
        if let Some(f) = failures {
            self.config.control.max_consecutive_failures = Some(f);
        }
        self
    }

    /// Override with CLI console logging flag
    pub fn with_stdout(mut self, stdout: Option<bool>) -> Self {
        if let Some(s) = stdout {
            self.config.log.stdout = s;
        }
        self
    }

    /// Override with CLI log file
    pub fn with_log_file(mut self, file: Option<PathBuf>) -> Self {
        if let Some(f) = file {
            self.config.log.file = Some(f);
        }
        self
    }

    /// Disable the log file
    pub fn without_log_file(mut self, disable: bool) -> Self {
        if disable {
            self.config.log.file = None;
        }
        self
    }

    /// Override with CLI log format
    pub fn with_log_format(mut self, format: Option<RecordFormat>) -> Self {
        if let Some(f) = format {
            self.config.log.format = f;
        }
        self
    }

    /// Validate and build the final configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
