//! Configuration file loading
//!
//! Handles loading configuration from TOML files.

use crate::config::Config;
use crate::error::ConfigError;

use std::io;
use std::path::{Path, PathBuf};

/// Configuration file handler
pub struct ConfigFile;

impl ConfigFile {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::FileNotFound(path.display().to_string()),
            _ => ConfigError::ReadFailed {
                path: path.display().to_string(),
                source: e,
            },
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Option<Config> {
        Self::load_first(&Self::default_paths())
    }

    /// Load the first usable file among `paths`
    ///
    /// Missing files are passed over silently; a file that exists but fails
    /// to load is reported and skipped.
    pub fn load_first(paths: &[PathBuf]) -> Option<Config> {
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Get default configuration file paths
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System-wide config
        paths.push(PathBuf::from("/etc/gpuleaf/config.toml"));

        // User config
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("gpuleaf").join("config.toml"));
        }

        // Current directory
        paths.push(PathBuf::from("gpuleaf.toml"));

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_paths_not_empty() {
        let paths = ConfigFile::default_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths[0], PathBuf::from("/etc/gpuleaf/config.toml"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigFile::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gpu]\nindex = 2\n\n[control]\nthreshold = 70").unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.gpu.index, 2);
        assert_eq!(config.control.threshold, 70);
    }

    #[test]
    fn test_load_unreadable_file_keeps_cause() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();

        let result = ConfigFile::load(file.path());
        match result {
            Err(ConfigError::ReadFailed { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("Expected ReadFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_load_first_skips_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let valid = dir.path().join("valid.toml");
        std::fs::write(&broken, "[control\nthreshold = ").unwrap();
        std::fs::write(&valid, "[control]\nthreshold = 60\n").unwrap();

        let config = ConfigFile::load_first(&[broken, valid]).unwrap();
        assert_eq!(config.control.threshold, 60);
    }

    #[test]
    fn test_load_first_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let valid = dir.path().join("valid.toml");
        std::fs::write(&valid, "[gpu]\nindex = 2\n").unwrap();

        let config = ConfigFile::load_first(&[missing.clone(), valid]).unwrap();
        assert_eq!(config.gpu.index, 2);
        assert!(ConfigFile::load_first(&[missing]).is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[control\nthreshold = ").unwrap();

        let result = ConfigFile::load(file.path());
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }
}
