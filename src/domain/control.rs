//! Control configuration and decision types
//!
//! [`ControlConfig`] is built once from the probed [`DeviceBounds`] and the
//! operator's intent, then stays immutable for the life of the process.

use crate::domain::DeviceBounds;
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default utilization threshold in percent
pub const DEFAULT_THRESHOLD: u8 = 95;

/// Bounds and intent the controller works within
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Lowest limit the controller may set, in watts
    pub min_limit: f64,
    /// Effective ceiling in watts (device default or device max)
    pub max_limit: f64,
    /// Utilization percentage at or above which the limit is raised
    pub threshold: u8,
    /// GPU index this configuration controls
    pub gpu_index: u32,
    /// Report changes without applying them
    pub dry_run: bool,
}

impl ControlConfig {
    /// Create a validated control configuration
    pub fn new(
        min_limit: f64,
        max_limit: f64,
        threshold: u32,
        gpu_index: u32,
        dry_run: bool,
    ) -> Result<Self, DomainError> {
        if threshold > 100 {
            return Err(DomainError::InvalidThreshold(threshold));
        }
        // Written negated so NaN bounds are rejected too
        if !(min_limit <= max_limit) {
            return Err(DomainError::InvalidPowerRange {
                min: min_limit,
                max: max_limit,
            });
        }

        Ok(Self {
            min_limit,
            max_limit,
            threshold: threshold as u8,
            gpu_index,
            dry_run,
        })
    }

    /// Build the configuration from probed bounds
    ///
    /// `overclock` selects the device max instead of the default limit as the
    /// effective ceiling.
    pub fn from_bounds(
        bounds: &DeviceBounds,
        threshold: u32,
        overclock: bool,
        gpu_index: u32,
        dry_run: bool,
    ) -> Result<Self, DomainError> {
        Self::new(
            bounds.min_limit,
            bounds.ceiling(overclock),
            threshold,
            gpu_index,
            dry_run,
        )
    }

    /// Clamp a wattage into the configured range
    pub fn clamp(&self, watts: f64) -> f64 {
        // max/min rather than f64::clamp, which panics on an inverted range
        watts.max(self.min_limit).min(self.max_limit)
    }
}

impl fmt::Display for ControlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPU[{}] range {:.0}W-{:.0}W, threshold {}%{}",
            self.gpu_index,
            self.min_limit,
            self.max_limit,
            self.threshold,
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

/// Outcome of one controller evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Setpoint in whole watts
    pub target_watts: f64,
    /// Whether the setpoint differs from the current limit
    pub changed: bool,
}

impl Decision {
    /// A decision to move the limit to `target_watts`
    pub fn change(target_watts: f64) -> Self {
        Self {
            target_watts,
            changed: true,
        }
    }

    /// A decision to leave the limit where it is
    pub fn unchanged(target_watts: f64) -> Self {
        Self {
            target_watts,
            changed: false,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changed {
            write!(f, "-> {:.0}W", self.target_watts)
        } else {
            write!(f, "hold {:.0}W", self.target_watts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_bounds_without_overclock() {
        let bounds = DeviceBounds::new(true, 100.0, 400.0, 300.0);
        let config = ControlConfig::from_bounds(&bounds, 95, false, 0, false).unwrap();
        assert_eq!(config.min_limit, 100.0);
        assert_eq!(config.max_limit, 300.0);
        assert_eq!(config.threshold, 95);
    }

    #[test]
    fn test_config_from_bounds_with_overclock() {
        let bounds = DeviceBounds::new(true, 100.0, 400.0, 300.0);
        let config = ControlConfig::from_bounds(&bounds, 80, true, 1, true).unwrap();
        assert_eq!(config.max_limit, 400.0);
        assert_eq!(config.gpu_index, 1);
        assert!(config.dry_run);
    }

    #[test]
    fn test_config_rejects_threshold_over_100() {
        let err = ControlConfig::new(100.0, 300.0, 101, 0, false).unwrap_err();
        assert_eq!(err, DomainError::InvalidThreshold(101));
    }

    #[test]
    fn test_config_rejects_inverted_range() {
        assert!(ControlConfig::new(300.0, 100.0, 95, 0, false).is_err());
        assert!(ControlConfig::new(f64::NAN, 100.0, 95, 0, false).is_err());
    }

    #[test]
    fn test_config_accepts_degenerate_range() {
        let config = ControlConfig::new(0.0, 0.0, 95, 0, false).unwrap();
        assert_eq!(config.clamp(250.0), 0.0);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::change(235.0).to_string(), "-> 235W");
        assert_eq!(Decision::unchanged(100.0).to_string(), "hold 100W");
    }
}
