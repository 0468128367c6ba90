//! Power domain types
//!
//! Integral power limits handed to actuators and the static power bounds a
//! device reports at startup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power limit in milliwatts (stored internally) but displayed as watts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PowerLimit(u32);

impl PowerLimit {
    /// Create a new power limit from watts
    pub const fn from_watts(watts: u32) -> Self {
        Self(watts * 1000)
    }

    /// Create a power limit from a fractional watt value
    ///
    /// Fractional watts are truncated; negative and NaN values become 0W.
    pub fn truncate_watts(watts: f64) -> Self {
        // `as` saturates: NaN and negatives map to 0
        Self::from_watts((watts.trunc() as u32).min(u32::MAX / 1000))
    }

    /// Get the power limit in watts
    #[inline]
    pub const fn as_watts(&self) -> u32 {
        self.0 / 1000
    }

    /// Get the power limit in milliwatts
    #[inline]
    pub const fn as_milliwatts(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PowerLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}W", self.as_watts())
    }
}

/// Static power bounds reported by the capability probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceBounds {
    /// Whether the driver lets us change the power limit
    pub is_manageable: bool,
    /// Lowest settable limit in watts
    pub min_limit: f64,
    /// Highest settable limit in watts
    pub max_limit: f64,
    /// Factory default limit in watts
    pub default_limit: f64,
}

impl DeviceBounds {
    /// Create new device bounds
    pub fn new(is_manageable: bool, min_limit: f64, max_limit: f64, default_limit: f64) -> Self {
        Self {
            is_manageable,
            min_limit,
            max_limit,
            default_limit,
        }
    }

    /// Ceiling the controller may raise the limit to
    ///
    /// Without overclocking the governor never goes above the factory default.
    pub fn ceiling(&self, overclock: bool) -> f64 {
        if overclock {
            self.max_limit
        } else {
            self.default_limit
        }
    }

    /// Check if a wattage is within the device range
    pub fn contains(&self, watts: f64) -> bool {
        watts >= self.min_limit && watts <= self.max_limit
    }
}

impl fmt::Display for DeviceBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0}W-{:.0}W (default: {:.0}W, manageable: {})",
            self.min_limit,
            self.max_limit,
            self.default_limit,
            if self.is_manageable { "yes" } else { "no" }
        )
    }
}
