//! Telemetry sample domain type

use serde::{Deserialize, Serialize};
use std::fmt;

/// One telemetry snapshot of a GPU
///
/// Produced fresh on every tick and never retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// GPU core temperature in Celsius
    pub temperature: f64,
    /// Current power draw in watts
    pub power_draw: f64,
    /// GPU utilization percentage (0-100)
    pub utilization: u8,
    /// Currently enforced power limit in watts
    pub power_limit: f64,
}

impl Sample {
    /// Create a new sample, capping utilization at 100%
    pub fn new(temperature: f64, power_draw: f64, utilization: u8, power_limit: f64) -> Self {
        Self {
            temperature,
            power_draw,
            utilization: utilization.min(100),
            power_limit,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0}°C {:.1}W util={}% limit={:.0}W",
            self.temperature, self.power_draw, self.utilization, self.power_limit
        )
    }
}
