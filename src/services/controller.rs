//! Power limit controller
//!
//! Maps one telemetry sample to the next power limit setpoint.

use crate::domain::{ControlConfig, Decision, Sample};

/// Fraction of the ceiling a single tick may move the limit
const GAIN_DIVISOR: f64 = 10.0;

/// A control law the loop can drive
///
/// Implementations must be memoryless: the decision depends only on the
/// configuration and the current sample.
pub trait PowerController: Send {
    /// Compute the next setpoint for `sample`
    fn decide(&self, config: &ControlConfig, sample: &Sample) -> Decision;
}

/// Proportional step controller around a utilization threshold
///
/// Below the threshold the limit drops by a step proportional to idle time;
/// at or above it the limit rises by a step proportional to utilization. One
/// step is at most a tenth of the ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalController;

impl ProportionalController {
    /// Create a new controller
    pub fn new() -> Self {
        Self
    }

    /// Unclamped, unrounded target for `sample`
    pub fn raw_target(config: &ControlConfig, sample: &Sample) -> f64 {
        let base = config.max_limit / GAIN_DIVISOR;
        let utilization = f64::from(sample.utilization);

        if sample.utilization < config.threshold {
            sample.power_limit - base * (100.0 - utilization) / 100.0
        } else {
            sample.power_limit + base * utilization / 100.0
        }
    }
}

/// Round half-up to a whole watt
fn round_half_up(watts: f64) -> f64 {
    (watts + 0.5).floor()
}

impl PowerController for ProportionalController {
    fn decide(&self, config: &ControlConfig, sample: &Sample) -> Decision {
        // A zero ceiling leaves no room to steer
        if !(config.max_limit > 0.0) {
            return Decision::unchanged(config.clamp(sample.power_limit));
        }

        // Whole watts that fit inside the configured range
        let floor = config.min_limit.ceil();
        let ceiling = config.max_limit.floor();
        if !(floor <= ceiling) {
            return Decision::unchanged(config.clamp(sample.power_limit));
        }

        let target = round_half_up(Self::raw_target(config, sample))
            .max(floor)
            .min(ceiling);

        if target == sample.power_limit {
            Decision::unchanged(target)
        } else {
            Decision::change(target)
        }
    }
}
