//! Per-tick observation records

use crate::domain::{Decision, Sample};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the loop did with one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The new limit was written to the device
    Applied { watts: u32 },
    /// A change was computed but dry-run mode kept it off the device
    DryRun {
        watts: u32,
        min_limit: f64,
        max_limit: f64,
    },
    /// The controller had converged; nothing to do
    Unchanged,
    /// The actuator refused or failed to apply the limit
    ActuationFailed { watts: u32, error: String },
    /// No sample could be acquired this tick
    SampleFailed { error: String },
}

impl TickOutcome {
    /// Whether the tick ended in an error
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TickOutcome::ActuationFailed { .. } | TickOutcome::SampleFailed { .. }
        )
    }
}

/// Everything observable about one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// 1-based tick counter
    pub tick: u64,
    /// When the tick started
    pub timestamp: DateTime<Local>,
    /// GPU the tick ran against
    pub gpu_index: u32,
    /// Telemetry, if acquisition succeeded
    pub sample: Option<Sample>,
    /// Controller output, if a sample was available
    pub decision: Option<Decision>,
    /// Result of the tick
    pub outcome: TickOutcome,
}

impl TickRecord {
    /// Record for a tick whose sample could not be acquired
    pub fn sample_failed(
        tick: u64,
        timestamp: DateTime<Local>,
        gpu_index: u32,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            tick,
            timestamp,
            gpu_index,
            sample: None,
            decision: None,
            outcome: TickOutcome::SampleFailed {
                error: error.to_string(),
            },
        }
    }

    /// Human-readable summary without timestamp
    pub fn summary(&self) -> String {
        let head = match &self.sample {
            Some(sample) => format!("GPU[{}] {}", self.gpu_index, sample),
            None => format!("GPU[{}]", self.gpu_index),
        };

        match &self.outcome {
            TickOutcome::Applied { watts } => format!("{} -> set {}W", head, watts),
            TickOutcome::DryRun {
                watts,
                min_limit,
                max_limit,
            } => format!(
                "[DRY RUN] {} -> would set {}W (min={:.0}W, max={:.0}W)",
                head, watts, min_limit, max_limit
            ),
            TickOutcome::Unchanged => match &self.decision {
                Some(decision) => format!("{} {}", head, decision),
                None => head,
            },
            TickOutcome::ActuationFailed { watts, error } => {
                format!("{} -> failed to set {}W: {}", head, watts, error)
            }
            TickOutcome::SampleFailed { error } => format!("{} sample failed: {}", head, error),
        }
    }
}

impl fmt::Display for TickRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.timestamp.format("%Y/%m/%d %H:%M:%S"),
            self.summary()
        )
    }
}
