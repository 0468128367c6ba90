//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::domain::{ControlConfig, Decision, DeviceBounds, Sample};
use crate::services::{LoopSummary, StopReason};

use serde::Serialize;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// Probed bounds plus, when available, one live sample
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub gpu_index: u32,
    pub backend: String,
    pub bounds: DeviceBounds,
    pub sample: Option<Sample>,
    pub sample_error: Option<String>,
}

impl TableDisplay for DeviceStatus {
    fn to_table(&self) -> String {
        let mut output = format!("[{}] via {}\n", self.gpu_index, self.backend);
        output.push_str(&format!(
            "  Power Management: {}\n",
            if self.bounds.is_manageable {
                "Supported"
            } else {
                "Not Supported"
            }
        ));
        output.push_str(&format!(
            "  Range: {:.0}W - {:.0}W\n  Default: {:.0}W\n",
            self.bounds.min_limit, self.bounds.max_limit, self.bounds.default_limit
        ));

        match (&self.sample, &self.sample_error) {
            (Some(sample), _) => {
                output.push_str(&format!("  Temperature: {:.0}°C\n", sample.temperature));
                output.push_str(&format!("  Power Draw: {:.1}W\n", sample.power_draw));
                output.push_str(&format!("  Utilization: {}%\n", sample.utilization));
                output.push_str(&format!("  Power Limit: {:.0}W\n", sample.power_limit));
            }
            (None, Some(err)) => output.push_str(&format!("  Telemetry: {}\n", err)),
            (None, None) => {}
        }

        output
    }

    fn to_compact(&self) -> String {
        match &self.sample {
            Some(sample) => format!("GPU {}: {} [{}]", self.gpu_index, sample, self.bounds),
            None => format!("GPU {}: [{}]", self.gpu_index, self.bounds),
        }
    }
}

/// Result of an offline controller evaluation
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub config: ControlConfig,
    pub utilization: u8,
    pub current_limit: f64,
    pub raw_target: f64,
    pub decision: Decision,
}

impl TableDisplay for DecisionReport {
    fn to_table(&self) -> String {
        let action = if self.decision.changed {
            format!(
                "Change limit {:.0}W -> {:.0}W",
                self.current_limit, self.decision.target_watts
            )
        } else {
            format!("Keep limit at {:.0}W", self.current_limit)
        };

        format!(
            "Range: {:.0}W - {:.0}W (threshold {}%)\n  \
             Utilization: {}%\n  Raw Target: {:.2}W\n  {}",
            self.config.min_limit,
            self.config.max_limit,
            self.config.threshold,
            self.utilization,
            self.raw_target,
            action
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "util={}% limit={:.0}W {}",
            self.utilization, self.current_limit, self.decision
        )
    }
}

impl TableDisplay for LoopSummary {
    fn to_table(&self) -> String {
        let reason = match self.stopped_by {
            StopReason::Cancelled => "cancelled",
            StopReason::TickLimit => "tick limit reached",
        };
        format!(
            "Stopped: {}\n  Ticks: {}\n  Applied: {}\n  Dry Run: {}\n  Unchanged: {}\n  \
             Actuation Failures: {}\n  Sample Failures: {}",
            reason,
            self.ticks,
            self.applied,
            self.dry_run,
            self.unchanged,
            self.actuation_failures,
            self.sample_failures
        )
    }

    fn to_compact(&self) -> String {
        format!(
            "{} ticks: {} applied, {} dry-run, {} unchanged, {} failed",
            self.ticks,
            self.applied,
            self.dry_run,
            self.unchanged,
            self.actuation_failures + self.sample_failures
        )
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}
