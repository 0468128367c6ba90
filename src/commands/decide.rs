//! Decide command implementation
//!
//! Evaluates the control law once for hand-supplied inputs.

use crate::cli::args::{DecideArgs, OutputFormat};
use crate::cli::output::{print_output, DecisionReport};
use crate::domain::{ControlConfig, Sample};
use crate::error::Result;
use crate::services::{PowerController, ProportionalController};

/// Execute the decide command
pub fn run_decide(args: &DecideArgs, format: OutputFormat) -> Result<()> {
    let report = evaluate(args)?;
    print_output(&report, format)?;
    Ok(())
}

/// Run the controller on the given inputs
pub fn evaluate(args: &DecideArgs) -> Result<DecisionReport> {
    let config = ControlConfig::new(args.min, args.max, args.threshold, 0, true)?;
    let sample = Sample::new(0.0, 0.0, args.utilization, args.limit);
    let decision = ProportionalController::new().decide(&config, &sample);

    Ok(DecisionReport {
        config,
        utilization: sample.utilization,
        current_limit: args.limit,
        raw_target: ProportionalController::raw_target(&config, &sample),
        decision,
    })
}
