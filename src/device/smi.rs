//! `nvidia-smi` backend
//!
//! Drives the vendor command-line tool for telemetry, capability probing and
//! power limit changes. Each call spawns one short-lived process.

use crate::device::parse::{self, BOUNDS_QUERY, SAMPLE_QUERY};
use crate::device::traits::{Actuator, CapabilityProbe, TelemetrySource};
use crate::domain::{DeviceBounds, PowerLimit, Sample};
use crate::error::{ActuationError, CapabilityError, TelemetryError};

use std::io;
use std::process::{Command, Output};

/// Default program name, resolved through `PATH`
pub const DEFAULT_PROGRAM: &str = "nvidia-smi";

const CSV_FORMAT: &str = "--format=csv,noheader,nounits";

/// Backend invoking `nvidia-smi`
#[derive(Debug, Clone)]
pub struct SmiBackend {
    program: String,
    leading_args: Vec<String>,
}

impl SmiBackend {
    /// Create a backend running `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Insert fixed arguments before every query
    ///
    /// Lets the tool be wrapped, e.g. program `sudo` with `["nvidia-smi"]`.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    fn run(&self, args: &[String]) -> io::Result<Output> {
        log::trace!("Running {} {:?} {:?}", self.program, self.leading_args, args);
        Command::new(&self.program)
            .args(&self.leading_args)
            .args(args)
            .output()
    }

    fn query_args(gpu_index: u32, query: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            gpu_index.to_string(),
            format!("--query-gpu={}", query),
            CSV_FORMAT.to_string(),
        ]
    }

    fn launch_error(&self, err: io::Error) -> String {
        format!("failed to run '{}': {}", self.program, err)
    }
}

/// Best human-readable reason for a failed invocation
fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let text = if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        stdout.trim().to_string()
    };

    if text.is_empty() {
        output.status.to_string()
    } else {
        format!("{} ({})", text, output.status)
    }
}

impl TelemetrySource for SmiBackend {
    fn sample(&self, gpu_index: u32) -> Result<Sample, TelemetryError> {
        let output = self
            .run(&Self::query_args(gpu_index, SAMPLE_QUERY))
            .map_err(|e| TelemetryError::Unavailable(self.launch_error(e)))?;

        if !output.status.success() {
            return Err(TelemetryError::CommandFailed(failure_reason(&output)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse::parse_samples(&stdout)
            .into_iter()
            .next()
            .ok_or(TelemetryError::NoSample(gpu_index))
    }
}

impl CapabilityProbe for SmiBackend {
    fn probe(&self, gpu_index: u32) -> Result<DeviceBounds, CapabilityError> {
        let output = self
            .run(&Self::query_args(gpu_index, BOUNDS_QUERY))
            .map_err(|e| CapabilityError::Unavailable(self.launch_error(e)))?;

        if !output.status.success() {
            return Err(CapabilityError::Unavailable(failure_reason(&output)));
        }

        parse::parse_bounds(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Actuator for SmiBackend {
    fn set_limit(&mut self, gpu_index: u32, limit: PowerLimit) -> Result<(), ActuationError> {
        let args = vec![
            "-i".to_string(),
            gpu_index.to_string(),
            "-pl".to_string(),
            limit.as_watts().to_string(),
        ];

        let output = self
            .run(&args)
            .map_err(|e| ActuationError::Unavailable(self.launch_error(e)))?;

        if !output.status.success() {
            return Err(ActuationError::Rejected(failure_reason(&output)));
        }

        Ok(())
    }
}
