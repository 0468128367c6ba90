//! Parsers for `nvidia-smi` CSV output
//!
//! Both queries use `--format=csv,noheader,nounits`, so every line is a plain
//! comma-separated record. Lines with the wrong field count are skipped since
//! the tool may emit blank or banner lines; unparseable numbers degrade to 0
//! with a warning instead of failing the tick.

use crate::domain::{DeviceBounds, Sample};
use crate::error::CapabilityError;

/// Fields in a telemetry record
pub const SAMPLE_FIELDS: usize = 4;

/// Fields in a capability record
pub const BOUNDS_FIELDS: usize = 4;

/// Query string for per-tick telemetry, in [`parse_sample_line`] field order
pub const SAMPLE_QUERY: &str = "temperature.gpu,power.draw,utilization.gpu,power.limit";

/// Query string for the capability probe, in [`parse_bounds`] field order
pub const BOUNDS_QUERY: &str =
    "power.management,power.min_limit,power.max_limit,power.default_limit";

/// Parse a numeric field, falling back to 0 on garbage like `[N/A]`
pub fn parse_field(raw: &str, name: &str) -> f64 {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Error parsing {} from '{}': {}", name, trimmed, e);
            0.0
        }
    }
}

/// Parse a utilization field into a whole percentage
///
/// Fractional values are truncated and the result is capped to 0-100.
pub fn parse_utilization(raw: &str) -> u8 {
    let value = parse_field(raw, "utilization");
    value.trunc().clamp(0.0, 100.0) as u8
}

/// Parse one `temperature, power draw, utilization, power limit` line
///
/// Returns `None` for lines that don't have exactly four fields.
pub fn parse_sample_line(line: &str) -> Option<Sample> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != SAMPLE_FIELDS {
        if !line.trim().is_empty() {
            log::debug!("Skipping telemetry line with {} fields: {:?}", fields.len(), line);
        }
        return None;
    }

    Some(Sample::new(
        parse_field(fields[0], "temperature"),
        parse_field(fields[1], "power draw"),
        parse_utilization(fields[2]),
        parse_field(fields[3], "power limit"),
    ))
}

/// Parse every well-formed sample line in `output`
pub fn parse_samples(output: &str) -> Vec<Sample> {
    output.lines().filter_map(parse_sample_line).collect()
}

/// Whether a `power.management` value means the limit can be changed
pub fn is_manageable_state(state: &str) -> bool {
    let state = state.trim();
    state.eq_ignore_ascii_case("Supported") || state.eq_ignore_ascii_case("Enabled")
}

/// Parse the capability probe output
pub fn parse_bounds(output: &str) -> Result<DeviceBounds, CapabilityError> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| CapabilityError::Malformed("empty output".to_string()))?;

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != BOUNDS_FIELDS {
        return Err(CapabilityError::Malformed(format!(
            "expected {} fields, got {}: {:?}",
            BOUNDS_FIELDS,
            fields.len(),
            line
        )));
    }

    Ok(DeviceBounds::new(
        is_manageable_state(fields[0]),
        parse_field(fields[1], "min power limit"),
        parse_field(fields[2], "max power limit"),
        parse_field(fields[3], "default power limit"),
    ))
}
