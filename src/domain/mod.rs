//! Domain models for gpuleaf
//!
//! This module contains all domain types with validation.
//! Types are validated on construction (fail-fast pattern).

pub mod control;
pub mod power;
pub mod sample;

pub use control::{ControlConfig, Decision, DEFAULT_THRESHOLD};
pub use power::{DeviceBounds, PowerLimit};
pub use sample::Sample;
