//! gpuleaf - utilization-driven GPU power limit governor
//!
//! This library samples an NVIDIA GPU on a fixed cadence, runs a
//! proportional control law over its utilization and applies the resulting
//! power limit, through either `nvidia-smi` or NVML.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`device`]: Telemetry, probe and actuator backends
//! - [`domain`]: Domain models with validation
//! - [`error`]: Error types
//! - [`observe`]: Tick records and their sinks
//! - [`services`]: Controller, control loop and shutdown

pub mod cli;
pub mod commands;
pub mod config;
pub mod device;
pub mod domain;
pub mod error;
pub mod observe;
pub mod services;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
