//! Device access layer
//!
//! Trait-based abstractions over the GPU plus the two production backends:
//! `nvidia-smi` subprocesses and NVML.

pub mod nvml;
pub mod parse;
pub mod smi;
pub mod traits;

pub use self::nvml::NvmlBackend;
pub use smi::SmiBackend;
pub use traits::{Actuator, CapabilityProbe, TelemetrySource};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which transport to use for talking to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Spawn `nvidia-smi` for every query
    #[default]
    Smi,
    /// Call NVML directly
    Nvml,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Smi => write!(f, "nvidia-smi"),
            BackendKind::Nvml => write!(f, "NVML"),
        }
    }
}
