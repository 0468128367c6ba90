//! Trait definitions for device access
//!
//! These traits separate the control loop from the transport used to talk
//! to the GPU, allowing fakes in tests and alternative backends in production.

use crate::domain::{DeviceBounds, PowerLimit, Sample};
use crate::error::{ActuationError, CapabilityError, TelemetryError};

/// Read-only per-tick telemetry
pub trait TelemetrySource: Send {
    /// Take one telemetry snapshot of the GPU at `gpu_index`
    ///
    /// Returns [`TelemetryError::Unavailable`] only when the sampling
    /// mechanism itself cannot be used; every other error is per-tick.
    fn sample(&self, gpu_index: u32) -> Result<Sample, TelemetryError>;
}

/// Static capability query, run once at startup
pub trait CapabilityProbe {
    /// Query the power bounds of the GPU at `gpu_index`
    fn probe(&self, gpu_index: u32) -> Result<DeviceBounds, CapabilityError>;

    /// Query the bounds and fail unless the device is power-manageable
    fn probe_manageable(&self, gpu_index: u32) -> Result<DeviceBounds, CapabilityError> {
        let bounds = self.probe(gpu_index)?;
        if !bounds.is_manageable {
            return Err(CapabilityError::NotManageable(gpu_index));
        }
        Ok(bounds)
    }
}

/// Power limit writer
pub trait Actuator: Send {
    /// Apply `limit` to the GPU at `gpu_index`
    fn set_limit(&mut self, gpu_index: u32, limit: PowerLimit) -> Result<(), ActuationError>;
}

impl<T: TelemetrySource + ?Sized> TelemetrySource for Box<T> {
    fn sample(&self, gpu_index: u32) -> Result<Sample, TelemetryError> {
        (**self).sample(gpu_index)
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_limit(&mut self, gpu_index: u32, limit: PowerLimit) -> Result<(), ActuationError> {
        (**self).set_limit(gpu_index, limit)
    }
}
