//! NVML backend
//!
//! Talks to the driver through `nvml-wrapper` instead of spawning processes.
//! Device handles are looked up per call, so a backend can be cloned freely
//! and shared between the telemetry and actuator halves of a control loop.

use crate::device::traits::{Actuator, CapabilityProbe, TelemetrySource};
use crate::domain::{DeviceBounds, PowerLimit, Sample};
use crate::error::{ActuationError, CapabilityError, NvmlError, TelemetryError};

use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::{Device, Nvml};
use std::sync::Arc;

/// NVML-based device backend
#[derive(Clone)]
pub struct NvmlBackend {
    nvml: Arc<Nvml>,
}

impl NvmlBackend {
    /// Initialize NVML and create a new backend
    pub fn new() -> Result<Self, NvmlError> {
        let nvml = Nvml::init().map_err(|e| match e {
            nvml_wrapper::error::NvmlError::LibloadingError(_) => NvmlError::LibraryNotFound,
            nvml_wrapper::error::NvmlError::DriverNotLoaded => {
                NvmlError::InitializationFailed("NVIDIA driver not loaded".to_string())
            }
            other => NvmlError::InitializationFailed(other.to_string()),
        })?;

        Ok(Self {
            nvml: Arc::new(nvml),
        })
    }

    fn device(&self, index: u32) -> Result<Device<'_>, NvmlError> {
        self.nvml.device_by_index(index).map_err(|e| match e {
            nvml_wrapper::error::NvmlError::NotFound
            | nvml_wrapper::error::NvmlError::InvalidArg => NvmlError::DeviceNotFound(index),
            other => convert_error(other),
        })
    }
}

/// Convert NVML error to our error type
fn convert_error(err: nvml_wrapper::error::NvmlError) -> NvmlError {
    use nvml_wrapper::error::NvmlError as NE;
    match err {
        NE::NotSupported => {
            NvmlError::NotSupported("Operation not supported by this GPU".to_string())
        }
        NE::NoPermission => {
            NvmlError::InsufficientPermissions("Insufficient permissions".to_string())
        }
        NE::GpuLost => NvmlError::GpuLost,
        NE::Uninitialized => NvmlError::InitializationFailed("NVML not initialized".to_string()),
        NE::InvalidArg => NvmlError::InvalidArgument("Invalid argument".to_string()),
        _ => NvmlError::Unknown(err.to_string()),
    }
}

fn milliwatts_to_watts(mw: u32) -> f64 {
    f64::from(mw) / 1000.0
}

impl TelemetrySource for NvmlBackend {
    fn sample(&self, gpu_index: u32) -> Result<Sample, TelemetryError> {
        let device = self.device(gpu_index)?;

        let temperature = device
            .temperature(TemperatureSensor::Gpu)
            .map_err(convert_error)?;
        let power_draw = device.power_usage().map_err(convert_error)?;
        let utilization = device.utilization_rates().map_err(convert_error)?;
        let power_limit = device.power_management_limit().map_err(convert_error)?;

        Ok(Sample::new(
            f64::from(temperature),
            milliwatts_to_watts(power_draw),
            utilization.gpu.min(100) as u8,
            milliwatts_to_watts(power_limit),
        ))
    }
}

impl CapabilityProbe for NvmlBackend {
    fn probe(&self, gpu_index: u32) -> Result<DeviceBounds, CapabilityError> {
        let device = self.device(gpu_index)?;

        let constraints = match device.power_management_limit_constraints() {
            Ok(constraints) => constraints,
            Err(nvml_wrapper::error::NvmlError::NotSupported) => {
                log::debug!("GPU {} reports no power limit constraints", gpu_index);
                return Ok(DeviceBounds::new(false, 0.0, 0.0, 0.0));
            }
            Err(e) => return Err(convert_error(e).into()),
        };

        let default = match device.power_management_limit_default() {
            Ok(mw) => mw,
            Err(nvml_wrapper::error::NvmlError::NotSupported) => constraints.max_limit,
            Err(e) => return Err(convert_error(e).into()),
        };

        Ok(DeviceBounds::new(
            true,
            milliwatts_to_watts(constraints.min_limit),
            milliwatts_to_watts(constraints.max_limit),
            milliwatts_to_watts(default),
        ))
    }
}

impl Actuator for NvmlBackend {
    fn set_limit(&mut self, gpu_index: u32, limit: PowerLimit) -> Result<(), ActuationError> {
        let mut device = self.device(gpu_index)?;
        device
            .set_power_management_limit(limit.as_milliwatts())
            .map_err(|e| convert_error(e).into())
    }
}
