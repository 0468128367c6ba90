//! Status command implementation
//!
//! Shows probed power bounds and one telemetry sample.

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::cli::output::{print_output, DeviceStatus};
use crate::commands::{smi_backend, with_backend_args};
use crate::config::ConfigBuilder;
use crate::device::{BackendKind, CapabilityProbe, NvmlBackend, TelemetrySource};
use crate::error::Result;

/// Execute the status command
pub fn run_status(args: &StatusArgs, builder: ConfigBuilder, format: OutputFormat) -> Result<()> {
    let config = with_backend_args(builder, &args.backend).build()?;
    let gpu_index = config.gpu.index;
    let backend_name = config.general.backend.to_string();

    let status = match config.general.backend {
        BackendKind::Smi => device_status(&smi_backend(&config.general), gpu_index, backend_name)?,
        BackendKind::Nvml => device_status(&NvmlBackend::new()?, gpu_index, backend_name)?,
    };

    print_output(&status, format)?;
    Ok(())
}

/// Collect bounds and a sample from `backend`
///
/// A failed probe is an error; a failed sample is reported in the status.
pub fn device_status<B>(backend: &B, gpu_index: u32, backend_name: String) -> Result<DeviceStatus>
where
    B: TelemetrySource + CapabilityProbe,
{
    let bounds = backend.probe(gpu_index)?;

    let (sample, sample_error) = match backend.sample(gpu_index) {
        Ok(sample) => (Some(sample), None),
        Err(e) => {
            log::warn!("Failed to sample GPU {}: {}", gpu_index, e);
            (None, Some(e.to_string()))
        }
    };

    Ok(DeviceStatus {
        gpu_index,
        backend: backend_name,
        bounds,
        sample,
        sample_error,
    })
}
