//! Run command implementation
//!
//! Probes the GPU once, then drives the governor loop until Ctrl-C, the tick
//! budget, or a fatal telemetry error.

use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::output::{print_output, Message};
use crate::commands::{smi_backend, with_backend_args};
use crate::config::{Config, ConfigBuilder, LogConfig};
use crate::device::{Actuator, BackendKind, CapabilityProbe, NvmlBackend, TelemetrySource};
use crate::domain::ControlConfig;
use crate::error::Result;
use crate::observe::{FileSink, LogSink, MultiSink, ObservationSink};
use crate::services::{
    ControlLoop, LoopConfig, LoopSummary, ProportionalController, ShutdownSignal,
};

/// Execute the run command
pub fn run_governor(args: &RunArgs, builder: ConfigBuilder, format: OutputFormat) -> Result<()> {
    let config = with_backend_args(builder, &args.backend)
        .with_interval_ms(args.interval_ms)
        .with_threshold(args.threshold)
        .with_overclock(args.overclock.then_some(true))
        .with_log_file(args.log_file.clone())
        .without_log_file(args.no_log_file)
        .with_stdout(args.quiet.then_some(false))
        .with_log_format(args.log_format.map(Into::into))
        .with_max_consecutive_failures(args.max_failures)
        .build()?;

    log::debug!("Effective configuration: {:?}", config);

    let shutdown = ShutdownSignal::new();
    shutdown.install_ctrlc_handler()?;

    let summary = match config.general.backend {
        BackendKind::Smi => {
            let backend = smi_backend(&config.general);
            govern(&config, args.ticks, backend, &shutdown, format)?
        }
        BackendKind::Nvml => {
            let backend = NvmlBackend::new()?;
            govern(&config, args.ticks, backend, &shutdown, format)?
        }
    };

    print_output(&summary, format)?;
    Ok(())
}

/// Probe the device and run the governor loop on `backend`
///
/// Refuses to start on a device whose power limit cannot be managed.
pub fn govern<B>(
    config: &Config,
    max_ticks: Option<u64>,
    backend: B,
    shutdown: &ShutdownSignal,
    format: OutputFormat,
) -> Result<LoopSummary>
where
    B: TelemetrySource + CapabilityProbe + Actuator + Clone,
{
    let gpu_index = config.gpu.index;
    let bounds = backend.probe_manageable(gpu_index)?;
    log::info!("GPU[{}] power bounds: {}", gpu_index, bounds);

    let control = ControlConfig::from_bounds(
        &bounds,
        config.control.threshold,
        config.control.overclock,
        gpu_index,
        config.general.dry_run,
    )?;

    print_output(
        &Message {
            message: format!("Governing {}", control),
            success: true,
        },
        format,
    )?;

    let loop_config = LoopConfig::new(control, config.interval())
        .with_max_ticks(max_ticks)
        .with_max_consecutive_failures(config.control.max_consecutive_failures);

    let mut control_loop = ControlLoop::new(
        loop_config,
        ProportionalController::new(),
        backend.clone(),
        backend,
        build_sink(&config.log)?,
    );

    control_loop.run(shutdown)
}

/// Build the record sink described by the log configuration
pub fn build_sink(log: &LogConfig) -> Result<Box<dyn ObservationSink>> {
    let mut sink = MultiSink::new();

    if log.stdout {
        sink.add_sink(Box::new(LogSink::new()));
    }
    if let Some(path) = log.file_path() {
        sink.add_sink(Box::new(FileSink::open(path, log.format)?));
    }

    Ok(Box::new(sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceBounds, PowerLimit};
    use crate::error::{AppError, CapabilityError};
    use crate::mock::MockDevice;
    use crate::observe::RecordFormat;
    use crate::services::StopReason;

    fn config(dry_run: bool) -> Config {
        let mut config = Config::default();
        config.general.interval_ms = 1;
        config.general.dry_run = dry_run;
        config.log.stdout = false;
        config.log.file = None;
        config
    }

    #[test]
    fn test_govern_applies_limits() {
        let device = MockDevice::new().with_utilization(0);
        let summary = govern(
            &config(false),
            Some(2),
            device.clone(),
            &ShutdownSignal::new(),
            OutputFormat::Compact,
        )
        .unwrap();

        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.stopped_by, StopReason::TickLimit);
        // 300 - 30 = 270, then 270 - 30 = 240 (ceiling is the 300W default)
        assert_eq!(
            device.applied(),
            vec![PowerLimit::from_watts(270), PowerLimit::from_watts(240)]
        );
    }

    #[test]
    fn test_govern_dry_run_leaves_device_alone() {
        let device = MockDevice::new().with_utilization(0);
        let summary = govern(
            &config(true),
            Some(3),
            device.clone(),
            &ShutdownSignal::new(),
            OutputFormat::Compact,
        )
        .unwrap();

        assert_eq!(summary.dry_run, 3);
        assert!(device.applied().is_empty());
        assert_eq!(device.power_limit(), 300.0);
    }

    #[test]
    fn test_govern_refuses_unmanageable_device() {
        let device = MockDevice::new().with_bounds(DeviceBounds::new(false, 0.0, 0.0, 0.0));
        let result = govern(
            &config(false),
            Some(1),
            device.clone(),
            &ShutdownSignal::new(),
            OutputFormat::Compact,
        );

        assert!(matches!(
            result,
            Err(AppError::Capability(CapabilityError::NotManageable(0)))
        ));
        assert_eq!(device.sample_calls(), 0);
    }

    #[test]
    fn test_govern_stops_when_cancelled() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let device = MockDevice::new();
        let summary = govern(&config(false), None, device.clone(), &shutdown, OutputFormat::Compact)
            .unwrap();

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.stopped_by, StopReason::Cancelled);
    }

    #[test]
    fn test_build_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.log");
        let log = LogConfig {
            stdout: true,
            file: Some(path.clone()),
            format: RecordFormat::Json,
        };

        let mut sink = build_sink(&log).unwrap();
        let record = crate::observe::TickRecord::sample_failed(1, chrono::Local::now(), 0, "x");
        sink.observe(&record).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"sample_failed\""));
    }

    #[test]
    fn test_build_sink_bad_path_fails() {
        let log = LogConfig {
            stdout: false,
            file: Some("/nonexistent/gpuleaf/leaf.log".into()),
            format: RecordFormat::Text,
        };
        assert!(build_sink(&log).is_err());
    }
}
