//! Control loop
//!
//! Drives sample → decide → apply on a fixed cadence until cancelled.
//! Ticks never overlap: a slow tick delays the next one and any periods it
//! overran are dropped rather than queued.

use crate::device::{Actuator, TelemetrySource};
use crate::domain::{ControlConfig, PowerLimit, Sample};
use crate::error::{AppError, TelemetryError};
use crate::observe::{ObservationSink, TickOutcome, TickRecord};
use crate::services::controller::{PowerController, ProportionalController};
use crate::services::shutdown::ShutdownSignal;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default polling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Default polling interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(DEFAULT_INTERVAL_MS);

/// Configuration for the control loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between ticks
    pub interval: Duration,
    /// Controller bounds and intent
    pub control: ControlConfig,
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
    /// Stop with an error after this many failed samples in a row
    pub max_consecutive_failures: Option<u32>,
}

impl LoopConfig {
    /// Create a loop configuration that runs until cancelled
    pub fn new(control: ControlConfig, interval: Duration) -> Self {
        Self {
            interval,
            control,
            max_ticks: None,
            max_consecutive_failures: None,
        }
    }

    /// Builder: stop after `ticks` ticks
    pub fn with_max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Builder: escalate after `failures` failed samples in a row
    pub fn with_max_consecutive_failures(mut self, failures: Option<u32>) -> Self {
        self.max_consecutive_failures = failures;
        self
    }
}

/// Why a loop run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Shutdown was requested
    #[default]
    Cancelled,
    /// The configured tick budget ran out
    TickLimit,
}

/// Tally of tick outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoopSummary {
    pub ticks: u64,
    pub applied: u64,
    pub dry_run: u64,
    pub unchanged: u64,
    pub actuation_failures: u64,
    pub sample_failures: u64,
    pub stopped_by: StopReason,
}

impl LoopSummary {
    fn count(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Applied { .. } => self.applied += 1,
            TickOutcome::DryRun { .. } => self.dry_run += 1,
            TickOutcome::Unchanged => self.unchanged += 1,
            TickOutcome::ActuationFailed { .. } => self.actuation_failures += 1,
            TickOutcome::SampleFailed { .. } => self.sample_failures += 1,
        }
    }
}

/// Compute the next tick deadline after `prev`
///
/// Returns the deadline and the number of whole periods skipped because the
/// previous tick ran past them.
pub fn next_deadline(prev: Instant, interval: Duration, now: Instant) -> (Instant, u64) {
    let next = prev + interval;
    if interval.is_zero() || next >= now {
        return (next, 0);
    }

    let behind = now.duration_since(prev).as_nanos();
    let periods = behind / interval.as_nanos() + 1;
    let periods = u32::try_from(periods).unwrap_or(u32::MAX);
    (prev + interval.saturating_mul(periods), u64::from(periods) - 1)
}

/// Periodic power limit governor for one GPU
pub struct ControlLoop<T, A, C = ProportionalController> {
    config: LoopConfig,
    controller: C,
    telemetry: T,
    actuator: A,
    sink: Box<dyn ObservationSink>,
    consecutive_failures: u32,
    summary: LoopSummary,
}

impl<T, A, C> ControlLoop<T, A, C>
where
    T: TelemetrySource,
    A: Actuator,
    C: PowerController,
{
    /// Create a new control loop
    pub fn new(
        config: LoopConfig,
        controller: C,
        telemetry: T,
        actuator: A,
        sink: Box<dyn ObservationSink>,
    ) -> Self {
        Self {
            config,
            controller,
            telemetry,
            actuator,
            sink,
            consecutive_failures: 0,
            summary: LoopSummary::default(),
        }
    }

    /// Run one tick
    ///
    /// Per-tick failures are folded into the returned record. `Err` means the
    /// telemetry source is gone and the loop cannot continue.
    pub fn tick(&mut self) -> Result<TickRecord, TelemetryError> {
        let tick = self.summary.ticks + 1;
        let timestamp = Local::now();
        let gpu_index = self.config.control.gpu_index;

        let (record, fatal) = match self.telemetry.sample(gpu_index) {
            Ok(sample) => {
                self.consecutive_failures = 0;
                (self.decide_and_apply(tick, timestamp, sample), None)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                let record = TickRecord::sample_failed(tick, timestamp, gpu_index, &e);
                (record, e.is_fatal().then_some(e))
            }
        };

        self.summary.count(&record.outcome);
        if let Err(e) = self.sink.observe(&record) {
            log::warn!("Failed to record tick {} via {}: {}", tick, self.sink.name(), e);
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(record),
        }
    }

    fn decide_and_apply(
        &mut self,
        tick: u64,
        timestamp: DateTime<Local>,
        sample: Sample,
    ) -> TickRecord {
        let control = self.config.control;
        let decision = self.controller.decide(&control, &sample);

        let outcome = if !decision.changed {
            TickOutcome::Unchanged
        } else {
            let limit = PowerLimit::truncate_watts(decision.target_watts);

            if control.dry_run {
                TickOutcome::DryRun {
                    watts: limit.as_watts(),
                    min_limit: control.min_limit,
                    max_limit: control.max_limit,
                }
            } else {
                match self.actuator.set_limit(control.gpu_index, limit) {
                    Ok(()) => TickOutcome::Applied {
                        watts: limit.as_watts(),
                    },
                    Err(e) => TickOutcome::ActuationFailed {
                        watts: limit.as_watts(),
                        error: e.to_string(),
                    },
                }
            }
        };

        TickRecord {
            tick,
            timestamp,
            gpu_index: control.gpu_index,
            sample: Some(sample),
            decision: Some(decision),
            outcome,
        }
    }

    /// Run ticks until shutdown, the tick budget, or a fatal error
    pub fn run(&mut self, shutdown: &ShutdownSignal) -> Result<LoopSummary, AppError> {
        log::info!(
            "Starting control loop: {} every {:?}",
            self.config.control,
            self.config.interval
        );

        let result = self.run_inner(shutdown);

        if let Err(e) = self.sink.flush() {
            log::warn!("Failed to flush {}: {}", self.sink.name(), e);
        }

        match &result {
            Ok(summary) => log::info!(
                "Control loop stopped ({:?}) after {} ticks: {} applied, {} dry-run, {} failed",
                summary.stopped_by,
                summary.ticks,
                summary.applied,
                summary.dry_run,
                summary.actuation_failures + summary.sample_failures
            ),
            Err(e) => log::error!("Control loop stopped: {}", e),
        }

        result
    }

    fn run_inner(&mut self, shutdown: &ShutdownSignal) -> Result<LoopSummary, AppError> {
        let interval = self.config.interval;
        let mut deadline = Instant::now();

        loop {
            if shutdown.is_triggered() {
                self.summary.stopped_by = StopReason::Cancelled;
                return Ok(self.summary);
            }

            let now = Instant::now();
            if deadline > now && shutdown.wait_timeout(deadline - now) {
                self.summary.stopped_by = StopReason::Cancelled;
                return Ok(self.summary);
            }

            self.tick()?;

            if let Some(limit) = self.config.max_consecutive_failures {
                if limit > 0 && self.consecutive_failures >= limit {
                    return Err(AppError::TooManyFailures(self.consecutive_failures));
                }
            }

            if self
                .config
                .max_ticks
                .is_some_and(|max| self.summary.ticks >= max)
            {
                self.summary.stopped_by = StopReason::TickLimit;
                return Ok(self.summary);
            }

            let (next, skipped) = next_deadline(deadline, interval, Instant::now());
            if skipped > 0 {
                log::debug!("Tick overran its period; skipping {} tick(s)", skipped);
            }
            deadline = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceBounds;
    use crate::error::ActuationError;
    use crate::mock::{MemorySink, MockDevice};
    use std::thread;

    fn control(dry_run: bool) -> ControlConfig {
        let bounds = DeviceBounds::new(true, 100.0, 400.0, 300.0);
        ControlConfig::from_bounds(&bounds, 95, false, 0, dry_run).unwrap()
    }

    fn build(
        device: &MockDevice,
        config: LoopConfig,
    ) -> (ControlLoop<MockDevice, MockDevice>, MemorySink) {
        let sink = MemorySink::new();
        let control_loop = ControlLoop::new(
            config,
            ProportionalController::new(),
            device.clone(),
            device.clone(),
            Box::new(sink.clone()),
        );
        (control_loop, sink)
    }

    fn fast(dry_run: bool, ticks: u64) -> LoopConfig {
        LoopConfig::new(control(dry_run), Duration::from_millis(1)).with_max_ticks(Some(ticks))
    }

    #[test]
    fn test_loop_config_defaults() {
        let config = LoopConfig::new(control(false), DEFAULT_INTERVAL);
        assert_eq!(config.interval, Duration::from_secs(1));
        assert!(config.max_ticks.is_none());
        assert!(config.max_consecutive_failures.is_none());
    }

    #[test]
    fn test_tick_applies_change() {
        let device = MockDevice::new().with_utilization(50).with_power_limit(250.0);
        let (mut control_loop, sink) = build(&device, fast(false, 1));

        let record = control_loop.tick().unwrap();

        assert_eq!(record.outcome, TickOutcome::Applied { watts: 235 });
        assert_eq!(device.applied(), vec![PowerLimit::from_watts(235)]);
        assert_eq!(device.power_limit(), 235.0);
        assert_eq!(sink.records(), vec![record]);
    }

    #[test]
    fn test_tick_unchanged_at_convergence() {
        let device = MockDevice::new().with_utilization(99).with_power_limit(295.0);
        let (mut control_loop, _sink) = build(&device, fast(false, 2));

        let first = control_loop.tick().unwrap();
        let second = control_loop.tick().unwrap();

        assert_eq!(first.outcome, TickOutcome::Applied { watts: 300 });
        assert_eq!(second.outcome, TickOutcome::Unchanged);
        assert_eq!(device.applied().len(), 1);
    }

    #[test]
    fn test_dry_run_never_calls_actuator() {
        let device = MockDevice::new().with_utilization(50).with_power_limit(250.0);
        let (mut control_loop, sink) = build(&device, fast(true, 5));

        let summary = control_loop.run(&ShutdownSignal::new()).unwrap();

        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.dry_run, 5);
        assert!(device.applied().is_empty());
        assert_eq!(device.power_limit(), 250.0);
        for record in sink.records() {
            assert_eq!(
                record.outcome,
                TickOutcome::DryRun {
                    watts: 235,
                    min_limit: 100.0,
                    max_limit: 300.0
                }
            );
        }
    }

    #[test]
    fn test_loop_walks_limit_down_when_idle() {
        let device = MockDevice::new().with_utilization(0).with_power_limit(300.0);
        let (mut control_loop, _sink) = build(&device, fast(false, 10));

        let summary = control_loop.run(&ShutdownSignal::new()).unwrap();

        // 30W per tick from 300W to the 100W floor, then hold
        let watts: Vec<u32> = device.applied().iter().map(|l| l.as_watts()).collect();
        assert_eq!(watts, vec![270, 240, 210, 180, 150, 120, 100]);
        assert_eq!(summary.unchanged, 3);
        assert_eq!(summary.stopped_by, StopReason::TickLimit);
    }

    #[test]
    fn test_fractional_ceiling_converges() {
        let bounds = DeviceBounds::new(true, 100.0, 299.6, 299.6);
        let control = ControlConfig::from_bounds(&bounds, 95, false, 0, false).unwrap();
        let config =
            LoopConfig::new(control, Duration::from_millis(1)).with_max_ticks(Some(5));
        let device = MockDevice::new()
            .with_bounds(bounds)
            .with_utilization(100)
            .with_power_limit(290.0);
        let (mut control_loop, _sink) = build(&device, config);

        let summary = control_loop.run(&ShutdownSignal::new()).unwrap();

        assert_eq!(summary.actuation_failures, 0);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.unchanged, 4);
        assert_eq!(device.applied(), vec![PowerLimit::from_watts(299)]);
    }

    #[test]
    fn test_sample_failure_is_not_fatal() {
        let device = MockDevice::new().with_utilization(50).with_power_limit(250.0);
        device.push_sample(Err(TelemetryError::NoSample(0)));
        let (mut control_loop, sink) = build(&device, fast(false, 2));

        let summary = control_loop.run(&ShutdownSignal::new()).unwrap();

        let records = sink.records();
        assert!(matches!(records[0].outcome, TickOutcome::SampleFailed { .. }));
        assert!(records[0].sample.is_none());
        assert_eq!(records[1].outcome, TickOutcome::Applied { watts: 235 });
        assert_eq!(summary.sample_failures, 1);
    }

    #[test]
    fn test_unavailable_telemetry_stops_loop() {
        let device = MockDevice::new();
        device.push_sample(Err(TelemetryError::Unavailable("no such file".into())));
        let (mut control_loop, sink) = build(&device, fast(false, 10));

        let err = control_loop.run(&ShutdownSignal::new()).unwrap_err();

        assert!(matches!(err, AppError::Telemetry(TelemetryError::Unavailable(_))));
        assert_eq!(sink.records().len(), 1);
        assert_eq!(device.sample_calls(), 1);
    }

    #[test]
    fn test_actuation_failure_is_reported_and_loop_continues() {
        let device = MockDevice::new().with_utilization(50).with_power_limit(250.0);
        device.fail_actuation(ActuationError::Rejected("Insufficient Permissions".into()));
        let (mut control_loop, sink) = build(&device, fast(false, 3));

        let summary = control_loop.run(&ShutdownSignal::new()).unwrap();

        assert_eq!(summary.actuation_failures, 3);
        assert_eq!(device.power_limit(), 250.0);
        match &sink.records()[0].outcome {
            TickOutcome::ActuationFailed { watts, error } => {
                assert_eq!(*watts, 235);
                assert!(error.contains("Insufficient Permissions"));
            }
            other => panic!("Expected ActuationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_consecutive_failures_escalate() {
        let device = MockDevice::new();
        for _ in 0..3 {
            device.push_sample(Err(TelemetryError::CommandFailed("exit 9".into())));
        }
        let config = fast(false, 10).with_max_consecutive_failures(Some(3));
        let (mut control_loop, _sink) = build(&device, config);

        let err = control_loop.run(&ShutdownSignal::new()).unwrap_err();
        assert!(matches!(err, AppError::TooManyFailures(3)));
    }

    #[test]
    fn test_successful_sample_resets_failure_streak() {
        let device = MockDevice::new().with_utilization(50).with_power_limit(250.0);
        device.push_sample(Err(TelemetryError::NoSample(0)));
        device.push_sample(Ok(Sample::new(50.0, 100.0, 50, 250.0)));
        device.push_sample(Err(TelemetryError::NoSample(0)));
        let config = fast(false, 4).with_max_consecutive_failures(Some(2));
        let (mut control_loop, _sink) = build(&device, config);

        let summary = control_loop.run(&ShutdownSignal::new()).unwrap();
        assert_eq!(summary.sample_failures, 2);
        assert_eq!(summary.ticks, 4);
    }

    #[test]
    fn test_cancelled_before_start_runs_no_ticks() {
        let device = MockDevice::new();
        let (mut control_loop, sink) = build(&device, fast(false, 10));

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let summary = control_loop.run(&shutdown).unwrap();

        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.stopped_by, StopReason::Cancelled);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_cancellation_interrupts_wait() {
        let device = MockDevice::new();
        let config = LoopConfig::new(control(true), Duration::from_secs(60));
        let (mut control_loop, _sink) = build(&device, config);

        let shutdown = ShutdownSignal::new();
        let remote = shutdown.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.trigger();
        });

        let start = Instant::now();
        let summary = control_loop.run(&shutdown).unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.stopped_by, StopReason::Cancelled);
        handle.join().unwrap();
    }

    #[test]
    fn test_ticks_are_paced_by_interval() {
        let device = MockDevice::new();
        let config =
            LoopConfig::new(control(true), Duration::from_millis(20)).with_max_ticks(Some(3));
        let (mut control_loop, _sink) = build(&device, config);

        let start = Instant::now();
        control_loop.run(&ShutdownSignal::new()).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_next_deadline_on_time() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let (next, skipped) = next_deadline(start, interval, start + Duration::from_millis(10));
        assert_eq!(next, start + interval);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_next_deadline_skips_overrun_periods() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let (next, skipped) = next_deadline(start, interval, start + Duration::from_millis(250));
        assert_eq!(next, start + Duration::from_millis(300));
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_next_deadline_exact_boundary() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let (next, skipped) = next_deadline(start, interval, start + interval);
        assert_eq!(next, start + interval);
        assert_eq!(skipped, 0);
    }
}
