//! Mock implementations for testing
//!
//! Provides a mock GPU and an in-memory observation sink for unit testing
//! without real hardware.

use crate::device::{Actuator, CapabilityProbe, TelemetrySource};
use crate::domain::{DeviceBounds, PowerLimit, Sample};
use crate::error::{ActuationError, CapabilityError, TelemetryError};
use crate::observe::{ObservationSink, TickRecord};

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct MockState {
    bounds: DeviceBounds,
    probe_error: Option<CapabilityError>,
    temperature: f64,
    power_draw: f64,
    utilization: u8,
    power_limit: f64,
    scripted: VecDeque<Result<Sample, TelemetryError>>,
    sample_calls: usize,
    applied: Vec<PowerLimit>,
    actuation_error: Option<ActuationError>,
}

/// Mock GPU device for testing
///
/// Clones share state, so one clone can serve as the telemetry source and
/// another as the actuator of the same loop. Applied limits feed back into
/// later samples.
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    /// Create a new mock device with default values
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                bounds: DeviceBounds::new(true, 100.0, 400.0, 300.0),
                probe_error: None,
                temperature: 45.0,
                power_draw: 150.0,
                utilization: 50,
                power_limit: 300.0,
                scripted: VecDeque::new(),
                sample_calls: 0,
                applied: Vec::new(),
                actuation_error: None,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder: set power bounds
    pub fn with_bounds(self, bounds: DeviceBounds) -> Self {
        self.state().bounds = bounds;
        self
    }

    /// Builder: set utilization
    pub fn with_utilization(self, utilization: u8) -> Self {
        self.set_utilization(utilization);
        self
    }

    /// Builder: set current power limit
    pub fn with_power_limit(self, watts: f64) -> Self {
        self.state().power_limit = watts;
        self
    }

    /// Set the mock utilization
    pub fn set_utilization(&self, utilization: u8) {
        self.state().utilization = utilization;
    }

    /// Queue a canned sample result, returned before the live values
    pub fn push_sample(&self, sample: Result<Sample, TelemetryError>) {
        self.state().scripted.push_back(sample);
    }

    /// Make every probe fail with `err`
    pub fn fail_probe(&self, err: CapabilityError) {
        self.state().probe_error = Some(err);
    }

    /// Make every actuation fail with `err`
    pub fn fail_actuation(&self, err: ActuationError) {
        self.state().actuation_error = Some(err);
    }

    /// Current power limit in watts
    pub fn power_limit(&self) -> f64 {
        self.state().power_limit
    }

    /// Limits applied so far, in order
    pub fn applied(&self) -> Vec<PowerLimit> {
        self.state().applied.clone()
    }

    /// Number of sample requests served
    pub fn sample_calls(&self) -> usize {
        self.state().sample_calls
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for MockDevice {
    fn sample(&self, _gpu_index: u32) -> Result<Sample, TelemetryError> {
        let mut state = self.state();
        state.sample_calls += 1;

        if let Some(scripted) = state.scripted.pop_front() {
            return scripted;
        }

        Ok(Sample::new(
            state.temperature,
            state.power_draw,
            state.utilization,
            state.power_limit,
        ))
    }
}

impl CapabilityProbe for MockDevice {
    fn probe(&self, _gpu_index: u32) -> Result<DeviceBounds, CapabilityError> {
        let state = self.state();
        match &state.probe_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.bounds),
        }
    }
}

impl Actuator for MockDevice {
    fn set_limit(&mut self, _gpu_index: u32, limit: PowerLimit) -> Result<(), ActuationError> {
        let mut state = self.state();

        if let Some(err) = &state.actuation_error {
            return Err(err.clone());
        }

        let watts = f64::from(limit.as_watts());
        if !state.bounds.contains(watts) {
            return Err(ActuationError::Rejected(format!(
                "Power limit {} out of range",
                limit
            )));
        }

        state.applied.push(limit);
        state.power_limit = watts;
        Ok(())
    }
}

/// Observation sink collecting records in memory
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to the loop.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TickRecord>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Records observed so far
    pub fn records(&self) -> Vec<TickRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ObservationSink for MemorySink {
    fn observe(&mut self, record: &TickRecord) -> io::Result<()> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
