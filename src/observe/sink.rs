//! Observation sinks
//!
//! The control loop hands every tick record to a single sink; where records
//! end up (log, file, both) is decided by whoever builds the sink.

use super::record::{TickOutcome, TickRecord};
use std::io;

/// Destination for tick records
pub trait ObservationSink: Send {
    /// Consume one tick record
    fn observe(&mut self, record: &TickRecord) -> io::Result<()>;

    /// Sink name for identification
    fn name(&self) -> &str;

    /// Flush buffered output
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink writing records through the `log` facade
///
/// Applied and dry-run changes are logged at `info`, failures at `warn`,
/// samples and unchanged ticks at `debug`.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a new log sink
    pub fn new() -> Self {
        Self
    }
}

impl ObservationSink for LogSink {
    fn observe(&mut self, record: &TickRecord) -> io::Result<()> {
        match &record.outcome {
            TickOutcome::Applied { .. } | TickOutcome::DryRun { .. } => {
                log::info!("{}", record.summary())
            }
            TickOutcome::Unchanged => log::debug!("{}", record.summary()),
            TickOutcome::ActuationFailed { .. } | TickOutcome::SampleFailed { .. } => {
                log::warn!("{}", record.summary())
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Fans records out to several sinks
///
/// A failing sink is reported and skipped; the others still receive the record.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn ObservationSink>>,
}

impl MultiSink {
    /// Create an empty fan-out sink
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink
    pub fn add_sink(&mut self, sink: Box<dyn ObservationSink>) {
        self.sinks.push(sink);
    }

    /// Builder: add a sink
    pub fn with_sink(mut self, sink: Box<dyn ObservationSink>) -> Self {
        self.add_sink(sink);
        self
    }

}

impl ObservationSink for MultiSink {
    fn observe(&mut self, record: &TickRecord) -> io::Result<()> {
        for sink in &mut self.sinks {
            if let Err(e) = sink.observe(record) {
                log::warn!("Failed to record tick {} via {}: {}", record.tick, sink.name(), e);
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "multi"
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                log::warn!("Failed to flush {}: {}", sink.name(), e);
            }
        }
        Ok(())
    }
}
