//! Tick observation
//!
//! Structured per-tick records and the sinks that receive them.

pub mod file;
pub mod record;
pub mod sink;

pub use file::{FileSink, RecordFormat, DEFAULT_LOG_FILE};
pub use record::{TickOutcome, TickRecord};
pub use sink::{LogSink, MultiSink, ObservationSink};
