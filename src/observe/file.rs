//! Append-only log file sink

use super::record::TickRecord;
use super::sink::ObservationSink;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "gpu_leaf.log";

/// Line format for file records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// Timestamped human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Sink appending records to a file
///
/// Every record is flushed as soon as it is written and the buffer is flushed
/// again on drop, so the file is complete on every exit path.
pub struct FileSink {
    path: PathBuf,
    format: RecordFormat,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) `path` for appending
    pub fn open<P: AsRef<Path>>(path: P, format: RecordFormat) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        log::debug!("Appending tick records to {}", path.display());

        Ok(Self {
            path,
            format,
            writer: BufWriter::new(file),
        })
    }

    fn render(&self, record: &TickRecord) -> io::Result<String> {
        match self.format {
            RecordFormat::Text => Ok(record.to_string()),
            RecordFormat::Json => serde_json::to_string(record).map_err(io::Error::from),
        }
    }
}

impl ObservationSink for FileSink {
    fn observe(&mut self, record: &TickRecord) -> io::Result<()> {
        let line = self.render(record)?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()
    }

    fn name(&self) -> &str {
        "file"
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decision, Sample};
    use crate::observe::TickOutcome;
    use chrono::Local;

    fn record(tick: u64) -> TickRecord {
        TickRecord {
            tick,
            timestamp: Local::now(),
            gpu_index: 0,
            sample: Some(Sample::new(55.0, 120.0, 50, 250.0)),
            decision: Some(Decision::change(235.0)),
            outcome: TickOutcome::Applied { watts: 235 },
        }
    }

    #[test]
    fn test_text_records_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.log");
        std::fs::write(&path, "existing line\n").unwrap();

        {
            let mut sink = FileSink::open(&path, RecordFormat::Text).unwrap();
            sink.observe(&record(1)).unwrap();
            sink.observe(&record(2)).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing line");
        assert!(lines[1].ends_with("-> set 235W"));
    }

    #[test]
    fn test_json_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.jsonl");

        let mut sink = FileSink::open(&path, RecordFormat::Json).unwrap();
        sink.observe(&record(7)).unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: TickRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.tick, 7);
        assert_eq!(parsed.outcome, TickOutcome::Applied { watts: 235 });
    }

    #[test]
    fn test_open_fails_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("leaf.log");
        assert!(FileSink::open(path, RecordFormat::Text).is_err());
    }
}
