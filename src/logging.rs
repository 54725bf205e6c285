// src/logging.rs
//
// Telemetry sinks for the dispatcher.
// - EventSink:  trait called once per dispatch cycle
// - NoopSink:   discards all events
// - FileSink:   writes one JSON object per cycle (JSONL) for offline analysis
// - MemorySink: keeps records in memory (tests, trace inspection)

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{Action, ItemId, StateLabel};

/// Everything that happened in one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// 1-based cycle counter.
    pub cycle: u64,
    /// Virtual clock after the slice was applied.
    pub clock: f64,
    pub state: StateLabel,
    pub action: Action,
    /// Quantum after `action` was applied.
    pub quantum: u32,
    pub item_id: ItemId,
    pub slice: f64,
    /// Remaining cost of the dispatched item after the slice.
    pub remaining_cost: f64,
    /// Whether the dispatched item finished this cycle.
    pub completed: bool,
    /// Ready queue length at the end of the cycle.
    pub queue_len: usize,
    /// Mean wait over all items at the end of the cycle.
    pub mean_wait: f64,
    pub next_state: StateLabel,
    pub reward: f64,
}

/// Abstract sink for per-cycle telemetry.
pub trait EventSink {
    fn log_cycle(&mut self, record: &CycleRecord);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_cycle(&mut self, _record: &CycleRecord) {
        // intentionally no-op
    }
}

/// JSONL file sink.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create (truncate) `path` and write records to it.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl EventSink for FileSink {
    fn log_cycle(&mut self, record: &CycleRecord) {
        // Telemetry must never abort a simulation, so I/O errors are dropped.
        if serde_json::to_writer(&mut self.writer, record).is_ok() {
            let _ = self.writer.write_all(b"\n");
        }
        let _ = self.writer.flush();
    }
}

/// In-memory sink.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<CycleRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }
}

impl EventSink for MemorySink {
    fn log_cycle(&mut self, record: &CycleRecord) {
        self.records.push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cycle: u64) -> CycleRecord {
        CycleRecord {
            cycle,
            clock: 2.0 * cycle as f64,
            state: StateLabel::Low,
            action: Action::Keep,
            quantum: 2,
            item_id: ItemId::from("A"),
            slice: 2.0,
            remaining_cost: 0.0,
            completed: true,
            queue_len: 0,
            mean_wait: 1.0,
            next_state: StateLabel::Low,
            reward: -1.0,
        }
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.log_cycle(&sample(1));
        sink.log_cycle(&sample(2));
        let cycles: Vec<u64> = sink.records().iter().map(|r| r.cycle).collect();
        assert_eq!(cycles, vec![1, 2]);
    }

    #[test]
    fn file_sink_writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");

        {
            let mut sink = FileSink::create(&path).unwrap();
            sink.log_cycle(&sample(1));
            sink.log_cycle(&sample(2));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: CycleRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, sample(1));

        let raw: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(raw["state"], "LOW");
        assert_eq!(raw["action"], "KEEP");
        assert_eq!(raw["item_id"], "A");
    }
}
