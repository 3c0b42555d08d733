//! Run summary and JSON export.
//!
//! Exports the counters of a finished run for scripts and dashboards.

use msgq_core::{ConsumerStats, ProducerStats};
use msgq_env::SimTime;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Counters of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimReport {
    /// Configured horizon
    pub horizon: SimTime,

    /// Virtual time when the report was taken
    pub final_time: SimTime,

    /// Events dispatched by the loop
    pub dispatched: u64,

    /// Queue capacity
    pub queue_capacity: usize,

    /// Messages still in the queue
    pub queue_resident: usize,

    /// Largest queue length observed
    pub queue_high_water: usize,

    /// Producers parked on a full queue
    pub blocked_putters: usize,

    /// Times the mutex was granted
    pub mutex_grants: u64,

    /// Per-producer counters, in spawn order
    pub producers: Vec<ProducerStats>,

    /// Per-consumer counters, in spawn order
    pub consumers: Vec<ConsumerStats>,
}

impl SimReport {
    /// Creates an empty report.
    pub fn new(horizon: SimTime, final_time: SimTime) -> Self {
        Self {
            horizon,
            final_time,
            dispatched: 0,
            queue_capacity: 0,
            queue_resident: 0,
            queue_high_water: 0,
            blocked_putters: 0,
            mutex_grants: 0,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Messages accepted by the queue.
    pub fn total_put(&self) -> u64 {
        self.producers.iter().map(|p| p.put_count).sum()
    }

    /// Messages taken from the queue.
    pub fn total_get(&self) -> u64 {
        self.consumers.iter().map(|c| c.get_count).sum()
    }

    /// Units produced across all producers, saturating at `u64::MAX`.
    pub fn units_produced(&self) -> u64 {
        self.producers.iter().fold(0u64, |acc, p| acc.saturating_add(p.unit_count))
    }

    /// Units fully processed across all consumers.
    pub fn units_consumed(&self) -> u64 {
        self.consumers.iter().fold(0u64, |acc, c| acc.saturating_add(c.unit_count))
    }

    /// Looks up a producer by name.
    pub fn producer(&self, name: &str) -> Option<&ProducerStats> {
        self.producers.iter().find(|p| p.name == name)
    }

    /// Looks up a consumer by name.
    pub fn consumer(&self, name: &str) -> Option<&ConsumerStats> {
        self.consumers.iter().find(|c| c.name == name)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Human-readable summary, one line per entry.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "t={} | put={} get={} | queue {}/{} (peak {}) | {} events",
            self.final_time,
            self.total_put(),
            self.total_get(),
            self.queue_resident,
            self.queue_capacity,
            self.queue_high_water,
            self.dispatched,
        )];

        for p in &self.producers {
            let bucket = match &p.bucket {
                Some(b) => format!(" | tokens={} spent={} refills={}", b.tokens, b.spent, b.refills),
                None => String::new(),
            };
            lines.push(format!(
                "  {} (priority {}): {} puts, {} units{}",
                p.name, p.priority, p.put_count, p.unit_count, bucket
            ));
        }
        for c in &self.consumers {
            lines.push(format!("  {}: {} gets, {} units", c.name, c.get_count, c.unit_count));
        }
        lines
    }
}
