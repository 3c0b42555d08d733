//! Common types for the msgq environment abstraction.

use serde::{Deserialize, Serialize};

/// Virtual clock value, in ticks since the start of the run.
///
/// Unrelated to wall-clock time. Never moves backward within a run.
pub type SimTime = u64;

/// Handle to a process registered with an event loop.
///
/// Ids are dense indices assigned in registration order, which also makes
/// them a stable tie-break for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub usize);

/// Handle to a bounded queue owned by an event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(pub usize);

/// Handle to a priority mutex owned by an event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutexId(pub usize);

impl ProcessId {
    /// Returns the raw index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid#{}", self.0)
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

impl std::fmt::Display for MutexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mutex#{}", self.0)
    }
}
