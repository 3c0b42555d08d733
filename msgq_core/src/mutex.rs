//! Priority-ordered mutual exclusion.
//!
//! Strict priority: a steady stream of numerically smaller priorities can
//! starve larger ones indefinitely.

use msgq_env::ProcessId;
use std::collections::BTreeMap;

/// Capacity-1 resource granted by priority, then arrival order.
///
/// Lower numeric priority is served first.
#[derive(Debug, Clone, Default)]
pub struct PriorityMutex {
    holder: Option<ProcessId>,

    /// Waiters keyed by (priority, arrival sequence)
    waiters: BTreeMap<(i64, u64), ProcessId>,

    next_arrival: u64,
    grants: u64,
}

impl PriorityMutex {
    /// Creates an unheld mutex.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the mutex for `process`.
    ///
    /// Returns true if granted immediately. Otherwise the process is queued
    /// and will be returned by a later `release`.
    pub fn acquire(&mut self, process: ProcessId, priority: i64) -> bool {
        if self.holder.is_none() {
            self.holder = Some(process);
            self.grants += 1;
            return true;
        }

        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.waiters.insert((priority, arrival), process);
        false
    }

    /// Releases the mutex from its current holder.
    ///
    /// Hands it to the best waiter and returns that waiter, or leaves the
    /// mutex unheld and returns `None`. Callers check the holder first.
    pub fn release(&mut self) -> Option<ProcessId> {
        self.holder = self.waiters.pop_first().map(|(_, next)| next);
        if self.holder.is_some() {
            self.grants += 1;
        }
        self.holder
    }

    /// Current holder, if any.
    pub fn holder(&self) -> Option<ProcessId> {
        self.holder
    }

    /// True while someone holds the mutex.
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    /// Number of queued acquirers.
    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Total grants so far.
    pub fn grants(&self) -> u64 {
        self.grants
    }
}
