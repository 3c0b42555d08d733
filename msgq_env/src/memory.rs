//! In-memory sink that records every event.

use crate::sink::{Action, EventSink, TraceEvent};
use crate::types::SimTime;
use std::sync::{Arc, Mutex};

/// Sink that keeps every event in order of emission.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// simulation and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.lock().clone()
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Events emitted by one process, in order.
    pub fn for_process(&self, process: &str) -> Vec<TraceEvent> {
        self.lock()
            .iter()
            .filter(|e| e.process == process)
            .cloned()
            .collect()
    }

    /// Message ids of every event matching `action`, in order.
    pub fn message_ids(&self, action: &Action) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| &e.action == action)
            .filter_map(|e| e.message_id.clone())
            .collect()
    }

    /// Times of every recorded event, in emission order.
    pub fn times(&self) -> Vec<SimTime> {
        self.lock().iter().map(|e| e.time).collect()
    }

    /// Drops everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TraceEvent>> {
        // A poisoned buffer still holds valid events.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: TraceEvent) {
        self.lock().push(event);
    }
}
