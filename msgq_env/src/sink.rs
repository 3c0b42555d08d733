//! Event sink interface for engine observability.

use crate::types::SimTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The interface through which the engine reports what it does.
///
/// This trait replaces any global logging configuration: the event loop and
/// every process receive a sink at construction and emit into it.
///
/// # Implementations
///
/// - **Discard**: `NullSink` - drops everything
/// - **Testing**: `MemorySink` - records events for later inspection
/// - **Production**: the driver's `TracingSink` - forwards to `tracing`
pub trait EventSink: Send + Sync {
    /// Records a single event.
    fn record(&self, event: TraceEvent);

    /// Returns false when the sink drops everything.
    ///
    /// Emitters may skip building events when this is false.
    fn enabled(&self) -> bool {
        true
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NullSink {
    /// Creates an Arc-wrapped null sink.
    pub fn shared() -> SharedSink {
        Arc::new(NullSink)
    }
}

impl EventSink for NullSink {
    fn record(&self, _event: TraceEvent) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Sink that forwards every event to several others.
#[derive(Clone, Default)]
pub struct TeeSink {
    sinks: Vec<SharedSink>,
}

impl TeeSink {
    /// Creates a tee over the given sinks.
    pub fn new(sinks: Vec<SharedSink>) -> Self {
        Self { sinks }
    }

    /// Adds another destination.
    pub fn with(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for TeeSink {
    fn record(&self, event: TraceEvent) {
        for sink in self.sinks.iter().filter(|s| s.enabled()) {
            sink.record(event.clone());
        }
    }

    fn enabled(&self) -> bool {
        self.sinks.iter().any(|s| s.enabled())
    }
}

/// Severity of an action, mapped onto the backend's levels by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
}

/// What a process (or the loop) did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Process was resumed for the first time.
    Started,

    /// Process suspended until the given time.
    Waiting { until: SimTime },

    /// Token bucket refilled; `tokens` is the new balance.
    Refilled { tokens: u64 },

    /// Not enough tokens to send; waiting for the next refill.
    Throttled { tokens: u64, needed: u64 },

    /// Tokens debited for a message; `tokens` is the remaining balance.
    Debited { tokens: u64 },

    /// Requested the mutex at the given priority.
    Acquiring { priority: i64 },

    /// Mutex granted.
    Acquired,

    /// Mutex released.
    Released,

    /// Asked the queue to accept a message.
    Putting,

    /// Message accepted by the queue.
    Put,

    /// Asked the queue for a message.
    Getting,

    /// Message received from the queue.
    Got,

    /// Finished processing a message.
    Processed,
}

impl Action {
    /// Returns a short stable name for the action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Started => "started",
            Action::Waiting { .. } => "waiting",
            Action::Refilled { .. } => "refilled",
            Action::Throttled { .. } => "throttled",
            Action::Debited { .. } => "debited",
            Action::Acquiring { .. } => "acquiring",
            Action::Acquired => "acquired",
            Action::Released => "released",
            Action::Putting => "putting",
            Action::Put => "put",
            Action::Getting => "getting",
            Action::Got => "got",
            Action::Processed => "processed",
        }
    }

    /// Returns the severity the action is reported at.
    ///
    /// Queue hand-offs are the interesting part of a trace; everything else
    /// is debug detail.
    pub fn level(&self) -> Level {
        match self {
            Action::Put | Action::Got | Action::Started => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Waiting { until } => write!(f, "waiting until t={}", until),
            Action::Refilled { tokens } => write!(f, "refilled to {} tokens", tokens),
            Action::Throttled { tokens, needed } => {
                write!(f, "throttled ({}/{} tokens)", tokens, needed)
            }
            Action::Debited { tokens } => write!(f, "debited, {} tokens left", tokens),
            Action::Acquiring { priority } => write!(f, "acquiring (priority {})", priority),
            other => f.write_str(other.name()),
        }
    }
}

/// A single structured event: who did what, when, to which message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Virtual time of the event
    pub time: SimTime,

    /// Name of the emitting process
    pub process: String,

    /// What happened
    pub action: Action,

    /// Message involved, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl TraceEvent {
    /// Creates an event without a message.
    pub fn new(time: SimTime, process: impl Into<String>, action: Action) -> Self {
        Self {
            time,
            process: process.into(),
            action,
            message_id: None,
        }
    }

    /// Attaches a message id.
    pub fn with_message(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Returns the event's severity.
    pub fn level(&self) -> Level {
        self.action.level()
    }
}
