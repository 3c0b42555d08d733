//! msgq Environment Abstraction Layer
//!
//! This crate holds everything the simulation engine shares with the outside
//! world without depending on any concrete backend:
//! - Virtual time and identifier types (`SimTime`, `ProcessId`, ...)
//! - The `EventSink` interface through which the engine reports what it does
//! - The error taxonomy (`SimError`)
//!
//! # Core Concept: Injected Observability
//!
//! The engine never logs on its own. Every process and the event loop are
//! handed an `EventSink` at construction and emit `TraceEvent`s into it.
//! The driver decides whether those end up in `tracing`, in memory for a
//! test, or nowhere at all.
//!
//! # Example
//!
//! ```
//! use msgq_env::{Action, EventSink, MemorySink, TraceEvent};
//!
//! let sink = MemorySink::new();
//! sink.record(TraceEvent::new(0, "producer_0", Action::Started));
//! assert_eq!(sink.len(), 1);
//! ```

mod error;
mod memory;
mod sink;
mod types;

pub use error::SimError;
pub use memory::MemorySink;
pub use sink::{EventSink, Level, NullSink, SharedSink, TeeSink};
pub use sink::{Action, TraceEvent};
pub use types::{MutexId, ProcessId, QueueId, SimTime};
