//! `EventSink` backed by `tracing`.

use msgq_env::{EventSink, Level, TraceEvent};
use tracing::{debug, info};

/// Forwards engine events to the `tracing` subscriber.
///
/// Put/get hand-offs go out at INFO, the rest at DEBUG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: TraceEvent) {
        let message_id = event.message_id.as_deref().unwrap_or("-");
        match event.level() {
            Level::Info => info!(
                time = event.time,
                process = %event.process,
                message_id,
                action = event.action.name(),
                "{}",
                event.action
            ),
            Level::Debug => debug!(
                time = event.time,
                process = %event.process,
                message_id,
                action = event.action.name(),
                "{}",
                event.action
            ),
        }
    }

    fn enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::INFO)
    }
}
