//! Queue consumer.

use crate::process::{Context, Process, ProcessReport, Suspend, Wake};
use msgq_env::{Action, QueueId, SimError};
use serde::{Deserialize, Serialize};

/// Counters a consumer exposes after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub name: String,
    pub get_count: u64,
    pub unit_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumerState {
    Idle,
    Getting,
    Processing,
}

/// Takes messages off the queue and spends `duration` ticks on each.
///
/// Never touches the mutex.
#[derive(Debug)]
pub struct Consumer {
    name: String,
    queue: QueueId,
    state: ConsumerState,
    current_id: Option<String>,
    get_count: u64,
    unit_count: u64,
}

impl Consumer {
    /// Creates a consumer reading from `queue`.
    pub fn new(name: impl Into<String>, queue: QueueId) -> Self {
        Self {
            name: name.into(),
            queue,
            state: ConsumerState::Idle,
            current_id: None,
            get_count: 0,
            unit_count: 0,
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            name: self.name.clone(),
            get_count: self.get_count,
            unit_count: self.unit_count,
        }
    }

    fn dequeue(&mut self, ctx: &Context<'_>) -> Suspend {
        ctx.emit(Action::Getting);
        self.state = ConsumerState::Getting;
        Suspend::Dequeue { queue: self.queue }
    }
}

impl Process for Consumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut Context<'_>, wake: Wake) -> Result<Suspend, SimError> {
        match (self.state, wake) {
            (ConsumerState::Idle, Wake::Start) => {
                ctx.emit(Action::Started);
                Ok(self.dequeue(ctx))
            }

            (ConsumerState::Getting, Wake::Dequeued(message)) => {
                self.get_count += 1;
                ctx.accumulate(&mut self.unit_count, message.duration, "unit count")?;
                ctx.emit_message(Action::Got, &message.id);

                let until = ctx.after(message.duration)?;
                ctx.emit_message(Action::Waiting { until }, &message.id);
                self.current_id = Some(message.id);
                self.state = ConsumerState::Processing;
                Ok(Suspend::WaitUntil(until))
            }

            (ConsumerState::Processing, Wake::Timeout) => {
                if let Some(id) = self.current_id.take() {
                    ctx.emit_message(Action::Processed, &id);
                }
                Ok(self.dequeue(ctx))
            }

            (_, other) => Err(ctx.unexpected(&other)),
        }
    }

    fn report(&self) -> ProcessReport {
        ProcessReport::Consumer(self.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::EventLoop;
    use crate::message::Message;
    use msgq_env::{MemorySink, NullSink, ProcessId, SimTime};
    use std::sync::Arc;

    /// Puts a fixed list of messages at t=0 and exits.
    struct Feeder {
        queue: QueueId,
        messages: Vec<Message>,
    }

    impl Process for Feeder {
        fn name(&self) -> &str {
            "feeder"
        }

        fn resume(&mut self, _ctx: &mut Context<'_>, _wake: Wake) -> Result<Suspend, SimError> {
            if self.messages.is_empty() {
                return Ok(Suspend::Exit);
            }
            let message = self.messages.remove(0);
            Ok(Suspend::Enqueue {
                queue: self.queue,
                message,
            })
        }
    }

    #[test]
    fn test_processing_time_follows_duration() {
        let sink = MemorySink::new();
        let mut sim = EventLoop::new(Arc::new(sink.clone()));
        let queue = sim.add_queue(4).unwrap();
        sim.spawn(Box::new(Feeder {
            queue,
            messages: vec![Message::new("f", 0, 3), Message::new("f", 1, 5), Message::new("f", 2, 0)],
        }));
        let pid = sim.spawn(Box::new(Consumer::new("c", queue)));

        sim.run(100).unwrap();

        let got: Vec<(SimTime, String)> = sink
            .for_process("c")
            .into_iter()
            .filter(|e| e.action == Action::Got)
            .map(|e| (e.time, e.message_id.unwrap()))
            .collect();
        assert_eq!(
            got,
            vec![(0, "f_0".to_string()), (3, "f_1".to_string()), (8, "f_2".to_string())]
        );

        match &sim.reports()[pid.index()] {
            ProcessReport::Consumer(stats) => {
                assert_eq!(stats.get_count, 3);
                assert_eq!(stats.unit_count, 8);
            }
            other => panic!("expected consumer report, got {:?}", other),
        }
        assert_eq!(sim.queue(queue).unwrap().blocked_getters(), 1);
    }

    #[test]
    fn test_unexpected_wake_is_error() {
        let mut sim = EventLoop::new(NullSink::shared());
        let queue = sim.add_queue(1).unwrap();
        let pid = sim.spawn(Box::new(Consumer::new("c", queue)));
        sim.run(1).unwrap();

        // Consumer is blocked in Getting; a timeout is a protocol violation
        sim.schedule(pid, 5).unwrap();
        let err = sim.run(10).unwrap_err();
        assert_eq!(
            err,
            SimError::UnexpectedWake {
                process: "c".to_string(),
                time: 5,
                wake: "timeout".to_string(),
            }
        );
        assert_eq!(pid, ProcessId(0));
    }

    #[test]
    fn test_huge_duration_aborts_with_overflow() {
        let mut sim = EventLoop::new(NullSink::shared());
        let queue = sim.add_queue(2).unwrap();
        sim.spawn(Box::new(Feeder {
            queue,
            messages: vec![Message::new("f", 0, 1), Message::new("f", 1, u64::MAX)],
        }));
        sim.spawn(Box::new(Consumer::new("c", queue)));

        let err = sim.run(100).unwrap_err();
        assert_eq!(
            err,
            SimError::Overflow {
                process: "c".to_string(),
                time: 1,
                what: "unit count".to_string(),
            }
        );
    }
}
