//! Cooperative processes and their suspension contract.
//!
//! A process is an explicit state machine. Each call to [`Process::resume`]
//! runs it up to its next suspension point and returns a [`Suspend`]
//! request describing what it is waiting for. The event loop satisfies the
//! request and resumes the process exactly once with the matching [`Wake`].

use crate::consumer::ConsumerStats;
use crate::event_queue::EventQueue;
use crate::message::Message;
use crate::mutex::PriorityMutex;
use crate::producer::ProducerStats;

use msgq_env::{Action, EventSink, MutexId, ProcessId, QueueId, SimError, SimTime, TraceEvent};
use serde::{Deserialize, Serialize};

/// What a process is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suspend {
    /// Resume at the given absolute time (with `Wake::Timeout`).
    WaitUntil(SimTime),

    /// Resume once the mutex is granted (with `Wake::Acquired`).
    Acquire { mutex: MutexId, priority: i64 },

    /// Resume once the queue has accepted the message (with `Wake::Enqueued`).
    Enqueue { queue: QueueId, message: Message },

    /// Resume once a message is available (with `Wake::Dequeued`).
    Dequeue { queue: QueueId },

    /// Never resume again.
    Exit,
}

/// Value handed back to a process when its suspension is satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    /// First resumption after registration.
    Start,

    /// A `WaitUntil` elapsed.
    Timeout,

    /// The mutex is now held by the process.
    Acquired(MutexId),

    /// The queue accepted the message.
    Enqueued,

    /// A message was taken from the queue.
    Dequeued(Message),
}

impl Wake {
    /// Short name, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Wake::Start => "start",
            Wake::Timeout => "timeout",
            Wake::Acquired(_) => "acquired",
            Wake::Enqueued => "enqueued",
            Wake::Dequeued(_) => "dequeued",
        }
    }
}

/// Counters a process exposes once the run is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessReport {
    Producer(ProducerStats),
    Consumer(ConsumerStats),
    Other { name: String },
}

impl ProcessReport {
    /// Name of the reporting process.
    pub fn name(&self) -> &str {
        match self {
            ProcessReport::Producer(stats) => &stats.name,
            ProcessReport::Consumer(stats) => &stats.name,
            ProcessReport::Other { name } => name,
        }
    }
}

/// A cooperative unit of execution driven by the event loop.
pub trait Process {
    /// Stable name used in ids, traces and errors.
    fn name(&self) -> &str;

    /// Runs until the next suspension point.
    ///
    /// `wake` is the value satisfying the previous suspension (or
    /// `Wake::Start` on the first call). Returning an error aborts the run.
    fn resume(&mut self, ctx: &mut Context<'_>, wake: Wake) -> Result<Suspend, SimError>;

    /// Final counters. Defaults to a bare name.
    fn report(&self) -> ProcessReport {
        ProcessReport::Other {
            name: self.name().to_string(),
        }
    }
}

/// What a resumed process may do without suspending.
///
/// Built by the event loop for the duration of a single `resume` call.
pub struct Context<'a> {
    pub(crate) now: SimTime,
    pub(crate) pid: ProcessId,
    pub(crate) name: &'a str,
    pub(crate) mutexes: &'a mut [PriorityMutex],
    pub(crate) events: &'a mut EventQueue,
    pub(crate) sink: &'a dyn EventSink,
}

impl<'a> Context<'a> {
    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Id of the running process.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Name of the running process.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Releases a mutex held by the running process.
    ///
    /// If anyone is waiting, the best waiter becomes the holder right away
    /// and is scheduled to resume at the current time.
    pub fn release(&mut self, mutex: MutexId) -> Result<(), SimError> {
        let lock = self
            .mutexes
            .get_mut(mutex.0)
            .ok_or(SimError::UnknownMutex(mutex))?;

        if lock.holder() != Some(self.pid) {
            return Err(SimError::NotHolder {
                process: self.name.to_string(),
                mutex,
                time: self.now,
            });
        }

        if let Some(next) = lock.release() {
            self.events.push(self.now, next, Wake::Acquired(mutex));
        }
        self.emit(Action::Released);
        Ok(())
    }

    /// Emits an event attributed to the running process.
    pub fn emit(&self, action: Action) {
        if self.sink.enabled() {
            self.sink.record(TraceEvent::new(self.now, self.name, action));
        }
    }

    /// Emits an event about a specific message.
    pub fn emit_message(&self, action: Action, message_id: &str) {
        if self.sink.enabled() {
            self.sink
                .record(TraceEvent::new(self.now, self.name, action).with_message(message_id));
        }
    }

    /// Absolute time `delay` ticks from now.
    ///
    /// Fails with `SimError::Overflow` past the end of representable time.
    pub fn after(&self, delay: SimTime) -> Result<SimTime, SimError> {
        self.now
            .checked_add(delay)
            .ok_or_else(|| self.overflow("the clock"))
    }

    /// Adds `amount` to one of the process's counters.
    pub fn accumulate(&self, counter: &mut u64, amount: u64, what: &str) -> Result<(), SimError> {
        *counter = counter
            .checked_add(amount)
            .ok_or_else(|| self.overflow(what))?;
        Ok(())
    }

    fn overflow(&self, what: &str) -> SimError {
        SimError::Overflow {
            process: self.name.to_string(),
            time: self.now,
            what: what.to_string(),
        }
    }

    /// Error for a wake the process did not ask for.
    pub fn unexpected(&self, wake: &Wake) -> SimError {
        SimError::UnexpectedWake {
            process: self.name.to_string(),
            time: self.now,
            wake: wake.name().to_string(),
        }
    }
}
