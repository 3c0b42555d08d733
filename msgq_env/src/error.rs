//! Error types for the msgq simulation.

use crate::types::{MutexId, ProcessId, QueueId, SimTime};
use thiserror::Error;

/// Errors raised while configuring or running a simulation.
///
/// Configuration errors (`Capacity`, `RateConfig`, `InvalidProfile`) are
/// reported at construction, before any event is dispatched. The others are
/// invariant violations detected mid-run; they abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A wakeup was requested before the current virtual time.
    #[error("Time travel: {process} requested t={requested} but clock is at t={now}")]
    TimeTravel {
        process: String,
        now: SimTime,
        requested: SimTime,
    },

    /// Queue constructed with a capacity below 1.
    #[error("Queue capacity must be at least 1, got {0}")]
    Capacity(usize),

    /// Token bucket configuration can never let the producer send.
    #[error("Rate config error for {producer}: {reason}")]
    RateConfig {
        producer: String,
        reason: String,
    },

    /// A process released a mutex it does not hold.
    #[error("{process} released {mutex} at t={time} without holding it")]
    NotHolder {
        process: String,
        mutex: MutexId,
        time: SimTime,
    },

    /// A process was resumed with a value it was not waiting for.
    #[error("{process} woken at t={time} with unexpected {wake}")]
    UnexpectedWake {
        process: String,
        time: SimTime,
        wake: String,
    },

    /// A time or counter no longer fits in 64 bits.
    #[error("{process} overflowed {what} at t={time}")]
    Overflow {
        process: String,
        time: SimTime,
        what: String,
    },

    /// Event refers to a process that was never registered.
    #[error("Unknown process: {0}")]
    UnknownProcess(ProcessId),

    /// Request refers to a queue that does not exist.
    #[error("Unknown queue: {0}")]
    UnknownQueue(QueueId),

    /// Request refers to a mutex that does not exist.
    #[error("Unknown mutex: {0}")]
    UnknownMutex(MutexId),

    /// A producer profile could not be parsed or is unusable.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

impl SimError {
    /// Creates a rate config error.
    pub fn rate_config(producer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RateConfig {
            producer: producer.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid profile error.
    pub fn invalid_profile(msg: impl std::fmt::Display) -> Self {
        Self::InvalidProfile(msg.to_string())
    }

    /// Returns true for errors detected before the run starts.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimError::Capacity(_) | SimError::RateConfig { .. } | SimError::InvalidProfile(_)
        )
    }
}
