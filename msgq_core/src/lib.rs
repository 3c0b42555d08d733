//! msgq Core - Discrete-Event Producer/Consumer Engine
//!
//! This library simulates a message pipeline on a single virtual clock:
//! 1. **Event loop**: time-ordered wakeups, FIFO among equal times
//! 2. **Bounded queue**: the message channel; put blocks when full, get when empty
//! 3. **Priority mutex**: serializes producers, lowest priority value first
//! 4. **Token bucket**: per-producer rate limiting with lazy refill
//!
//! Processes are explicit state machines. They yield a [`Suspend`] request
//! and the loop resumes them with the matching [`Wake`] once it is satisfied.

pub mod clock;
pub mod consumer;
pub mod event_queue;
pub mod message;
pub mod mutex;
pub mod process;
pub mod producer;
pub mod queue;
pub mod token_bucket;

// Re-export key types for convenience
pub use clock::EventLoop;
pub use consumer::{Consumer, ConsumerStats};
pub use message::Message;
pub use mutex::PriorityMutex;
pub use process::{Context, Process, ProcessReport, Suspend, Wake};
pub use producer::{Producer, ProducerConfig, ProducerStats};
pub use queue::{BoundedQueue, GetOutcome, PutOutcome};
pub use token_bucket::{BucketStats, RateLimit, TokenBucket};
