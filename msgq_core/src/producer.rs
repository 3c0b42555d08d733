//! Rate-limited, priority-gated message producer.

use crate::message::Message;
use crate::process::{Context, Process, ProcessReport, Suspend, Wake};
use crate::token_bucket::{BucketStats, RateLimit, TokenBucket};

use msgq_env::{Action, MutexId, QueueId, SimError, SimTime};
use serde::{Deserialize, Serialize};

/// Everything needed to build a producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Name, also the prefix of message ids
    pub name: String,

    /// Queue the producer puts into
    pub queue: QueueId,

    /// Mutex serializing access to the queue
    pub mutex: MutexId,

    /// Mutex priority (lower is served first)
    pub priority: i64,

    /// Processing time (and token cost) of each message
    pub duration: u64,

    /// Target ticks between cycle starts
    pub put_interval: u64,

    /// Token bucket gating emission, if any
    pub rate_limit: Option<RateLimit>,
}

/// Counters a producer exposes after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerStats {
    pub name: String,
    pub priority: i64,
    pub put_count: u64,
    pub unit_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<BucketStats>,
}

/// Where the producer is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProducerState {
    /// Registered, not yet started
    Idle,
    /// Waiting for a refill
    Throttled,
    /// Waiting for the mutex
    Acquiring,
    /// Holding the mutex, waiting for the queue
    Putting,
    /// Waiting out the rest of the interval
    Pacing,
}

/// Producer process.
///
/// Each cycle: build a message, pass the token-bucket gate, take the mutex,
/// put, release, then wait out whatever is left of `put_interval`. A cycle
/// that overran its interval starts the next one immediately; the lost time
/// is not caught up.
#[derive(Debug)]
pub struct Producer {
    name: String,
    queue: QueueId,
    mutex: MutexId,
    priority: i64,
    duration: u64,
    put_interval: u64,
    bucket: Option<TokenBucket>,

    state: ProducerState,
    sequence: u64,
    cycle_start: SimTime,
    pending: Option<Message>,
    current_id: String,

    put_count: u64,
    unit_count: u64,
}

impl Producer {
    /// Builds a producer whose first refill is anchored at `start`.
    ///
    /// Rejects bucket configurations that could never send, and an unpaced
    /// producer with no rate limit (it would emit forever at one instant).
    pub fn new(config: ProducerConfig, start: SimTime) -> Result<Self, SimError> {
        let bucket = config
            .rate_limit
            .as_ref()
            .map(|limit| TokenBucket::new(&config.name, limit, config.duration, start))
            .transpose()?;

        let gated = config.rate_limit.is_some() && config.duration > 0;
        if config.put_interval == 0 && !gated {
            return Err(SimError::invalid_profile(format!(
                "{}: put interval of 0 needs a rate limit and a positive duration",
                config.name
            )));
        }

        Ok(Self {
            name: config.name,
            queue: config.queue,
            mutex: config.mutex,
            priority: config.priority,
            duration: config.duration,
            put_interval: config.put_interval,
            bucket,
            state: ProducerState::Idle,
            sequence: 0,
            cycle_start: start,
            pending: None,
            current_id: String::new(),
            put_count: 0,
            unit_count: 0,
        })
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ProducerStats {
        ProducerStats {
            name: self.name.clone(),
            priority: self.priority,
            put_count: self.put_count,
            unit_count: self.unit_count,
            bucket: self.bucket.as_ref().map(TokenBucket::stats),
        }
    }

    fn begin_cycle(&mut self, ctx: &Context<'_>) -> Suspend {
        self.cycle_start = ctx.now();
        let message = Message::new(&self.name, self.sequence, self.duration);
        self.sequence += 1;
        self.current_id = message.id.clone();
        self.pending = Some(message);
        self.gate(ctx)
    }

    /// Token-bucket gate, then ask for the mutex.
    fn gate(&mut self, ctx: &Context<'_>) -> Suspend {
        if let Some(bucket) = self.bucket.as_mut() {
            if bucket.refill(ctx.now()) {
                ctx.emit(Action::Refilled {
                    tokens: bucket.tokens(),
                });
            }

            if !bucket.try_debit(self.duration) {
                ctx.emit_message(
                    Action::Throttled {
                        tokens: bucket.tokens(),
                        needed: self.duration,
                    },
                    &self.current_id,
                );
                self.state = ProducerState::Throttled;
                return Suspend::WaitUntil(bucket.next_refill_time());
            }

            ctx.emit_message(
                Action::Debited {
                    tokens: bucket.tokens(),
                },
                &self.current_id,
            );
        }

        ctx.emit_message(
            Action::Acquiring {
                priority: self.priority,
            },
            &self.current_id,
        );
        self.state = ProducerState::Acquiring;
        Suspend::Acquire {
            mutex: self.mutex,
            priority: self.priority,
        }
    }

    /// Wait out the rest of the interval, or start over right away.
    fn pace(&mut self, ctx: &Context<'_>) -> Result<Suspend, SimError> {
        let elapsed = ctx.now() - self.cycle_start;
        if elapsed > self.put_interval {
            return Ok(self.begin_cycle(ctx));
        }

        let until = ctx.after(self.put_interval - elapsed)?;
        ctx.emit(Action::Waiting { until });
        self.state = ProducerState::Pacing;
        Ok(Suspend::WaitUntil(until))
    }
}

impl Process for Producer {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut Context<'_>, wake: Wake) -> Result<Suspend, SimError> {
        match (self.state, wake) {
            (ProducerState::Idle, Wake::Start) => {
                ctx.emit(Action::Started);
                Ok(self.begin_cycle(ctx))
            }

            (ProducerState::Pacing, Wake::Timeout) => Ok(self.begin_cycle(ctx)),

            (ProducerState::Throttled, Wake::Timeout) => Ok(self.gate(ctx)),

            (ProducerState::Acquiring, Wake::Acquired(mutex)) if mutex == self.mutex => {
                ctx.emit_message(Action::Acquired, &self.current_id);
                let message = self
                    .pending
                    .take()
                    .ok_or_else(|| ctx.unexpected(&Wake::Acquired(mutex)))?;
                ctx.emit_message(Action::Putting, &message.id);
                self.state = ProducerState::Putting;
                Ok(Suspend::Enqueue {
                    queue: self.queue,
                    message,
                })
            }

            (ProducerState::Putting, Wake::Enqueued) => {
                self.put_count += 1;
                ctx.accumulate(&mut self.unit_count, self.duration, "unit count")?;
                ctx.emit_message(Action::Put, &self.current_id);
                ctx.release(self.mutex)?;
                self.pace(ctx)
            }

            (_, other) => Err(ctx.unexpected(&other)),
        }
    }

    fn report(&self) -> ProcessReport {
        ProcessReport::Producer(self.stats())
    }
}
