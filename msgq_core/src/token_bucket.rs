//! Token-bucket rate limiting with lazy, anchored refill.
//!
//! The bucket is a plain value owned by one producer. It never schedules
//! anything: the producer asks it to refill when it checks, and suspends
//! until [`TokenBucket::next_refill_time`] when the balance is too low.
//!
//! Refill adds exactly `rate` once per observed period. Periods that pass
//! while nobody checks are skipped rather than credited, so an idle producer
//! cannot bank an unbounded balance.

use msgq_env::{SimError, SimTime};
use serde::{Deserialize, Serialize};

/// Rate limit configuration for one producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Tokens added per refill
    pub rate: u64,

    /// Ticks between refills
    pub refill_period: u64,

    /// Balance at the start of the run
    #[serde(default)]
    pub initial_tokens: u64,

    /// Optional cap on the balance (bucket depth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl RateLimit {
    /// Creates a limit with an empty, uncapped bucket.
    pub fn new(rate: u64, refill_period: u64) -> Self {
        Self {
            rate,
            refill_period,
            initial_tokens: 0,
            max_tokens: None,
        }
    }

    /// Sets the starting balance.
    pub fn with_initial_tokens(mut self, tokens: u64) -> Self {
        self.initial_tokens = tokens;
        self
    }

    /// Caps the balance.
    pub fn with_max_tokens(mut self, max: u64) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Token accounting exposed after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BucketStats {
    /// Balance at the end of the run
    pub tokens: u64,

    /// Total tokens added by refills
    pub refilled: u64,

    /// Total tokens debited for messages
    pub spent: u64,

    /// Number of refills applied
    pub refills: u64,
}

/// Per-producer token bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: u64,
    rate: u64,
    refill_period: u64,
    next_refill_time: SimTime,
    max_tokens: Option<u64>,
    stats: BucketStats,
}

impl TokenBucket {
    /// Creates a bucket for a producer whose messages cost `cost` tokens.
    ///
    /// The first refill is due one period after `start`. Rejects any
    /// configuration under which the producer could never send.
    pub fn new(owner: &str, limit: &RateLimit, cost: u64, start: SimTime) -> Result<Self, SimError> {
        if limit.refill_period == 0 {
            return Err(SimError::rate_config(owner, "refill period must be positive"));
        }
        if limit.rate == 0 && cost > 0 {
            return Err(SimError::rate_config(
                owner,
                format!("rate must be positive for messages costing {} tokens", cost),
            ));
        }
        if let Some(max) = limit.max_tokens {
            if max < cost {
                return Err(SimError::rate_config(
                    owner,
                    format!("bucket depth {} is below message cost {}", max, cost),
                ));
            }
        }

        let next_refill_time = start.checked_add(limit.refill_period).ok_or_else(|| {
            SimError::rate_config(owner, "first refill falls past the end of the clock")
        })?;

        let tokens = match limit.max_tokens {
            Some(max) => limit.initial_tokens.min(max),
            None => limit.initial_tokens,
        };

        Ok(Self {
            tokens,
            rate: limit.rate,
            refill_period: limit.refill_period,
            next_refill_time,
            max_tokens: limit.max_tokens,
            stats: BucketStats {
                tokens,
                ..Default::default()
            },
        })
    }

    /// Applies the refill due at or before `now`, if any.
    ///
    /// Returns true when tokens were added. Calling again before the next
    /// refill instant changes nothing.
    pub fn refill(&mut self, now: SimTime) -> bool {
        if now < self.next_refill_time {
            return false;
        }

        let before = self.tokens;
        self.tokens = self.tokens.saturating_add(self.rate);
        if let Some(max) = self.max_tokens {
            self.tokens = self.tokens.min(max);
        }
        self.stats.refilled = self.stats.refilled.saturating_add(self.tokens - before);
        self.stats.refills += 1;

        // Skip unobserved periods but stay on the original grid. A grid point
        // past the end of the clock means no further refill is ever due.
        let missed = (now - self.next_refill_time) / self.refill_period;
        self.next_refill_time = (missed + 1)
            .checked_mul(self.refill_period)
            .and_then(|step| self.next_refill_time.checked_add(step))
            .unwrap_or(SimTime::MAX);
        true
    }

    /// Debits `amount` if the balance covers it.
    pub fn try_debit(&mut self, amount: u64) -> bool {
        if self.tokens < amount {
            return false;
        }
        self.tokens -= amount;
        self.stats.spent = self.stats.spent.saturating_add(amount);
        true
    }

    /// Current balance.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Tokens added per refill.
    pub fn rate(&self) -> u64 {
        self.rate
    }

    /// When the next refill becomes due.
    pub fn next_refill_time(&self) -> SimTime {
        self.next_refill_time
    }

    /// Accounting snapshot.
    pub fn stats(&self) -> BucketStats {
        BucketStats {
            tokens: self.tokens,
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(rate: u64, period: u64, cost: u64) -> TokenBucket {
        TokenBucket::new("p", &RateLimit::new(rate, period), cost, 0).unwrap()
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = TokenBucket::new("p", &RateLimit::new(0, 10), 4, 0).unwrap_err();
        assert!(matches!(err, SimError::RateConfig { .. }));

        // Free messages never need tokens
        assert!(TokenBucket::new("p", &RateLimit::new(0, 10), 0, 0).is_ok());
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = TokenBucket::new("p", &RateLimit::new(5, 0), 4, 0).unwrap_err();
        assert!(matches!(err, SimError::RateConfig { .. }));
    }

    #[test]
    fn test_shallow_bucket_rejected() {
        let limit = RateLimit::new(20, 100).with_max_tokens(10);
        assert!(TokenBucket::new("p", &limit, 28, 0).is_err());
    }

    #[test]
    fn test_needs_two_refills_for_large_message() {
        let mut b = bucket(20, 100, 28);
        assert_eq!(b.next_refill_time(), 100);
        assert!(!b.refill(0));
        assert!(!b.try_debit(28));

        assert!(b.refill(100));
        assert_eq!(b.tokens(), 20);
        assert!(!b.try_debit(28));
        assert_eq!(b.next_refill_time(), 200);

        assert!(b.refill(200));
        assert!(b.try_debit(28));
        assert_eq!(b.tokens(), 12);
    }

    #[test]
    fn test_refill_idempotent_within_period() {
        let mut b = bucket(5, 10, 1);
        assert!(b.refill(10));
        let tokens = b.tokens();

        assert!(!b.refill(10));
        assert!(!b.refill(19));
        assert_eq!(b.tokens(), tokens);
        assert_eq!(b.stats().refills, 1);
    }

    #[test]
    fn test_missed_periods_not_credited() {
        let mut b = bucket(5, 10, 1);

        // Nobody checked at 10, 20, 30
        assert!(b.refill(35));
        assert_eq!(b.tokens(), 5);
        assert_eq!(b.next_refill_time(), 40, "Refill stays on the 10-tick grid");
    }

    #[test]
    fn test_cap_limits_balance() {
        let limit = RateLimit::new(10, 1).with_initial_tokens(50).with_max_tokens(15);
        let mut b = TokenBucket::new("p", &limit, 5, 0).unwrap();
        assert_eq!(b.tokens(), 15);

        b.refill(1);
        assert_eq!(b.tokens(), 15);
        assert_eq!(b.stats().refilled, 0);
    }

    #[test]
    fn test_conservation() {
        let limit = RateLimit::new(7, 3).with_initial_tokens(4);
        let mut b = TokenBucket::new("p", &limit, 6, 0).unwrap();

        for now in 0..100 {
            b.refill(now);
            b.try_debit(6);
        }

        let stats = b.stats();
        assert_eq!(4 + stats.refilled - stats.spent, stats.tokens);
        assert_eq!(stats.spent % 6, 0);
    }

    #[test]
    fn test_grid_near_end_of_clock() {
        let near_end = SimTime::MAX - 5;
        let err = TokenBucket::new("p", &RateLimit::new(1, 10), 1, near_end).unwrap_err();
        assert!(matches!(err, SimError::RateConfig { .. }));

        let mut b = TokenBucket::new("p", &RateLimit::new(3, 10), 1, SimTime::MAX - 15).unwrap();
        assert_eq!(b.next_refill_time(), SimTime::MAX - 5);
        assert!(b.refill(SimTime::MAX - 5));
        assert_eq!(b.tokens(), 3);
        assert_eq!(b.next_refill_time(), SimTime::MAX);
        assert!(!b.refill(SimTime::MAX - 1));
    }
}
