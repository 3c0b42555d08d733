//! Simulation configuration and producer profiles.

use msgq_core::{ProducerConfig, RateLimit};
use msgq_env::{MutexId, NullSink, QueueId, SimError, SimTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors from loading configuration or writing output.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read, or export could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for `SimConfig`
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration rejected by the engine
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// How one producer behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerProfile {
    /// Explicit name (defaults to `producer_<index>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Processing time and token cost of each message
    pub duration: u64,

    /// Target ticks between cycle starts (0 = as fast as the bucket allows)
    #[serde(default)]
    pub put_interval: u64,

    /// Mutex priority, lower first
    #[serde(default)]
    pub priority: i64,

    /// Token bucket, if rate limited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

impl ProducerProfile {
    /// Paced producer without a token bucket: `(putInterval, duration)`.
    pub fn paced(put_interval: u64, duration: u64) -> Self {
        Self {
            name: None,
            duration,
            put_interval,
            priority: 0,
            rate_limit: None,
        }
    }

    /// Rate-limited producer: `(rate, refillPeriod, priority, duration)`.
    pub fn rate_limited(rate: u64, refill_period: u64, priority: i64, duration: u64) -> Self {
        Self {
            name: None,
            duration,
            put_interval: 0,
            priority,
            rate_limit: Some(RateLimit::new(rate, refill_period)),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the mutex priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the pacing interval.
    pub fn with_put_interval(mut self, put_interval: u64) -> Self {
        self.put_interval = put_interval;
        self
    }

    /// Builds the engine-side config for the producer at `index`.
    pub fn to_config(&self, index: usize, queue: QueueId, mutex: MutexId) -> ProducerConfig {
        ProducerConfig {
            name: self.display_name(index),
            queue,
            mutex,
            priority: self.priority,
            duration: self.duration,
            put_interval: self.put_interval,
            rate_limit: self.rate_limit,
        }
    }

    /// Name the producer at `index` will run under.
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("producer_{}", index))
    }
}

impl std::str::FromStr for ProducerProfile {
    type Err = SimError;

    /// Parses `key=value` pairs separated by commas.
    ///
    /// Keys: `duration` (required), `interval`, `priority`, `rate` and
    /// `period` (together), `initial`, `max`, `name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut profile = ProducerProfile::paced(0, 0);
        let mut duration = None;
        let mut rate = None;
        let mut period = None;
        let mut initial = 0;
        let mut max = None;

        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| SimError::invalid_profile(format!("expected key=value, got '{}'", pair)))?;
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "name" => profile.name = Some(value.to_string()),
                "duration" | "d" => duration = Some(parse_num(key, value)?),
                "interval" | "put_interval" | "i" => profile.put_interval = parse_num(key, value)?,
                "priority" | "p" => {
                    profile.priority = value
                        .parse()
                        .map_err(|_| SimError::invalid_profile(format!("bad priority '{}'", value)))?
                }
                "rate" | "r" => rate = Some(parse_num(key, value)?),
                "period" | "refill_period" => period = Some(parse_num(key, value)?),
                "initial" => initial = parse_num(key, value)?,
                "max" => max = Some(parse_num(key, value)?),
                other => return Err(SimError::invalid_profile(format!("unknown key '{}'", other))),
            }
        }

        profile.duration = duration
            .ok_or_else(|| SimError::invalid_profile(format!("'{}' is missing duration", s)))?;

        profile.rate_limit = match (rate, period) {
            (Some(rate), Some(refill_period)) => Some(RateLimit {
                rate,
                refill_period,
                initial_tokens: initial,
                max_tokens: max,
            }),
            (None, None) => None,
            _ => {
                return Err(SimError::invalid_profile(
                    "rate and period must be given together",
                ))
            }
        };

        Ok(profile)
    }
}

fn parse_num(key: &str, value: &str) -> Result<u64, SimError> {
    value
        .parse()
        .map_err(|_| SimError::invalid_profile(format!("bad {} '{}'", key, value)))
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Capacity of the shared queue
    pub queue_capacity: usize,

    /// Virtual time at which the run stops
    pub horizon: SimTime,

    /// Number of consumers
    pub consumers: usize,

    /// One profile per producer
    pub producers: Vec<ProducerProfile>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1,
            horizon: 100,
            consumers: 1,
            producers: vec![ProducerProfile::paced(20, 4)],
        }
    }
}

impl SimConfig {
    /// Loads a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything the engine would reject, without running.
    pub fn validate(&self) -> Result<(), SimError> {
        crate::world::Simulation::new(self.clone(), NullSink::shared()).map(|_| ())
    }

    /// Sets the horizon.
    pub fn with_horizon(mut self, horizon: SimTime) -> Self {
        self.horizon = horizon;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paced_profile() {
        let profile: ProducerProfile = "interval=20, duration=4".parse().unwrap();
        assert_eq!(profile, ProducerProfile::paced(20, 4));
    }

    #[test]
    fn test_parse_rate_limited_profile() {
        let profile: ProducerProfile = "rate=20,period=100,priority=-3,duration=28,max=60,name=bulk"
            .parse()
            .unwrap();

        assert_eq!(profile.name.as_deref(), Some("bulk"));
        assert_eq!(profile.priority, -3);
        assert_eq!(profile.duration, 28);
        assert_eq!(
            profile.rate_limit,
            Some(RateLimit::new(20, 100).with_max_tokens(60))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("interval=20".parse::<ProducerProfile>().is_err());
        assert!("duration=4,rate=3".parse::<ProducerProfile>().is_err());
        assert!("duration=x".parse::<ProducerProfile>().is_err());
        assert!("duration=4,colour=red".parse::<ProducerProfile>().is_err());
        assert!("duration".parse::<ProducerProfile>().is_err());
    }

    #[test]
    fn test_validate_catches_config_errors() {
        assert!(SimConfig::default().validate().is_ok());

        let zero_capacity = SimConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert_eq!(zero_capacity.validate(), Err(SimError::Capacity(0)));

        let zero_rate = SimConfig {
            producers: vec![ProducerProfile::rate_limited(0, 10, 1, 5)],
            ..Default::default()
        };
        assert!(matches!(zero_rate.validate(), Err(SimError::RateConfig { .. })));
    }

    #[test]
    fn test_json_round_trip_uses_defaults() {
        let json = r#"{
            "queue_capacity": 2,
            "horizon": 500,
            "consumers": 1,
            "producers": [
                { "duration": 4, "put_interval": 20 },
                { "duration": 28, "priority": 2, "rate_limit": { "rate": 20, "refill_period": 100 } }
            ]
        }"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.producers[0], ProducerProfile::paced(20, 4));
        assert_eq!(config.producers[1], ProducerProfile::rate_limited(20, 100, 2, 28));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("msgq_config_{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&SimConfig::default()).unwrap()).unwrap();

        let config = SimConfig::from_json_file(&path).unwrap();
        assert_eq!(config, SimConfig::default());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            SimConfig::from_json_file("/nonexistent/msgq.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
