//! Scenario catalogue for the pipeline simulator.

use crate::config::{ProducerProfile, SimConfig};
use crate::generator;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Single producer outpacing a slow consumer
    Baseline,

    /// One paced producer, one consumer, capacity 1
    Pipeline,

    /// Two producers queued on a held mutex
    Priority,

    /// Token bucket delays the first send
    RateLimited,

    /// Four producers sharing one mutex and one consumer
    MixedFleet,

    /// Seeded random fleet
    Soak,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::Pipeline,
            ScenarioId::Priority,
            ScenarioId::RateLimited,
            ScenarioId::MixedFleet,
            ScenarioId::Soak,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::Pipeline => "pipeline",
            ScenarioId::Priority => "priority",
            ScenarioId::RateLimited => "rate_limited",
            ScenarioId::MixedFleet => "mixed_fleet",
            ScenarioId::Soak => "soak",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "producer every 2 ticks, 3-tick messages, horizon 15",
            ScenarioId::Pipeline => "interval 20, duration 4, capacity 1: 5 puts and 5 gets by t=100",
            ScenarioId::Priority => "priorities 2 and 8 wait on a held mutex: 2 is granted first",
            ScenarioId::RateLimited => "rate 20 per 100 ticks, 28-unit messages: first send at t>=200",
            ScenarioId::MixedFleet => "four producers, one consumer, horizon 1000: nothing lost",
            ScenarioId::Soak => "seeded random fleet, queue and consumers; invariants only",
        }
    }

    /// Returns true if the scenario depends on the seed.
    pub fn is_seeded(&self) -> bool {
        matches!(self, ScenarioId::Soak)
    }

    /// Builds the configuration. Only `Soak` uses `seed` and `fleet_size`.
    pub fn config(&self, seed: u64, fleet_size: usize) -> SimConfig {
        match self {
            ScenarioId::Baseline => SimConfig {
                queue_capacity: 1,
                horizon: 15,
                consumers: 1,
                producers: vec![ProducerProfile::paced(2, 3)],
            },
            ScenarioId::Pipeline => SimConfig {
                queue_capacity: 1,
                horizon: 100,
                consumers: 1,
                producers: vec![ProducerProfile::paced(20, 4)],
            },
            ScenarioId::Priority => SimConfig {
                queue_capacity: 1,
                horizon: 100,
                consumers: 1,
                producers: vec![
                    // Takes the mutex first so the other two queue up at t=0.
                    ProducerProfile::paced(50, 10).with_name("holder"),
                    ProducerProfile::paced(50, 10).with_priority(8).with_name("prio_8"),
                    ProducerProfile::paced(50, 10).with_priority(2).with_name("prio_2"),
                ],
            },
            ScenarioId::RateLimited => SimConfig {
                queue_capacity: 1,
                horizon: 500,
                consumers: 1,
                producers: vec![ProducerProfile::rate_limited(20, 100, 0, 28)],
            },
            ScenarioId::MixedFleet => SimConfig {
                queue_capacity: 1,
                horizon: 1000,
                consumers: 1,
                producers: vec![
                    ProducerProfile::paced(28, 1).with_priority(4),
                    ProducerProfile::paced(24, 1).with_priority(8),
                    ProducerProfile::paced(20, 1).with_priority(2),
                    ProducerProfile::paced(20, 1).with_priority(6),
                ],
            },
            ScenarioId::Soak => generator::random_config(seed, fleet_size),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(ScenarioId::Baseline),
            "pipeline" | "a" => Ok(ScenarioId::Pipeline),
            "priority" | "b" => Ok(ScenarioId::Priority),
            "rate_limited" | "ratelimited" | "c" => Ok(ScenarioId::RateLimited),
            "mixed_fleet" | "mixedfleet" | "d" => Ok(ScenarioId::MixedFleet),
            "soak" | "random" => Ok(ScenarioId::Soak),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
