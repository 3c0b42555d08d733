//! Scenario runner - executes scenarios and checks their assertions.

use crate::config::SimConfig;
use crate::report::SimReport;
use crate::scenarios::ScenarioId;
use crate::tracing_sink::TracingSink;
use crate::world::Simulation;

use msgq_env::{Action, MemorySink, TeeSink, TraceEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of producers in a generated fleet.
pub const DEFAULT_FLEET_SIZE: usize = 6;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run (`None` for a custom fleet)
    pub scenario: Option<ScenarioId>,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Counters at the horizon (absent if the engine rejected the run)
    pub report: Option<SimReport>,

    /// Number of trace events recorded
    pub trace_events: usize,
}

impl ScenarioResult {
    /// Name the run is reported under.
    pub fn name(&self) -> &'static str {
        self.scenario.map_or("custom", |s| s.name())
    }

    fn failed(scenario: Option<ScenarioId>, seed: u64, reason: String) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            failure_reason: Some(reason),
            report: None,
            trace_events: 0,
        }
    }
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Seed for generated fleets
    seed: u64,

    /// Overrides each scenario's own horizon
    horizon: Option<u64>,

    /// Producers in a generated fleet
    fleet_size: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            horizon: None,
            fleet_size: DEFAULT_FLEET_SIZE,
        }
    }

    /// Overrides the horizon of every scenario.
    pub fn with_horizon(mut self, horizon: u64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the size of generated fleets.
    pub fn with_fleet_size(mut self, fleet_size: usize) -> Self {
        self.fleet_size = fleet_size;
        self
    }

    /// The configuration `run` would use for a scenario.
    pub fn config_for(&self, scenario: ScenarioId) -> SimConfig {
        let config = scenario.config(self.seed, self.fleet_size);
        match self.horizon {
            Some(horizon) => config.with_horizon(horizon),
            None => config,
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("  {}", scenario.description());

        let result = self.run_config(scenario, self.config_for(scenario));
        match &result.failure_reason {
            None => info!("✓ {} passed", scenario.name()),
            Some(reason) => warn!("✗ {} failed: {}", scenario.name(), reason),
        }
        result
    }

    /// Runs an arbitrary configuration under a scenario's assertions.
    pub fn run_config(&self, scenario: ScenarioId, config: SimConfig) -> ScenarioResult {
        self.execute(Some(scenario), config)
    }

    /// Runs a custom fleet, held to the common invariants only.
    pub fn run_custom(&self, config: SimConfig) -> ScenarioResult {
        info!("Starting custom run (seed={})", self.seed);
        self.execute(None, config)
    }

    fn execute(&self, scenario: Option<ScenarioId>, config: SimConfig) -> ScenarioResult {
        let memory = MemorySink::new();
        let sink = TeeSink::new(vec![Arc::new(memory.clone()), Arc::new(TracingSink)]);

        let mut sim = match Simulation::new(config, Arc::new(sink)) {
            Ok(sim) => sim,
            Err(e) => return ScenarioResult::failed(scenario, self.seed, e.to_string()),
        };
        let report = match sim.run() {
            Ok(report) => report,
            Err(e) => return ScenarioResult::failed(scenario, self.seed, e.to_string()),
        };

        let trace = memory.events();
        let failure_reason = check_invariants(&report, &trace)
            .and_then(|_| match scenario {
                Some(scenario) => check_scenario(scenario, &report, &trace),
                None => Ok(()),
            })
            .err();

        for line in report.summary_lines() {
            info!("  {}", line);
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            failure_reason,
            report: Some(report),
            trace_events: trace.len(),
        }
    }
}

/// Properties every run must satisfy.
fn check_invariants(report: &SimReport, trace: &[TraceEvent]) -> Result<(), String> {
    if trace.windows(2).any(|w| w[1].time < w[0].time) {
        return Err("trace time went backwards".into());
    }
    if let Some(late) = trace.iter().find(|e| e.time >= report.horizon) {
        return Err(format!("event at t={} is past the horizon", late.time));
    }
    if report.queue_high_water > report.queue_capacity {
        return Err(format!(
            "queue reached {} with capacity {}",
            report.queue_high_water, report.queue_capacity
        ));
    }

    let resident = report.queue_resident as u64;
    if report.total_put() != report.total_get() + resident {
        return Err(format!(
            "put {} != get {} + resident {}",
            report.total_put(),
            report.total_get(),
            resident
        ));
    }

    let put_ids = ids_of(trace, &Action::Put);
    let got_ids = ids_of(trace, &Action::Got);
    if got_ids.len() > put_ids.len() || put_ids[..got_ids.len()] != got_ids[..] {
        return Err("messages were not delivered in put order".into());
    }

    for p in &report.producers {
        if let Some(bucket) = &p.bucket {
            // At most one debited message can still be waiting for the mutex or queue.
            let in_flight = bucket.spent.checked_sub(p.unit_count);
            let per_message = p.unit_count.checked_div(p.put_count);
            let balanced = match (in_flight, per_message) {
                (None, _) => false,
                (Some(extra), Some(duration)) => extra == 0 || extra == duration,
                (Some(_), None) => true,
            };
            if !balanced {
                return Err(format!(
                    "{} spent {} tokens for {} units",
                    p.name, bucket.spent, p.unit_count
                ));
            }
        }
    }

    Ok(())
}

/// The assertion specific to each scenario.
fn check_scenario(scenario: ScenarioId, report: &SimReport, trace: &[TraceEvent]) -> Result<(), String> {
    match scenario {
        ScenarioId::Pipeline => {
            let (put, get) = (report.total_put(), report.total_get());
            if put != 5 || get != 5 {
                return Err(format!("expected 5 puts and 5 gets, saw {} and {}", put, get));
            }
        }

        ScenarioId::Priority => {
            let grant = |name: &str| {
                trace
                    .iter()
                    .position(|e| e.process == name && e.action == Action::Acquired)
            };
            match (grant("prio_2"), grant("prio_8")) {
                (Some(high), Some(low)) if high < low => {}
                (high, low) => {
                    return Err(format!(
                        "priority 2 granted at trace index {:?}, priority 8 at {:?}",
                        high, low
                    ))
                }
            }
        }

        ScenarioId::RateLimited => match trace.iter().find(|e| e.action == Action::Put) {
            Some(first) if first.time >= 200 => {}
            Some(first) => return Err(format!("first send at t={}, before 200", first.time)),
            None => return Err("nothing was sent".into()),
        },

        ScenarioId::MixedFleet => {
            if report.total_put() == 0 || report.total_get() != report.total_put() {
                return Err(format!(
                    "got {} of {} messages",
                    report.total_get(),
                    report.total_put()
                ));
            }
        }

        ScenarioId::Baseline | ScenarioId::Soak => {}
    }
    Ok(())
}

fn ids_of<'a>(trace: &'a [TraceEvent], action: &Action) -> Vec<&'a str> {
    trace
        .iter()
        .filter(|e| &e.action == action)
        .filter_map(|e| e.message_id.as_deref())
        .collect()
}
