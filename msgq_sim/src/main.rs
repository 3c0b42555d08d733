//! msgq Pipeline Simulator CLI
//!
//! Run the scenario catalogue, or a custom producer fleet, on the
//! discrete-event engine.

use clap::Parser;
use msgq_sim::scenarios::ScenarioId;
use msgq_sim::{generator, ProducerProfile, ScenarioResult, ScenarioRunner, SimConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// msgq pipeline simulator
#[derive(Parser, Debug)]
#[command(name = "msgq-sim")]
#[command(about = "Simulate producers and consumers on a bounded queue", long_about = None)]
struct Args {
    /// Scenario to run (baseline, pipeline, priority, rate_limited, mixed_fleet, soak, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Seed for generated fleets (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Override the horizon (virtual time at which runs stop)
    #[arg(long)]
    horizon: Option<u64>,

    /// Queue capacity for a custom fleet
    #[arg(short, long, default_value = "1")]
    capacity: usize,

    /// Consumers for a custom fleet
    #[arg(long, default_value = "1")]
    consumers: usize,

    /// Custom producer, e.g. "interval=20,duration=4" or
    /// "rate=20,period=100,priority=2,duration=28" (repeatable)
    #[arg(short, long = "producer")]
    producers: Vec<ProducerProfile>,

    /// Add this many seeded random producers to the custom fleet
    #[arg(long)]
    random_producers: Option<usize>,

    /// Load a custom run from a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output (every engine event)
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Write the run's report to a JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    fn is_custom(&self) -> bool {
        self.config.is_some() || !self.producers.is_empty() || self.random_producers.is_some()
    }

    /// Builds the custom run's configuration for one seed.
    fn custom_config(&self, seed: u64) -> Result<SimConfig, String> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path).map_err(|e| e.to_string())?,
            None => SimConfig {
                queue_capacity: self.capacity,
                consumers: self.consumers,
                producers: self.producers.clone(),
                ..Default::default()
            },
        };
        if self.config.is_some() {
            config.producers.extend(self.producers.iter().cloned());
        }
        if let Some(count) = self.random_producers {
            config.producers.extend(generator::random_fleet(seed, count));
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !args.json {
        info!("msgq Pipeline Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios; a custom fleet is a single run with no scenario
    let scenarios: Vec<Option<ScenarioId>> = if args.is_custom() {
        vec![None]
    } else if args.scenario == "all" {
        ScenarioId::all().into_iter().map(Some).collect()
    } else {
        vec![Some(args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: baseline, pipeline, priority, rate_limited, mixed_fleet, soak, all");
            std::process::exit(1);
        }))]
    };

    if args.export.is_some() && scenarios.len() * args.seeds > 1 {
        eprintln!("Error: --export only supports a single run");
        std::process::exit(1);
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let mut runner = ScenarioRunner::new(seed);
        if let Some(horizon) = args.horizon {
            runner = runner.with_horizon(horizon);
        }

        for scenario in &scenarios {
            let result = match scenario {
                Some(scenario) => runner.run(*scenario),
                None => match args.custom_config(seed) {
                    Ok(config) => runner.run_custom(config),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
            };

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", result.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        result.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    if let (Some(path), Some(report)) = (&args.export, all_results.first().and_then(|r| r.report.as_ref())) {
        match report.write_to_file(path) {
            Ok(()) => info!("Exported report to {}", path),
            Err(e) => error!("Failed to write export: {:?}", e),
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "trace_events": r.trace_events,
                    "failure_reason": r.failure_reason,
                    "report": r.report,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} runs passed!", total);
        } else {
            error!("❌ {}/{} runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
}
