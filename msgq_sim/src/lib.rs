//! msgq Simulation Driver
//!
//! Builds producer/consumer pipelines on the `msgq_core` engine, runs named
//! scenarios against their assertions, and reports the counters.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Simulation                         │
//! │  ┌────────────┐  ┌────────────┐        ┌────────────┐    │
//! │  │ producer_0 │  │ producer_1 │  ...   │ consumer_0 │    │
//! │  └─────┬──────┘  └─────┬──────┘        └─────▲──────┘    │
//! │        │  PriorityMutex│                     │           │
//! │        └───────┬───────┘                     │           │
//! │          ┌─────▼─────────────────────────────┴──┐        │
//! │          │            BoundedQueue               │        │
//! │          └───────────────────────────────────────┘        │
//! │  EventLoop (virtual clock, FIFO among equal times)        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use msgq_env::NullSink;
//! use msgq_sim::{SimConfig, Simulation};
//!
//! let mut sim = Simulation::new(SimConfig::default(), NullSink::shared()).unwrap();
//! let report = sim.run().unwrap();
//! assert_eq!(report.total_put(), 5);
//! ```

mod config;
pub mod generator;
mod report;
mod runner;
pub mod scenarios;
mod tracing_sink;
mod world;

pub use config::{ConfigError, ProducerProfile, SimConfig};
pub use report::SimReport;
pub use runner::{ScenarioResult, ScenarioRunner, DEFAULT_FLEET_SIZE};
pub use tracing_sink::TracingSink;
pub use world::Simulation;
