//! Simulation - wires producers and consumers to one queue and one mutex.

use crate::config::SimConfig;
use crate::report::SimReport;

use msgq_core::{Consumer, EventLoop, ProcessReport, Producer};
use msgq_env::{MutexId, ProcessId, QueueId, SharedSink, SimError, SimTime};
use std::collections::HashSet;

/// A configured producer/consumer pipeline on one virtual clock.
pub struct Simulation {
    /// Configuration the pipeline was built from
    pub config: SimConfig,

    /// The engine (clock, schedule, resources, processes)
    engine: EventLoop,

    /// Shared message queue
    queue: QueueId,

    /// Mutex serializing producers' puts
    mutex: MutexId,

    producers: Vec<ProcessId>,
    consumers: Vec<ProcessId>,
}

impl Simulation {
    /// Builds the pipeline.
    ///
    /// Every configuration error surfaces here, before any event runs.
    /// Producers are registered before consumers, in profile order.
    pub fn new(config: SimConfig, sink: SharedSink) -> Result<Self, SimError> {
        let mut engine = EventLoop::new(sink);
        let queue = engine.add_queue(config.queue_capacity)?;
        let mutex = engine.add_mutex();

        // Process names are unique across producers and consumers.
        let consumer_names: Vec<String> =
            (0..config.consumers).map(|index| format!("consumer_{}", index)).collect();
        let mut names: HashSet<String> = consumer_names.iter().cloned().collect();

        let mut producers = Vec::with_capacity(config.producers.len());
        for (index, profile) in config.producers.iter().enumerate() {
            let producer = Producer::new(profile.to_config(index, queue, mutex), engine.now())?;
            let name = profile.display_name(index);
            if !names.insert(name.clone()) {
                return Err(SimError::invalid_profile(format!(
                    "duplicate process name '{}'",
                    name
                )));
            }
            producers.push(engine.spawn(Box::new(producer)));
        }

        let consumers = consumer_names
            .into_iter()
            .map(|name| engine.spawn(Box::new(Consumer::new(name, queue))))
            .collect();

        Ok(Self {
            config,
            engine,
            queue,
            mutex,
            producers,
            consumers,
        })
    }

    /// Runs to the configured horizon and reports.
    pub fn run(&mut self) -> Result<SimReport, SimError> {
        self.run_until(self.config.horizon)?;
        Ok(self.report())
    }

    /// Runs up to (excluding) `until`. May be called repeatedly.
    pub fn run_until(&mut self, until: SimTime) -> Result<(), SimError> {
        self.engine.run(until)
    }

    /// Current virtual time.
    pub fn time(&self) -> SimTime {
        self.engine.now()
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &EventLoop {
        &self.engine
    }

    /// Number of producers.
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Number of consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Counters as of now.
    pub fn report(&self) -> SimReport {
        let mut report = SimReport::new(self.config.horizon, self.engine.now());
        report.dispatched = self.engine.dispatched();

        if let Some(queue) = self.engine.queue(self.queue) {
            report.queue_capacity = queue.capacity();
            report.queue_resident = queue.len();
            report.queue_high_water = queue.high_water();
            report.blocked_putters = queue.blocked_putters();
        }
        report.mutex_grants = self.engine.mutex(self.mutex).map_or(0, |m| m.grants());

        for process in self.engine.reports() {
            match process {
                ProcessReport::Producer(stats) => report.producers.push(stats),
                ProcessReport::Consumer(stats) => report.consumers.push(stats),
                ProcessReport::Other { .. } => {}
            }
        }
        report
    }
}
