//! The virtual-time event loop.
//!
//! Owns the clock, the schedule of pending wakeups, every registered process
//! and the shared resources (queues and mutexes) they synchronize through.
//! Exactly one process runs at any instant; processes resumed at the same
//! virtual time run in the order their wakeups were scheduled.

use crate::event_queue::{EventQueue, ScheduledEvent};
use crate::mutex::PriorityMutex;
use crate::process::{Context, Process, ProcessReport, Suspend, Wake};
use crate::queue::{BoundedQueue, GetOutcome, PutOutcome};

use msgq_env::{MutexId, ProcessId, QueueId, SharedSink, SimError, SimTime};

/// A registered process and the name it is known by.
struct Slot {
    name: String,
    process: Box<dyn Process>,
}

/// Discrete-event scheduler over a single virtual clock.
pub struct EventLoop {
    /// Current virtual time
    now: SimTime,

    /// Pending wakeups
    events: EventQueue,

    /// Registered processes, indexed by `ProcessId`
    processes: Vec<Slot>,

    queues: Vec<BoundedQueue>,
    mutexes: Vec<PriorityMutex>,

    /// Where processes report what they do
    sink: SharedSink,

    /// Number of events dispatched so far
    dispatched: u64,
}

impl EventLoop {
    /// Creates an empty loop at t=0.
    pub fn new(sink: SharedSink) -> Self {
        Self {
            now: 0,
            events: EventQueue::new(),
            processes: Vec::new(),
            queues: Vec::new(),
            mutexes: Vec::new(),
            sink,
            dispatched: 0,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Returns the sink handed to processes.
    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Creates a bounded queue owned by this loop.
    pub fn add_queue(&mut self, capacity: usize) -> Result<QueueId, SimError> {
        let queue = BoundedQueue::new(capacity)?;
        self.queues.push(queue);
        Ok(QueueId(self.queues.len() - 1))
    }

    /// Creates a priority mutex owned by this loop.
    pub fn add_mutex(&mut self) -> MutexId {
        self.mutexes.push(PriorityMutex::new());
        MutexId(self.mutexes.len() - 1)
    }

    /// Registers a process and schedules its first resumption now.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> ProcessId {
        let pid = self.register(process);
        self.events.push(self.now, pid, Wake::Start);
        pid
    }

    /// Registers a process whose first resumption happens at `at`.
    pub fn spawn_at(&mut self, process: Box<dyn Process>, at: SimTime) -> Result<ProcessId, SimError> {
        let pid = self.register(process);
        self.schedule_wake(pid, at, Wake::Start)?;
        Ok(pid)
    }

    /// Schedules a plain timeout wakeup for `process` at `at`.
    ///
    /// Fails with `SimError::TimeTravel` when `at` is before the clock.
    pub fn schedule(&mut self, process: ProcessId, at: SimTime) -> Result<(), SimError> {
        if process.0 >= self.processes.len() {
            return Err(SimError::UnknownProcess(process));
        }
        self.schedule_wake(process, at, Wake::Timeout)
    }

    /// Dispatches events due strictly before `until`, then sets the clock to
    /// `until`.
    ///
    /// Events at exactly `until` stay pending, so a later `run` picks them up.
    pub fn run(&mut self, until: SimTime) -> Result<(), SimError> {
        if until < self.now {
            return Err(SimError::TimeTravel {
                process: "event loop".to_string(),
                now: self.now,
                requested: until,
            });
        }

        while let Some(time) = self.events.peek_time() {
            if time >= until {
                break;
            }
            self.step()?;
        }

        self.now = until;
        Ok(())
    }

    /// Dispatches the single earliest event.
    ///
    /// Returns false when nothing is scheduled.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(event) = self.events.pop() else {
            return Ok(false);
        };

        // Every push is checked against the clock, so time never goes backward.
        debug_assert!(event.time >= self.now);
        self.now = event.time;
        self.dispatch(event)?;
        Ok(true)
    }

    /// Number of pending wakeups.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Time of the next pending wakeup.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.events.peek_time()
    }

    /// Number of events dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Read access to a queue.
    pub fn queue(&self, id: QueueId) -> Option<&BoundedQueue> {
        self.queues.get(id.0)
    }

    /// Read access to a mutex.
    pub fn mutex(&self, id: MutexId) -> Option<&PriorityMutex> {
        self.mutexes.get(id.0)
    }

    /// Number of registered processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Name of a registered process.
    pub fn process_name(&self, id: ProcessId) -> Option<&str> {
        self.processes.get(id.0).map(|slot| slot.name.as_str())
    }

    /// Final counters of every process, in registration order.
    pub fn reports(&self) -> Vec<ProcessReport> {
        self.processes.iter().map(|slot| slot.process.report()).collect()
    }

    fn register(&mut self, process: Box<dyn Process>) -> ProcessId {
        let name = process.name().to_string();
        self.processes.push(Slot { name, process });
        ProcessId(self.processes.len() - 1)
    }

    fn name_of(&self, id: ProcessId) -> String {
        self.process_name(id).unwrap_or("<unknown>").to_string()
    }

    fn schedule_wake(&mut self, process: ProcessId, at: SimTime, wake: Wake) -> Result<(), SimError> {
        if at < self.now {
            return Err(SimError::TimeTravel {
                process: self.name_of(process),
                now: self.now,
                requested: at,
            });
        }
        self.events.push(at, process, wake);
        Ok(())
    }

    fn dispatch(&mut self, event: ScheduledEvent) -> Result<(), SimError> {
        let pid = event.process;
        let Slot { name, process } = self
            .processes
            .get_mut(pid.0)
            .ok_or(SimError::UnknownProcess(pid))?;

        let mut ctx = Context {
            now: self.now,
            pid,
            name: name.as_str(),
            mutexes: &mut self.mutexes,
            events: &mut self.events,
            sink: self.sink.as_ref(),
        };
        let request = process.resume(&mut ctx, event.wake)?;

        self.dispatched += 1;
        self.submit(pid, request)
    }

    /// Satisfies a suspension request now if possible, otherwise parks the
    /// process on the resource it asked for.
    fn submit(&mut self, pid: ProcessId, request: Suspend) -> Result<(), SimError> {
        let now = self.now;
        match request {
            Suspend::WaitUntil(at) => self.schedule_wake(pid, at, Wake::Timeout)?,

            Suspend::Acquire { mutex, priority } => {
                let lock = self
                    .mutexes
                    .get_mut(mutex.0)
                    .ok_or(SimError::UnknownMutex(mutex))?;
                if lock.acquire(pid, priority) {
                    self.events.push(now, pid, Wake::Acquired(mutex));
                }
            }

            Suspend::Enqueue { queue, message } => {
                let store = self
                    .queues
                    .get_mut(queue.0)
                    .ok_or(SimError::UnknownQueue(queue))?;
                match store.put(pid, message) {
                    PutOutcome::Stored => {
                        self.events.push(now, pid, Wake::Enqueued);
                    }
                    PutOutcome::Handoff { getter, message } => {
                        self.events.push(now, pid, Wake::Enqueued);
                        self.events.push(now, getter, Wake::Dequeued(message));
                    }
                    PutOutcome::Blocked => {}
                }
            }

            Suspend::Dequeue { queue } => {
                let store = self
                    .queues
                    .get_mut(queue.0)
                    .ok_or(SimError::UnknownQueue(queue))?;
                match store.get(pid) {
                    GetOutcome::Ready { message, admitted } => {
                        self.events.push(now, pid, Wake::Dequeued(message));
                        if let Some(putter) = admitted {
                            self.events.push(now, putter, Wake::Enqueued);
                        }
                    }
                    GetOutcome::Blocked => {}
                }
            }

            Suspend::Exit => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgq_env::{MemorySink, NullSink};
    use std::sync::{Arc, Mutex};

    /// Wakes every `interval` ticks and records when.
    struct Ticker {
        name: String,
        interval: SimTime,
        seen: Arc<Mutex<Vec<(String, SimTime)>>>,
    }

    impl Process for Ticker {
        fn name(&self) -> &str {
            &self.name
        }

        fn resume(&mut self, ctx: &mut Context<'_>, _wake: Wake) -> Result<Suspend, SimError> {
            self.seen.lock().unwrap().push((self.name.clone(), ctx.now()));
            Ok(Suspend::WaitUntil(ctx.now() + self.interval))
        }
    }

    /// Asks to be woken in the past on its second resumption.
    struct TimeTraveler;

    impl Process for TimeTraveler {
        fn name(&self) -> &str {
            "traveler"
        }

        fn resume(&mut self, ctx: &mut Context<'_>, wake: Wake) -> Result<Suspend, SimError> {
            match wake {
                Wake::Start => Ok(Suspend::WaitUntil(10)),
                _ => Ok(Suspend::WaitUntil(ctx.now() - 5)),
            }
        }
    }

    /// Takes the mutex, holds it for `hold` ticks, releases, exits.
    struct Locker {
        name: String,
        mutex: MutexId,
        priority: i64,
        hold: SimTime,
        grants: Arc<Mutex<Vec<String>>>,
    }

    impl Process for Locker {
        fn name(&self) -> &str {
            &self.name
        }

        fn resume(&mut self, ctx: &mut Context<'_>, wake: Wake) -> Result<Suspend, SimError> {
            match wake {
                Wake::Start => Ok(Suspend::Acquire {
                    mutex: self.mutex,
                    priority: self.priority,
                }),
                Wake::Acquired(_) => {
                    self.grants.lock().unwrap().push(self.name.clone());
                    Ok(Suspend::WaitUntil(ctx.now() + self.hold))
                }
                Wake::Timeout => {
                    ctx.release(self.mutex)?;
                    Ok(Suspend::Exit)
                }
                other => Err(ctx.unexpected(&other)),
            }
        }
    }

    fn locker(name: &str, mutex: MutexId, priority: i64, hold: SimTime, grants: &Arc<Mutex<Vec<String>>>) -> Box<Locker> {
        Box::new(Locker {
            name: name.to_string(),
            mutex,
            priority,
            hold,
            grants: Arc::clone(grants),
        })
    }

    #[test]
    fn test_run_stops_before_horizon() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sim = EventLoop::new(NullSink::shared());
        sim.spawn(Box::new(Ticker {
            name: "t".to_string(),
            interval: 20,
            seen: Arc::clone(&seen),
        }));

        sim.run(100).unwrap();

        let times: Vec<SimTime> = seen.lock().unwrap().iter().map(|(_, t)| *t).collect();
        assert_eq!(times, vec![0, 20, 40, 60, 80]);
        assert_eq!(sim.now(), 100);
        assert_eq!(sim.next_event_time(), Some(100), "Event at the horizon stays pending");

        // Resuming the run picks it up
        sim.run(101).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_same_time_runs_in_schedule_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sim = EventLoop::new(NullSink::shared());
        for (name, interval) in [("a", 10), ("b", 5), ("c", 10)] {
            sim.spawn(Box::new(Ticker {
                name: name.to_string(),
                interval,
                seen: Arc::clone(&seen),
            }));
        }

        sim.run(11).unwrap();

        let order: Vec<(String, SimTime)> = seen.lock().unwrap().clone();
        let at_ten: Vec<&str> = order
            .iter()
            .filter(|(_, t)| *t == 10)
            .map(|(n, _)| n.as_str())
            .collect();
        // b rescheduled for 10 at t=5, after a and c did at t=0
        assert_eq!(at_ten, vec!["a", "c", "b"]);

        let times: Vec<SimTime> = order.iter().map(|(_, t)| *t).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_time_travel_aborts_run() {
        let mut sim = EventLoop::new(NullSink::shared());
        sim.spawn(Box::new(TimeTraveler));

        let err = sim.run(100).unwrap_err();
        assert_eq!(
            err,
            SimError::TimeTravel {
                process: "traveler".to_string(),
                now: 10,
                requested: 5,
            }
        );
    }

    #[test]
    fn test_schedule_in_past_rejected() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sim = EventLoop::new(NullSink::shared());
        let pid = sim.spawn(Box::new(Ticker {
            name: "t".to_string(),
            interval: 50,
            seen,
        }));
        sim.run(30).unwrap();

        assert!(matches!(sim.schedule(pid, 29), Err(SimError::TimeTravel { .. })));
        assert!(sim.schedule(pid, 30).is_ok());
        assert_eq!(sim.schedule(ProcessId(7), 40), Err(SimError::UnknownProcess(ProcessId(7))));
        assert!(sim.run(10).is_err());
    }

    #[test]
    fn test_priority_waiter_granted_first() {
        let grants = Arc::new(Mutex::new(Vec::new()));
        let mut sim = EventLoop::new(NullSink::shared());
        let mutex = sim.add_mutex();

        sim.spawn(locker("holder", mutex, 0, 10, &grants));
        // Both arrive at t=1 while the mutex is held; priority 8 asks first
        sim.spawn_at(locker("low", mutex, 8, 1, &grants), 1).unwrap();
        sim.spawn_at(locker("high", mutex, 2, 1, &grants), 1).unwrap();

        sim.run(100).unwrap();

        assert_eq!(*grants.lock().unwrap(), vec!["holder", "high", "low"]);
        assert!(!sim.mutex(mutex).unwrap().is_held());
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn test_release_without_holding_is_error() {
        struct Rogue(MutexId);

        impl Process for Rogue {
            fn name(&self) -> &str {
                "rogue"
            }

            fn resume(&mut self, ctx: &mut Context<'_>, _wake: Wake) -> Result<Suspend, SimError> {
                ctx.release(self.0)?;
                Ok(Suspend::Exit)
            }
        }

        let mut sim = EventLoop::new(NullSink::shared());
        let mutex = sim.add_mutex();
        sim.spawn(Box::new(Rogue(mutex)));

        let err = sim.run(1).unwrap_err();
        assert!(matches!(err, SimError::NotHolder { time: 0, .. }));
    }

    #[test]
    fn test_released_events_are_traced() {
        let sink = MemorySink::new();
        let grants = Arc::new(Mutex::new(Vec::new()));
        let mut sim = EventLoop::new(Arc::new(sink.clone()));
        let mutex = sim.add_mutex();
        sim.spawn(locker("solo", mutex, 0, 3, &grants));

        sim.run(10).unwrap();

        let released = sink.for_process("solo");
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].time, 3);
        assert_eq!(sim.dispatched(), 3);
    }

    #[test]
    fn test_zero_capacity_queue_rejected() {
        let mut sim = EventLoop::new(NullSink::shared());
        assert_eq!(sim.add_queue(0), Err(SimError::Capacity(0)));
        assert_eq!(sim.add_queue(3), Ok(QueueId(0)));
        assert_eq!(sim.queue(QueueId(0)).unwrap().capacity(), 3);
    }
}
