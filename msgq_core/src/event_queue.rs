//! Event queue with deterministic ordering.

use crate::process::Wake;
use msgq_env::{ProcessId, SimTime};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A pending wakeup.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO among events due at the same time)
///
/// The process id and wake value do not take part in ordering; sequence
/// numbers are unique so the order is total.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    /// When the process should be resumed.
    pub time: SimTime,
    /// Creation counter, strictly increasing per queue.
    pub sequence: u64,
    /// Which process to resume.
    pub process: ProcessId,
    /// Value handed back to the process on resumption.
    pub wake: Wake,
}

impl ScheduledEvent {
    fn key(&self) -> (SimTime, u64) {
        (self.time, self.sequence)
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of scheduled events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_sequence: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a wakeup and returns its sequence number.
    ///
    /// Does not check `time` against any clock; that is the event loop's job.
    pub fn push(&mut self, time: SimTime, process: ProcessId, wake: Wake) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Reverse(ScheduledEvent {
            time,
            sequence,
            process,
            wake,
        }));
        sequence
    }

    /// Removes and returns the earliest event.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop().map(|Reverse(event)| event)
    }

    /// Time of the earliest event, if any.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(event)| event.time)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earlier_time_first() {
        let mut queue = EventQueue::new();
        queue.push(20, ProcessId(0), Wake::Timeout);
        queue.push(10, ProcessId(1), Wake::Timeout);

        let first = queue.pop().unwrap();
        assert_eq!(first.time, 10);
        assert_eq!(first.process, ProcessId(1));
        assert_eq!(queue.pop().unwrap().time, 20);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut queue = EventQueue::new();
        for pid in [3, 1, 2] {
            queue.push(5, ProcessId(pid), Wake::Timeout);
        }

        let order: Vec<usize> = std::iter::from_fn(|| queue.pop())
            .map(|e| e.process.index())
            .collect();
        assert_eq!(order, vec![3, 1, 2], "Same-time events must keep insertion order");
    }

    #[test]
    fn test_sequence_strictly_increasing() {
        let mut queue = EventQueue::new();
        let a = queue.push(0, ProcessId(0), Wake::Start);
        let b = queue.push(0, ProcessId(0), Wake::Start);
        assert!(b > a);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_time(), Some(0));
    }
}
