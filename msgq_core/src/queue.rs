//! Bounded FIFO queue with blocking put/get semantics.
//!
//! The queue itself never schedules anything. `put` and `get` report what
//! happened and the event loop turns that into wakeups.

use crate::message::Message;
use msgq_env::{ProcessId, SimError};
use std::collections::VecDeque;

/// Result of offering a message to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Stored; the putter may continue.
    Stored,

    /// Stored and immediately taken by the earliest waiting getter.
    Handoff { getter: ProcessId, message: Message },

    /// Queue full; the putter waits with its message.
    Blocked,
}

/// Result of asking the queue for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// Head item taken. `admitted` is the blocked putter whose message took
    /// the freed slot, if any.
    Ready {
        message: Message,
        admitted: Option<ProcessId>,
    },

    /// Queue empty; the getter waits.
    Blocked,
}

/// FIFO store with a fixed capacity and FIFO wait lists on both sides.
#[derive(Debug, Clone)]
pub struct BoundedQueue {
    items: VecDeque<Message>,
    capacity: usize,

    /// Putters blocked on a full queue, with the message they carry
    putters: VecDeque<(ProcessId, Message)>,

    /// Getters blocked on an empty queue
    getters: VecDeque<ProcessId>,

    /// Highest residency ever observed
    high_water: usize,

    accepted: u64,
    delivered: u64,
}

impl BoundedQueue {
    /// Creates an empty queue.
    ///
    /// Fails with `SimError::Capacity` when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, SimError> {
        if capacity < 1 {
            return Err(SimError::Capacity(capacity));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            putters: VecDeque::new(),
            getters: VecDeque::new(),
            high_water: 0,
            accepted: 0,
            delivered: 0,
        })
    }

    /// Offers a message on behalf of `putter`.
    pub fn put(&mut self, putter: ProcessId, message: Message) -> PutOutcome {
        if self.items.len() >= self.capacity {
            self.putters.push_back((putter, message));
            return PutOutcome::Blocked;
        }

        self.items.push_back(message);
        self.accepted += 1;
        self.high_water = self.high_water.max(self.items.len());

        // Getters only wait on an empty queue, so the head is what was just put.
        if let Some(getter) = self.getters.pop_front() {
            if let Some(head) = self.items.pop_front() {
                self.delivered += 1;
                return PutOutcome::Handoff {
                    getter,
                    message: head,
                };
            }
            self.getters.push_front(getter);
        }

        PutOutcome::Stored
    }

    /// Takes the head item on behalf of `getter`.
    pub fn get(&mut self, getter: ProcessId) -> GetOutcome {
        let Some(message) = self.items.pop_front() else {
            self.getters.push_back(getter);
            return GetOutcome::Blocked;
        };
        self.delivered += 1;

        let admitted = self.putters.pop_front().map(|(putter, pending)| {
            self.items.push_back(pending);
            self.accepted += 1;
            putter
        });
        self.high_water = self.high_water.max(self.items.len());

        GetOutcome::Ready { message, admitted }
    }

    /// Fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently resident.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no item is resident.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resident items, head first.
    pub fn items(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }

    /// Number of putters blocked on a full queue.
    pub fn blocked_putters(&self) -> usize {
        self.putters.len()
    }

    /// Number of getters blocked on an empty queue.
    pub fn blocked_getters(&self) -> usize {
        self.getters.len()
    }

    /// Highest residency observed so far.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Messages accepted so far (including blocked puts once admitted).
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Messages handed to getters so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn msg(n: u64) -> Message {
        Message::new("p", n, 1)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(BoundedQueue::new(0).unwrap_err(), SimError::Capacity(0));
    }

    #[test]
    fn test_put_then_get() {
        let mut queue = BoundedQueue::new(2).unwrap();
        assert_eq!(queue.put(ProcessId(0), msg(1)), PutOutcome::Stored);
        assert_eq!(queue.put(ProcessId(0), msg(2)), PutOutcome::Stored);
        assert_eq!(queue.len(), 2);

        match queue.get(ProcessId(1)) {
            GetOutcome::Ready { message, admitted } => {
                assert_eq!(message.id, "p_1");
                assert_eq!(admitted, None);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_full_queue_blocks_then_admits_on_get() {
        let mut queue = BoundedQueue::new(1).unwrap();
        assert_eq!(queue.put(ProcessId(0), msg(1)), PutOutcome::Stored);
        assert_eq!(queue.put(ProcessId(1), msg(2)), PutOutcome::Blocked);
        assert_eq!(queue.put(ProcessId(2), msg(3)), PutOutcome::Blocked);
        assert_eq!(queue.blocked_putters(), 2);

        // The earliest blocked putter is admitted first
        match queue.get(ProcessId(9)) {
            GetOutcome::Ready { message, admitted } => {
                assert_eq!(message.id, "p_1");
                assert_eq!(admitted, Some(ProcessId(1)));
            }
            other => panic!("expected Ready, got {:?}", other),
        }
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items().next().unwrap().id, "p_2");
        assert_eq!(queue.high_water(), 1);
    }

    #[test]
    fn test_waiting_getters_served_in_order() {
        let mut queue = BoundedQueue::new(1).unwrap();
        assert_eq!(queue.get(ProcessId(5)), GetOutcome::Blocked);
        assert_eq!(queue.get(ProcessId(6)), GetOutcome::Blocked);

        assert_eq!(
            queue.put(ProcessId(0), msg(1)),
            PutOutcome::Handoff {
                getter: ProcessId(5),
                message: msg(1)
            }
        );
        assert_eq!(
            queue.put(ProcessId(0), msg(2)),
            PutOutcome::Handoff {
                getter: ProcessId(6),
                message: msg(2)
            }
        );
        assert!(queue.is_empty());
        assert_eq!(queue.accepted(), 2);
        assert_eq!(queue.delivered(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(usize),
        Get(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..4).prop_map(Op::Put),
            (4usize..8).prop_map(Op::Get),
        ]
    }

    proptest! {
        #[test]
        fn prop_fifo_and_bounded(capacity in 1usize..5, ops in prop::collection::vec(op(), 0..200)) {
            let mut queue = BoundedQueue::new(capacity).unwrap();
            let mut next = 0u64;
            let mut put_order = Vec::new();
            let mut delivered = Vec::new();

            for op in ops {
                match op {
                    Op::Put(p) => {
                        let message = Message::new(&format!("p{}", p), next, 1);
                        next += 1;
                        let id = message.id.clone();
                        match queue.put(ProcessId(p), message) {
                            PutOutcome::Stored => put_order.push(id),
                            PutOutcome::Handoff { message, .. } => {
                                put_order.push(id);
                                delivered.push(message.id);
                            }
                            // Blocked puts enter the order when admitted
                            PutOutcome::Blocked => {}
                        }
                    }
                    Op::Get(g) => {
                        let pending_head = queue.putters.front().map(|(_, m)| m.id.clone());
                        if let GetOutcome::Ready { message, admitted } = queue.get(ProcessId(g)) {
                            delivered.push(message.id);
                            if admitted.is_some() {
                                put_order.push(pending_head.unwrap());
                            }
                        }
                    }
                }
                prop_assert!(queue.len() <= capacity);
            }

            prop_assert_eq!(&put_order[..delivered.len()], &delivered[..]);
        }
    }
}
