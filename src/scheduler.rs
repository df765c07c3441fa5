//! Global discrete-event scheduler (spec 4.1).
//!
//! A single min-priority-queue over `(timestamp, insertion_seq, event)`.
//! The design mirrors `labs/40-task-scheduler/src/solution.rs`'s
//! `BinaryHeap`-backed scheduler: `BinaryHeap` is a max-heap, so the
//! ordering is reversed to make the *earliest* timestamp the highest
//! priority, and an explicit sequence number breaks ties deterministically
//! (spec 5: "FIFO per timestamp is acceptable").

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::event::ScheduledEvent;

struct QueueEntry {
    timestamp: f64,
    seq: u64,
    event: ScheduledEvent,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want min-timestamp-first,
        // then min-seq-first (oldest insertion first) on ties.
        other
            .timestamp
            .total_cmp(&self.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The simulation's single global event queue.
pub struct Scheduler {
    queue: BinaryHeap<QueueEntry>,
    next_seq: u64,
    terminated: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            next_seq: 0,
            terminated: false,
        }
    }

    /// Enqueue an event. Debug-asserts against pushing after termination,
    /// per spec 4.1 ("Fails with `AlreadyTerminated`... optional debug
    /// assert").
    pub fn push(&mut self, timestamp: f64, kind: crate::event::EventKind) {
        debug_assert!(!self.terminated, "pushed an event after scheduler termination");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(QueueEntry {
            timestamp,
            seq,
            event: ScheduledEvent { timestamp, kind },
        });
    }

    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.queue.pop().map(|entry| entry.event)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn mark_terminated(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn pops_in_timestamp_order() {
        let mut s = Scheduler::new();
        s.push(5.0, EventKind::BlockGen { generator: 0 });
        s.push(1.0, EventKind::BlockGen { generator: 1 });
        s.push(3.0, EventKind::BlockGen { generator: 2 });

        let order: Vec<f64> = std::iter::from_fn(|| s.pop()).map(|e| e.timestamp).collect();
        assert_eq!(order, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn ties_break_fifo_by_insertion_order() {
        let mut s = Scheduler::new();
        s.push(1.0, EventKind::BlockGen { generator: 10 });
        s.push(1.0, EventKind::BlockGen { generator: 20 });
        s.push(1.0, EventKind::BlockGen { generator: 30 });

        let ids: Vec<usize> = std::iter::from_fn(|| s.pop())
            .map(|e| match e.kind {
                EventKind::BlockGen { generator } => generator,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn empty_queue_pops_none() {
        let mut s = Scheduler::new();
        assert!(s.is_empty());
        assert!(s.pop().is_none());
    }
}
