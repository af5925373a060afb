//! Timer queue
//!
//! The one scheduling primitive in the crate. Tasks are keyed by due time
//! (ms) and drained in order by whoever owns the queue, normally once per
//! display frame. Tasks with equal due times fire in insertion order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry<T> {
    due_ms: f64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so BinaryHeap (a max-heap) pops the earliest entry first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .total_cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of pending tasks
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `task` at absolute time `due_ms`
    pub fn schedule_at(&mut self, due_ms: f64, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due_ms, seq, task });
    }

    /// Schedule `task` `delay_ms` after `now_ms`
    pub fn schedule_after(&mut self, now_ms: f64, delay_ms: f64, task: T) {
        self.schedule_at(now_ms + delay_ms.max(0.0), task);
    }

    /// Pop the earliest task if it is due at `now_ms`
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, T)> {
        if self.heap.peek()?.due_ms <= now_ms {
            self.heap.pop().map(|e| (e.due_ms, e.task))
        } else {
            None
        }
    }

    /// Drain every task due at `now_ms`, earliest first
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<(f64, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.pop_due(now_ms) {
            due.push(entry);
        }
        due
    }

    /// Due time of the next task
    pub fn next_due(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.due_ms)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
