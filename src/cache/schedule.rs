//! Expiry Schedule Module
//!
//! Min-heap of pending expirations, standing in for per-entry timers.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

// == Expiry Schedule ==
/// Tracks one armed expiry deadline per key.
///
/// Cancelling or re-arming a key bumps its generation; stale heap slots are
/// skipped when popped and compacted away once they dominate the heap.
#[derive(Debug, Default)]
pub struct ExpirySchedule {
    /// (deadline, generation, key), earliest deadline on top
    heap: BinaryHeap<Reverse<(u64, u64, String)>>,
    /// Live generation per armed key
    armed: HashMap<String, u64>,
    next_generation: u64,
}

impl ExpirySchedule {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Arm ==
    /// Arms (or re-arms) the expiry for `key`. Any earlier deadline is cancelled.
    pub fn arm(&mut self, key: &str, deadline: u64) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.armed.insert(key.to_string(), generation);
        self.heap.push(Reverse((deadline, generation, key.to_string())));
        self.maybe_compact();
    }

    // == Cancel ==
    /// Cancels the pending expiry for `key`, returning whether one was armed.
    pub fn cancel(&mut self, key: &str) -> bool {
        let cancelled = self.armed.remove(key).is_some();
        self.maybe_compact();
        cancelled
    }

    // == Pop Due ==
    /// Removes and returns every key whose deadline has passed at `now`.
    ///
    /// A deadline is due when `now > deadline`, matching entry expiry.
    pub fn pop_due(&mut self, now: u64) -> Vec<String> {
        let mut due = Vec::new();

        while let Some(Reverse((deadline, _, _))) = self.heap.peek() {
            if *deadline >= now {
                break;
            }
            let Some(Reverse((_, generation, key))) = self.heap.pop() else {
                break;
            };
            if self.armed.get(&key) == Some(&generation) {
                self.armed.remove(&key);
                due.push(key);
            }
        }

        due
    }

    /// Number of armed expirations.
    pub fn pending(&self) -> usize {
        self.armed.len()
    }

    /// Cancels everything.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.armed.clear();
    }

    fn maybe_compact(&mut self) {
        if self.heap.len() <= 64 || self.heap.len() <= self.armed.len() * 2 {
            return;
        }
        let armed = &self.armed;
        self.heap
            .retain(|Reverse((_, generation, key))| armed.get(key) == Some(generation));
    }
}
