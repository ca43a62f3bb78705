//! `EventScheduler`: time-ordered queue with stable ties.
//!
//! Backed by a `BTreeMap<Timestamp, Vec<T>>`: items due at the same instant
//! come out in insertion order, which is what makes a seeded run replay
//! identically.

use std::collections::BTreeMap;

use fleet_core::Timestamp;

use crate::SimulatedEvent;

pub struct EventScheduler<T = SimulatedEvent> {
    slots: BTreeMap<Timestamp, Vec<T>>,
    len:   usize,
}

impl<T> EventScheduler<T> {
    pub fn new() -> Self {
        Self { slots: BTreeMap::new(), len: 0 }
    }

    pub fn schedule(&mut self, at: Timestamp, item: T) {
        self.slots.entry(at).or_default().push(item);
        self.len += 1;
    }

    /// Remove and return every item due at or before `up_to`, in time order.
    pub fn pop_due(&mut self, up_to: Timestamp) -> Vec<(Timestamp, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.slots.first_entry() {
            if *entry.key() > up_to {
                break;
            }
            let (at, items) = entry.remove_entry();
            self.len -= items.len();
            due.extend(items.into_iter().map(|item| (at, item)));
        }
        due
    }

    /// Earliest scheduled time, if any.
    pub fn next_time(&self) -> Option<Timestamp> {
        self.slots.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }
}

impl<T> Default for EventScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
