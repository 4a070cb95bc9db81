//! Per-key debounce deadlines for coalescing change bursts.

use std::collections::HashMap;
use tokio::time::{Duration, Instant};

/// Tracks one deadline per key. Scheduling a key again pushes its deadline
/// out, so a burst of changes to the same key flushes once.
pub struct Debouncer {
    delay: Duration,
    deadlines: HashMap<String, Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, key: impl Into<String>) {
        self.deadlines.insert(key.into(), Instant::now() + self.delay);
    }

    /// Earliest pending deadline, if any. Feed this to `sleep_until`.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every key whose deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let due: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }

    /// Removes and returns every pending key regardless of deadline.
    pub fn take_all(&mut self) -> Vec<String> {
        self.deadlines.drain().map(|(key, _)| key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
