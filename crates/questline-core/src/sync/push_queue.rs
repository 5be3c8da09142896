//! Debounced push queue.
//!
//! Each key holds at most one pending value. Enqueuing again replaces the
//! value and pushes the deadline back, so a burst of updates collapses
//! into a single push of the last one.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    debounce_until: Instant,
}

#[derive(Debug, Clone)]
pub struct DebounceQueue<K, V> {
    pending: HashMap<K, Pending<V>>,
    window: Duration,
}

impl<K: Eq + Hash + Clone, V> DebounceQueue<K, V> {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Enqueue `value` for `key`, replacing any pending value.
    pub fn enqueue(&mut self, key: K, value: V, now: Instant) {
        self.pending.insert(
            key,
            Pending {
                value,
                debounce_until: now + self.window,
            },
        );
    }

    /// Remove and return every entry whose quiet period is over.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<(K, V)> {
        let ready: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.debounce_until <= now)
            .map(|(k, _)| k.clone())
            .collect();
        ready
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p.value)))
            .collect()
    }

    /// Remove and return everything regardless of deadline.
    pub fn drain_all(&mut self) -> Vec<(K, V)> {
        self.pending.drain().map(|(k, p)| (k, p.value)).collect()
    }

    /// Earliest deadline among pending entries.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.debounce_until).min()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
