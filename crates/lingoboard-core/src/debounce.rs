//! Keyed debouncing of pending writes.
//!
//! Each key holds at most one pending value. Scheduling a key again replaces
//! its value and pushes its deadline back. The caller drives time explicitly,
//! which keeps the debouncer usable from frame callbacks and tests alike.

use std::collections::HashMap;
use std::hash::Hash;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

/// Collapses bursts of updates per key into a single delayed emission.
#[derive(Debug, Clone)]
pub struct Debouncer<K, V> {
    delay: Duration,
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value` for `key`, replacing anything already pending.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) {
        self.schedule_with_delay(key, value, now, self.delay);
    }

    /// Schedule with a delay specific to this key.
    pub fn schedule_with_delay(&mut self, key: K, value: V, now: Instant, delay: Duration) {
        self.pending.insert(
            key,
            Pending {
                value,
                deadline: now + delay,
            },
        );
    }

    /// Remove and return every entry whose deadline has passed, oldest first.
    pub fn due(&mut self, now: Instant) -> Vec<(K, V)> {
        let mut ready: Vec<(K, Instant)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, p)| (k.clone(), p.deadline))
            .collect();
        ready.sort_by_key(|(_, deadline)| *deadline);

        ready
            .into_iter()
            .filter_map(|(key, _)| self.pending.remove(&key).map(|p| (key, p.value)))
            .collect()
    }

    /// Remove and return everything pending, regardless of deadlines.
    pub fn flush(&mut self) -> Vec<(K, V)> {
        let mut all: Vec<(K, Pending<V>)> = self.pending.drain().collect();
        all.sort_by_key(|(_, p)| p.deadline);
        all.into_iter().map(|(k, p)| (k, p.value)).collect()
    }

    /// Drop the pending value for `key`.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|p| p.value)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest deadline among pending entries.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn test_not_due_before_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("board", 1, start);

        assert!(debouncer.due(start + Duration::from_millis(499)).is_empty());
        assert_eq!(debouncer.due(start + DELAY), vec![("board", 1)]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_reschedule_replaces_and_delays() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("board", 1, start);
        debouncer.schedule("board", 2, start + Duration::from_millis(300));

        assert!(debouncer.due(start + DELAY).is_empty());
        assert_eq!(debouncer.due(start + Duration::from_millis(800)), vec![("board", 2)]);
    }

    #[test]
    fn test_keys_are_independent() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("a", 1, start);
        debouncer.schedule_with_delay("b", 2, start, Duration::from_millis(100));

        assert_eq!(debouncer.next_deadline(), Some(start + Duration::from_millis(100)));
        assert_eq!(debouncer.due(start + Duration::from_millis(200)), vec![("b", 2)]);
        assert!(debouncer.is_pending(&"a"));
    }

    #[test]
    fn test_due_is_oldest_first() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("late", 1, start + Duration::from_millis(50));
        debouncer.schedule("early", 2, start);

        let due = debouncer.due(start + Duration::from_secs(1));
        assert_eq!(due, vec![("early", 2), ("late", 1)]);
    }

    #[test]
    fn test_flush_and_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("a", 1, start);
        debouncer.schedule("b", 2, start);
        assert_eq!(debouncer.cancel(&"a"), Some(1));

        assert_eq!(debouncer.flush(), vec![("b", 2)]);
        assert!(debouncer.is_empty());
        assert!(debouncer.flush().is_empty());
    }
}
