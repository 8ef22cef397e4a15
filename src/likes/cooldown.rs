//! Per-key write cooldown
//!
//! Remembers when each (image key, operation) pair was last accepted and
//! rejects a repeat inside the window. The registry holds at most
//! `capacity` pairs: expired pairs are pruned first, then the least recently
//! accepted pair goes.
//!
//! With more live pairs than `capacity`, an evicted pair is forgotten before
//! its window ends and may repeat early. Size `capacity` above the number of
//! distinct keys expected inside one window.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Like,
    Unlike,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Like => "like",
            Operation::Unlike => "unlike",
        }
    }
}

type Pair = (String, Operation);

#[derive(Debug)]
pub struct CooldownRegistry {
    window: Duration,
    capacity: usize,
    last_accepted: HashMap<Pair, Instant>,
    /// Accept order, oldest first. An entry whose instant no longer matches
    /// `last_accepted` was superseded by a later accept and is skipped.
    order: VecDeque<(Pair, Instant)>,
}

impl CooldownRegistry {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            last_accepted: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    /// Whether `op` on `key` may proceed at `now`. Does not record anything.
    pub fn is_allowed(&self, key: &str, op: Operation, now: Instant) -> bool {
        match self.last_accepted.get(&(key.to_string(), op)) {
            Some(&last) => now.saturating_duration_since(last) >= self.window,
            None => true,
        }
    }

    /// Record an accepted operation
    pub fn record(&mut self, key: &str, op: Operation, now: Instant) {
        let pair = (key.to_string(), op);
        if !self.last_accepted.contains_key(&pair) && self.last_accepted.len() >= self.capacity {
            self.make_room(now);
        }
        self.last_accepted.insert(pair.clone(), now);
        self.order.push_back((pair, now));

        // repeat accepts of live pairs leave superseded entries behind
        if self.order.len() > self.capacity * 2 {
            let last_accepted = &self.last_accepted;
            self.order
                .retain(|(pair, at)| last_accepted.get(pair) == Some(at));
        }
    }

    /// Drop expired pairs from the front of the accept order, evicting the
    /// oldest live pair as well if that is not enough.
    fn make_room(&mut self, now: Instant) {
        let before = self.last_accepted.len();

        while let Some((pair, at)) = self.order.pop_front() {
            if self.last_accepted.get(&pair) != Some(&at) {
                continue;
            }
            let expired = now.saturating_duration_since(at) >= self.window;
            if !expired && self.last_accepted.len() < self.capacity {
                self.order.push_front((pair, at));
                break;
            }
            self.last_accepted.remove(&pair);
        }

        debug!(
            evicted = before - self.last_accepted.len(),
            remaining = self.last_accepted.len(),
            "cooldown registry pruned"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_repeat_inside_window_is_rejected() {
        let mut registry = CooldownRegistry::new(WINDOW, 16);
        let t0 = Instant::now();

        assert!(registry.is_allowed("x", Operation::Like, t0));
        registry.record("x", Operation::Like, t0);

        assert!(!registry.is_allowed("x", Operation::Like, t0 + Duration::from_millis(999)));
        assert!(registry.is_allowed("x", Operation::Like, t0 + WINDOW));

        // kinds and keys are gated independently
        assert!(registry.is_allowed("x", Operation::Unlike, t0));
        assert!(registry.is_allowed("y", Operation::Like, t0));
    }

    #[test]
    fn test_registry_stays_bounded() {
        let mut registry = CooldownRegistry::new(WINDOW, 3);
        let t0 = Instant::now();

        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            registry.record(key, Operation::Like, t0 + Duration::from_millis(i as u64));
        }
        assert_eq!(registry.len(), 3);

        // all live: the oldest ("a") is evicted
        registry.record("d", Operation::Like, t0 + Duration::from_millis(10));
        assert_eq!(registry.len(), 3);
        assert!(registry.is_allowed("a", Operation::Like, t0 + Duration::from_millis(10)));
        assert!(!registry.is_allowed("b", Operation::Like, t0 + Duration::from_millis(10)));

        // everything but "d" has expired by now
        let later = t0 + Duration::from_millis(1005);
        registry.record("e", Operation::Like, later);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_allowed("d", Operation::Like, later));
    }

    #[test]
    fn test_reaccepted_pair_counts_as_fresh() {
        let mut registry = CooldownRegistry::new(WINDOW, 2);
        let t0 = Instant::now();

        registry.record("a", Operation::Like, t0);
        registry.record("b", Operation::Like, t0 + Duration::from_millis(100));
        registry.record("a", Operation::Like, t0 + Duration::from_millis(500));

        // "b" is now the least recently accepted pair
        let now = t0 + Duration::from_millis(600);
        registry.record("c", Operation::Like, now);
        assert_eq!(registry.len(), 2);
        assert!(registry.is_allowed("b", Operation::Like, now));
        assert!(!registry.is_allowed("a", Operation::Like, now));
        assert!(!registry.is_allowed("c", Operation::Like, now));
    }

    #[test]
    fn test_accept_order_stays_bounded_under_repeats() {
        let mut registry = CooldownRegistry::new(WINDOW, 4);
        let t0 = Instant::now();

        for i in 0..100u64 {
            let key = if i % 2 == 0 { "x" } else { "y" };
            registry.record(key, Operation::Unlike, t0 + Duration::from_secs(i));
        }

        assert_eq!(registry.len(), 2);
        assert!(registry.order.len() <= 8);
    }
}
