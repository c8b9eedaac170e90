//! Per-key debounce timers
//!
//! Holds at most one armed timer per key. Arming a key again aborts the
//! timer it replaces.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::task::AbortHandle;

/// Identifies one arming of a key
///
/// A timer task that already woke up can still lose the race against a
/// newer edit for the same key; comparing generations tells it so.
pub type Generation = u64;

struct ArmedTimer {
    generation: Generation,
    handle: AbortHandle,
}

/// Registry of pending timers, keyed by field
pub struct TimerRegistry<K> {
    timers: HashMap<K, ArmedTimer>,
    next_generation: Generation,
}

impl<K> TimerRegistry<K> {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Allocate the generation for the next `arm`
    pub fn next_generation(&mut self) -> Generation {
        self.next_generation += 1;
        self.next_generation
    }

    /// Number of armed timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Abort every armed timer and return the keys they belonged to
    pub fn drain(&mut self) -> Vec<K> {
        self.timers
            .drain()
            .map(|(key, timer)| {
                timer.handle.abort();
                key
            })
            .collect()
    }

    /// Abort every armed timer, returning how many there were
    pub fn clear(&mut self) -> usize {
        self.drain().len()
    }
}

impl<K: Eq + Hash> TimerRegistry<K> {
    /// Register the timer for `key`
    ///
    /// Returns true when a pending timer was superseded (and aborted).
    pub fn arm(&mut self, key: K, generation: Generation, handle: AbortHandle) -> bool {
        match self.timers.insert(key, ArmedTimer { generation, handle }) {
            Some(previous) => {
                previous.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort the pending timer for `key`, if any
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.timers.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Called by a timer when it fires
    ///
    /// Removes the entry and returns true only if `generation` is still the
    /// current arming of `key`. A stale timer gets false and must not commit.
    pub fn fire(&mut self, key: &K, generation: Generation) -> bool {
        let current = self.timers.get(key).map(|timer| timer.generation);
        if current == Some(generation) {
            self.timers.remove(key);
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.timers.contains_key(key)
    }
}

impl<K> Default for TimerRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for TimerRegistry<K> {
    fn drop(&mut self) {
        self.clear();
    }
}
