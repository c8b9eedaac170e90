//! Edit coalescing
//!
//! Every edit updates the key's shadow value immediately and re-arms the
//! key's debounce timer. When a quiet period passes without another edit
//! to the same key, the sink receives the shadow value exactly once.
//!
//! Per key:
//! ```text
//! Idle --edit--> Pending --quiet period--> Idle      (commit issued)
//!                Pending --edit----------> Pending   (timer re-armed)
//!                Pending --abandon/drop--> Abandoned (no commit)
//! ```
//!
//! Keys are independent: commits for different keys are not ordered
//! relative to each other.

use crate::config::{CoalescerConfig, ConfigError};
use crate::debounce::{Generation, TimerRegistry};
use crate::sink::CommitSink;
use crate::stats::{CoalescerStats, StatsSnapshot};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Shadow values and armed timers; only touched under the lock
struct EditState<K, V> {
    shadows: HashMap<K, V>,
    timers: TimerRegistry<K>,
    /// Sink calls started and not yet finished
    in_flight: usize,
}

impl<K, V> EditState<K, V> {
    fn is_idle(&self) -> bool {
        self.timers.is_empty() && self.in_flight == 0
    }
}

struct Shared<K, V, S> {
    state: Mutex<EditState<K, V>>,
    sink: S,
    stats: CoalescerStats,
    /// Signalled whenever the state may have become idle
    idle: Notify,
}

impl<K, V, S> Shared<K, V, S> {
    fn notify_if_idle(&self, state: &EditState<K, V>) {
        if state.is_idle() {
            self.idle.notify_waiters();
        }
    }
}

/// Counts one sink call as in flight until dropped
///
/// Must be created under the same lock acquisition that took the value,
/// right after incrementing `in_flight`.
struct InFlight<'a, K, V, S> {
    shared: &'a Shared<K, V, S>,
}

impl<K, V, S> Drop for InFlight<'_, K, V, S> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.in_flight -= 1;
        self.shared.notify_if_idle(&state);
    }
}

impl<K, V, S> Shared<K, V, S>
where
    K: Debug + Send + 'static,
    V: Send + 'static,
    S: CommitSink<K, V>,
{
    async fn commit(&self, key: K, value: V) -> bool {
        let label = format!("{:?}", key);
        match self.sink.commit(key, value).await {
            Ok(()) => {
                self.stats.record_commit(true);
                debug!(key = %label, "Committed coalesced edit");
                true
            }
            Err(e) => {
                self.stats.record_commit(false);
                warn!(key = %label, error = %e, "Commit sink failed");
                false
            }
        }
    }
}

/// Coalesces edits per key and commits each settled value once
///
/// The coalescer exclusively owns its shadow values and timers. Dropping it
/// aborts every pending timer, so the sink is never invoked on behalf of an
/// editing context that is gone. Commits already handed to the sink are
/// left to finish.
///
/// Must be used from within a Tokio runtime: timers are Tokio tasks.
pub struct EditCoalescer<K, V, S> {
    shared: Arc<Shared<K, V, S>>,
    config: CoalescerConfig,
}

impl<K, V, S> EditCoalescer<K, V, S>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + 'static,
    S: CommitSink<K, V>,
{
    /// Create a coalescer without checking `config`
    ///
    /// The caller is responsible for `config.validate()`; prefer
    /// [`EditCoalescer::try_new`] for configs read from outside.
    pub fn new(config: CoalescerConfig, sink: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EditState {
                    shadows: HashMap::new(),
                    timers: TimerRegistry::new(),
                    in_flight: 0,
                }),
                sink,
                stats: CoalescerStats::default(),
                idle: Notify::new(),
            }),
            config,
        }
    }

    /// Create a coalescer, rejecting an out-of-range quiet period
    pub fn try_new(config: CoalescerConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config, sink))
    }

    /// Record an edit
    ///
    /// The shadow value is updated before this returns. Any pending commit
    /// for `key` is cancelled and a new one is scheduled one quiet period
    /// from now.
    pub fn edit(&self, key: K, value: V) {
        let mut state = self.shared.state.lock();
        state.shadows.insert(key.clone(), value);

        let generation = state.timers.next_generation();
        let task = tokio::spawn(fire(
            Arc::clone(&self.shared),
            key.clone(),
            generation,
            Instant::now() + self.config.quiet_period(),
        ));

        let superseded = state.timers.arm(key.clone(), generation, task.abort_handle());
        self.shared.stats.record_edit(superseded);
        trace!(key = ?key, generation, superseded, "Edit armed");
    }

    /// Resync a key to a value that changed upstream
    ///
    /// Overwrites the shadow and cancels the pending commit: the upstream
    /// value is already the source of truth. Returns true if a pending
    /// commit was cancelled.
    pub fn reset(&self, key: K, value: V) -> bool {
        let mut state = self.shared.state.lock();
        let cancelled = state.timers.cancel(&key);
        state.shadows.insert(key.clone(), value);
        self.shared.notify_if_idle(&state);
        drop(state);

        self.shared.stats.record_reset();
        if cancelled {
            debug!(key = ?key, "Reset cancelled pending commit");
        }
        cancelled
    }

    /// Drop a key's pending commit and shadow value without committing
    ///
    /// Returns false if nothing was pending.
    pub fn abandon(&self, key: &K) -> bool {
        let mut state = self.shared.state.lock();
        let cancelled = state.timers.cancel(key);
        state.shadows.remove(key);
        self.shared.notify_if_idle(&state);
        drop(state);

        if cancelled {
            self.shared.stats.record_abandoned(1);
            debug!(key = ?key, "Abandoned pending edit");
        }
        cancelled
    }

    /// Drop every pending commit and shadow value
    pub fn abandon_all(&self) -> usize {
        let mut state = self.shared.state.lock();
        let count = state.timers.clear();
        state.shadows.clear();
        self.shared.notify_if_idle(&state);
        drop(state);

        self.shared.stats.record_abandoned(count);
        if count > 0 {
            info!("Abandoned {} pending edits", count);
        }
        count
    }

    /// Commit every pending key now instead of waiting for its quiet period
    ///
    /// Returns the number of commits the sink accepted.
    pub async fn flush(&self) -> usize {
        let due: Vec<(K, V, InFlight<'_, K, V, S>)> = {
            let mut state = self.shared.state.lock();
            let keys = state.timers.drain();
            let due: Vec<_> = keys
                .into_iter()
                .filter_map(|key| {
                    let value = state.shadows.get(&key).cloned();
                    value.map(|value| (key, value))
                })
                .collect();
            state.in_flight += due.len();
            self.shared.notify_if_idle(&state);
            due.into_iter()
                .map(|(key, value)| {
                    let guard = InFlight {
                        shared: &self.shared,
                    };
                    (key, value, guard)
                })
                .collect()
        };

        if due.is_empty() {
            return 0;
        }

        let pending = due.len();
        let results = join_all(due.into_iter().map(|(key, value, guard)| async move {
            let _in_flight = guard;
            self.shared.commit(key, value).await
        }))
        .await;

        let committed = results.into_iter().filter(|ok| *ok).count();
        info!("Flushed {} pending edits ({} committed)", pending, committed);
        committed
    }

    /// Wait until nothing is pending and every started sink call finished
    ///
    /// Returns immediately when idle. Edits made while waiting extend the
    /// wait.
    pub async fn settle(&self) {
        loop {
            let mut notified = pin!(self.shared.idle.notified());
            notified.as_mut().enable();
            if self.shared.state.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Latest value edited (or reset) for `key`
    pub fn shadow(&self, key: &K) -> Option<V> {
        self.shared.state.lock().shadows.get(key).cloned()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.shared.state.lock().timers.is_armed(key)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().timers.len()
    }

    /// Sink calls currently running
    pub fn in_flight_count(&self) -> usize {
        self.shared.state.lock().in_flight
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.shared.sink
    }

    /// Tear the editing context down, abandoning whatever is pending
    pub fn teardown(self) -> usize {
        self.abandon_all()
    }
}

impl<K, V, S> Drop for EditCoalescer<K, V, S> {
    fn drop(&mut self) {
        let count = {
            let mut state = self.shared.state.lock();
            let count = state.timers.clear();
            self.shared.notify_if_idle(&state);
            count
        };
        if count > 0 {
            self.shared.stats.record_abandoned(count);
            debug!("Coalescer dropped with {} pending edits", count);
        }
    }
}

/// Body of one debounce timer
async fn fire<K, V, S>(shared: Arc<Shared<K, V, S>>, key: K, generation: Generation, deadline: Instant)
where
    K: Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
    S: CommitSink<K, V>,
{
    tokio::time::sleep_until(deadline).await;

    let value = {
        let mut state = shared.state.lock();
        if !state.timers.fire(&key, generation) {
            // Superseded after waking up
            return;
        }
        let value = state.shadows.get(&key).cloned();
        match value {
            Some(value) => {
                state.in_flight += 1;
                value
            }
            None => {
                shared.notify_if_idle(&state);
                return;
            }
        }
    };

    let _in_flight = InFlight { shared: &shared };
    shared.commit(key, value).await;
}
