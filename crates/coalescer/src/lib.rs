//! Debounced edit coalescing for survey line items
//!
//! This crate turns a high-frequency stream of field edits into a
//! low-frequency stream of commits:
//! - Per-key debouncing (quiet period configurable, 500ms default)
//! - Shadow values that always reflect the latest edit
//! - Injected commit sinks (closures, channels, row-merging record sinks)
//! - Scoped ownership: dropping a coalescer cancels everything pending

pub mod coalesce;
pub mod config;
pub mod debounce;
pub mod record_sink;
pub mod sink;
pub mod stats;

// Re-exports
pub use coalesce::EditCoalescer;
pub use config::{CoalescerConfig, ConfigError};
pub use debounce::{Generation, TimerRegistry};
pub use record_sink::{CommitRecord, RecordSink, RowUpdater};
pub use sink::{channel_sink, sink_fn, ChannelSink, Commit, CommitSink, FnSink, SinkError};
pub use stats::{CoalescerStats, StatsSnapshot};
