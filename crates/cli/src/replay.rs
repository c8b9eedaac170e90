//! Replay of timed edit scripts through the coalescer
//!
//! One coalescer per record kind, each committing through a
//! [`RecordSink`] into a JSON-lines writer that stands in for the remote
//! row API. Steps run on the Tokio clock, so tests can replay on a paused
//! clock.

use crate::script::{Action, RowSet, Step, SurveyKey};
use async_trait::async_trait;
use coalescer::{
    CoalescerConfig, CommitRecord, ConfigError, EditCoalescer, RecordSink, RowUpdater,
    SinkError, StatsSnapshot,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use survey_core::{FieldKey, HazardousWasteItem, RawValue, Record, ReusableItem, RowCache, RowId, WasteItem};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Row updater that writes each committed row as one JSON line
///
/// Rows listed with [`JsonLinesUpdater::rejecting`] fail their updates,
/// which is how scripts exercise sink failures.
pub struct JsonLinesUpdater<W> {
    out: Arc<Mutex<W>>,
    reject_rows: HashSet<RowId>,
}

impl<W: Write + Send + 'static> JsonLinesUpdater<W> {
    pub fn new(out: Arc<Mutex<W>>) -> Self {
        Self {
            out,
            reject_rows: HashSet::new(),
        }
    }

    pub fn rejecting(mut self, rows: impl IntoIterator<Item = RowId>) -> Self {
        self.reject_rows.extend(rows);
        self
    }
}

#[async_trait]
impl<R, W> RowUpdater<R> for JsonLinesUpdater<W>
where
    R: Record + Serialize,
    R::Field: Serialize,
    W: Write + Send + 'static,
{
    async fn update(&self, commit: CommitRecord<R>) -> Result<(), SinkError> {
        if self.reject_rows.contains(&commit.row) {
            return Err(SinkError::Rejected(format!(
                "update of {} row {} refused",
                commit.kind, commit.row
            )));
        }

        let line = serde_json::to_string(&commit).map_err(anyhow::Error::from)?;
        let mut out = self.out.lock();
        writeln!(out, "{}", line).map_err(anyhow::Error::from)?;
        Ok(())
    }
}

type KindCoalescer<R, W> = EditCoalescer<
    FieldKey<<R as Record>::Field>,
    RawValue,
    RecordSink<R, Arc<JsonLinesUpdater<W>>>,
>;

/// Counters of one replay run
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: usize,
    pub elapsed_ms: u64,
    pub flushed: usize,
    pub reusable: StatsSnapshot,
    pub waste: StatsSnapshot,
    pub hazardous_waste: StatsSnapshot,
}

impl ReplayReport {
    fn kinds(&self) -> [&StatsSnapshot; 3] {
        [&self.reusable, &self.waste, &self.hazardous_waste]
    }

    pub fn edits(&self) -> u64 {
        self.kinds().iter().map(|s| s.edits).sum()
    }

    pub fn commits(&self) -> u64 {
        self.kinds().iter().map(|s| s.commits).sum()
    }

    pub fn commits_failed(&self) -> u64 {
        self.kinds().iter().map(|s| s.commits_failed).sum()
    }

    pub fn abandoned(&self) -> u64 {
        self.kinds().iter().map(|s| s.abandoned).sum()
    }
}

/// Editing context for one replay: one coalescer per record kind
pub struct ReplaySession<W: Write + Send + 'static> {
    reusable: KindCoalescer<ReusableItem, W>,
    waste: KindCoalescer<WasteItem, W>,
    hazardous_waste: KindCoalescer<HazardousWasteItem, W>,
}

impl<W: Write + Send + 'static> ReplaySession<W> {
    pub fn new(
        config: CoalescerConfig,
        rows: RowSet,
        updater: JsonLinesUpdater<W>,
    ) -> Result<Self, ConfigError> {
        let updater = Arc::new(updater);
        Ok(Self {
            reusable: EditCoalescer::try_new(
                config,
                RecordSink::new(Arc::new(RowCache::from_rows(rows.reusable)), Arc::clone(&updater)),
            )?,
            waste: EditCoalescer::try_new(
                config,
                RecordSink::new(Arc::new(RowCache::from_rows(rows.waste)), Arc::clone(&updater)),
            )?,
            hazardous_waste: EditCoalescer::try_new(
                config,
                RecordSink::new(
                    Arc::new(RowCache::from_rows(rows.hazardous_waste)),
                    updater,
                ),
            )?,
        })
    }

    /// Apply one step; returns the number of commits a flush accepted
    pub async fn apply(&self, action: Action) -> usize {
        match action {
            Action::Edit(key, value) => {
                match key {
                    SurveyKey::Reusable(key) => self.reusable.edit(key, value),
                    SurveyKey::Waste(key) => self.waste.edit(key, value),
                    SurveyKey::HazardousWaste(key) => self.hazardous_waste.edit(key, value),
                }
                0
            }
            Action::Reset(key, value) => {
                match key {
                    SurveyKey::Reusable(key) => self.reusable.reset(key, value),
                    SurveyKey::Waste(key) => self.waste.reset(key, value),
                    SurveyKey::HazardousWaste(key) => self.hazardous_waste.reset(key, value),
                };
                0
            }
            Action::Abandon(key) => {
                match &key {
                    SurveyKey::Reusable(key) => self.reusable.abandon(key),
                    SurveyKey::Waste(key) => self.waste.abandon(key),
                    SurveyKey::HazardousWaste(key) => self.hazardous_waste.abandon(key),
                };
                0
            }
            Action::Flush => self.flush().await,
            Action::AbandonAll => {
                self.reusable.abandon_all();
                self.waste.abandon_all();
                self.hazardous_waste.abandon_all();
                0
            }
        }
    }

    pub async fn flush(&self) -> usize {
        self.reusable.flush().await + self.waste.flush().await + self.hazardous_waste.flush().await
    }

    pub fn pending_count(&self) -> usize {
        self.reusable.pending_count()
            + self.waste.pending_count()
            + self.hazardous_waste.pending_count()
    }

    /// Wait until every kind has no pending edit and no running update
    pub async fn settle(&self) {
        self.reusable.settle().await;
        self.waste.settle().await;
        self.hazardous_waste.settle().await;
    }

    pub fn reusable_rows(&self) -> &Arc<RowCache<ReusableItem>> {
        self.reusable.sink().rows()
    }

    pub fn waste_rows(&self) -> &Arc<RowCache<WasteItem>> {
        self.waste.sink().rows()
    }

    pub fn hazardous_waste_rows(&self) -> &Arc<RowCache<HazardousWasteItem>> {
        self.hazardous_waste.sink().rows()
    }

    /// Run every step at its offset, then let pending edits settle
    ///
    /// With `flush_at_end`, whatever is still pending after the last step
    /// is committed immediately instead of waiting out its quiet period.
    pub async fn run(&self, steps: Vec<Step>, flush_at_end: bool) -> ReplayReport {
        let start = Instant::now();
        let step_count = steps.len();
        let mut flushed = 0;

        for step in steps {
            sleep_until(start + Duration::from_millis(step.at_ms)).await;
            debug!(at_ms = step.at_ms, action = ?step.action, "Replaying step");
            flushed += self.apply(step.action).await;
        }

        if flush_at_end {
            flushed += self.flush().await;
        }
        self.settle().await;

        let report = ReplayReport {
            steps: step_count,
            elapsed_ms: start.elapsed().as_millis() as u64,
            flushed,
            reusable: self.reusable.stats(),
            waste: self.waste.stats(),
            hazardous_waste: self.hazardous_waste.stats(),
        };
        info!(
            steps = report.steps,
            edits = report.edits(),
            commits = report.commits(),
            failed = report.commits_failed(),
            "Replay finished"
        );
        report
    }
}
