//! Commit sink that turns settled field values into full-row updates
//!
//! The remote API updates whole rows, so each settled value is merged into
//! the owning row's current data before it is handed to the updater.

use crate::sink::{CommitSink, SinkError};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use survey_core::{FieldKey, RawValue, Record, RecordKind, RowCache, RowId};
use tracing::debug;

/// Full row data merged with the one changed field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound = "R: Serialize, R::Field: Serialize")]
pub struct CommitRecord<R: Record> {
    pub kind: RecordKind,
    pub row: RowId,
    pub field: R::Field,
    pub record: R,
}

/// Performs the actual row update (the remote API in production)
#[async_trait]
pub trait RowUpdater<R: Record>: Send + Sync + 'static {
    async fn update(&self, commit: CommitRecord<R>) -> Result<(), SinkError>;
}

#[async_trait]
impl<R: Record, U: RowUpdater<R> + ?Sized> RowUpdater<R> for Arc<U> {
    async fn update(&self, commit: CommitRecord<R>) -> Result<(), SinkError> {
        (**self).update(commit).await
    }
}

/// Sink that merges each value into the row cache and sends the full row
///
/// The cached row is updated before the updater runs. A failed update
/// leaves the cache ahead of the server; the next upstream refresh
/// (`RowCache::replace_all`) brings it back in line.
pub struct RecordSink<R: Record, U> {
    rows: Arc<RowCache<R>>,
    updater: U,
}

impl<R: Record, U: RowUpdater<R>> RecordSink<R, U> {
    pub fn new(rows: Arc<RowCache<R>>, updater: U) -> Self {
        Self { rows, updater }
    }

    pub fn rows(&self) -> &Arc<RowCache<R>> {
        &self.rows
    }

    pub fn updater(&self) -> &U {
        &self.updater
    }
}

#[async_trait]
impl<R, U> CommitSink<FieldKey<R::Field>, RawValue> for RecordSink<R, U>
where
    R: Record,
    U: RowUpdater<R>,
{
    async fn commit(&self, key: FieldKey<R::Field>, value: RawValue) -> Result<(), SinkError> {
        let kind = R::KIND;
        let record = self.rows.merge(&key, &value)?;
        debug!(kind = %kind, row = %key.row, field = %key.field, "Merged edit into row");

        self.updater
            .update(CommitRecord {
                kind,
                row: key.row,
                field: key.field,
                record,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coalesce::EditCoalescer;
    use crate::config::CoalescerConfig;
    use parking_lot::Mutex;
    use std::time::Duration;
    use survey_core::{MergeError, WasteField, WasteItem};

    #[derive(Default)]
    struct RecordingUpdater {
        updates: Mutex<Vec<CommitRecord<WasteItem>>>,
    }

    #[async_trait]
    impl RowUpdater<WasteItem> for RecordingUpdater {
        async fn update(&self, commit: CommitRecord<WasteItem>) -> Result<(), SinkError> {
            self.updates.lock().push(commit);
            Ok(())
        }
    }

    fn rows() -> Arc<RowCache<WasteItem>> {
        let mut concrete = WasteItem::new("w1");
        concrete.description = "Concrete".to_string();
        Arc::new(RowCache::from_rows([concrete, WasteItem::new("w2")]))
    }

    #[tokio::test]
    async fn test_commit_sends_merged_row() {
        let updater = Arc::new(RecordingUpdater::default());
        let sink = RecordSink::new(rows(), Arc::clone(&updater));

        sink.commit(FieldKey::new("w1", WasteField::Amount), RawValue::from("50"))
            .await
            .unwrap();

        let updates = updater.updates.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind, RecordKind::Waste);
        assert_eq!(updates[0].field, WasteField::Amount);
        assert_eq!(updates[0].record.amount, Some(50.0));
        assert_eq!(updates[0].record.description, "Concrete");
    }

    #[tokio::test]
    async fn test_invalid_value_is_rejected_before_update() {
        let updater = Arc::new(RecordingUpdater::default());
        let sink = RecordSink::new(rows(), Arc::clone(&updater));

        let err = sink
            .commit(FieldKey::new("w1", WasteField::Amount), RawValue::from("fifty"))
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Merge(MergeError::Apply(_))));
        assert!(updater.updates.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_row_is_rejected() {
        let updater = Arc::new(RecordingUpdater::default());
        let sink = RecordSink::new(rows(), Arc::clone(&updater));

        let err = sink
            .commit(FieldKey::new("w9", WasteField::Amount), RawValue::from("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Merge(MergeError::MissingRow(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_edits_on_one_row_carry_each_other() {
        let updater = Arc::new(RecordingUpdater::default());
        let sink = RecordSink::new(rows(), Arc::clone(&updater));
        let coalescer = EditCoalescer::new(CoalescerConfig::default(), sink);

        for text in ["1", "17", "170", "1701", "17010", "170101"] {
            coalescer.edit(FieldKey::new("w1", WasteField::WasteCode), RawValue::from(text));
        }
        coalescer.edit(FieldKey::new("w1", WasteField::Amount), RawValue::from("5"));
        coalescer.edit(FieldKey::new("w1", WasteField::Amount), RawValue::from("5,5"));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let updates = updater.updates.lock();
        assert_eq!(updates.len(), 2);

        // Whichever committed last carries both changes
        let cached = coalescer.sink().rows().get(&RowId::new("w1")).unwrap();
        assert_eq!(cached.waste_code, "17 01 01");
        assert_eq!(cached.amount, Some(5.5));
        assert!(updates
            .iter()
            .any(|u| u.record.waste_code == "17 01 01" && u.record.amount == Some(5.5)));
    }
}
