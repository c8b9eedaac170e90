//! Concurrent cache of the rows an editing context owns

use crate::key::{FieldKey, RowId};
use crate::record::{apply, ApplyError, Record};
use crate::value::RawValue;
use dashmap::DashMap;
use thiserror::Error;

/// Errors from merging an edit into a cached row
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("row {0} is not loaded")]
    MissingRow(RowId),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Current data of every row in an editing context
///
/// The cache is the "owning row's full current data" that commit records
/// are built from. Upstream refreshes replace rows wholesale; edits are
/// merged field by field.
pub struct RowCache<R: Record> {
    rows: DashMap<RowId, R>,
}

impl<R: Record> RowCache<R> {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> Self {
        let cache = Self::new();
        for row in rows {
            cache.upsert(row);
        }
        cache
    }

    /// Insert or replace a row, returning the previous version
    pub fn upsert(&self, row: R) -> Option<R> {
        self.rows.insert(row.id().clone(), row)
    }

    pub fn get(&self, id: &RowId) -> Option<R> {
        self.rows.get(id).map(|row| row.value().clone())
    }

    pub fn remove(&self, id: &RowId) -> Option<R> {
        self.rows.remove(id).map(|(_, row)| row)
    }

    /// Replace the whole row set with a fresh upstream listing
    pub fn replace_all(&self, rows: impl IntoIterator<Item = R>) {
        self.rows.clear();
        for row in rows {
            self.upsert(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, ordered by id
    pub fn snapshot(&self) -> Vec<R> {
        let mut rows: Vec<R> = self.rows.iter().map(|entry| entry.value().clone()).collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }

    /// Apply an edit to the cached row and store the result
    ///
    /// The row stays locked between read and write, so concurrent merges
    /// into different fields of one row never lose each other's change.
    pub fn merge(&self, key: &FieldKey<R::Field>, value: &RawValue) -> Result<R, MergeError> {
        let mut entry = self
            .rows
            .get_mut(&key.row)
            .ok_or_else(|| MergeError::MissingRow(key.row.clone()))?;

        let merged = apply(entry.value(), key, value)?;
        *entry = merged.clone();
        Ok(merged)
    }
}

impl<R: Record> Default for RowCache<R> {
    fn default() -> Self {
        Self::new()
    }
}
