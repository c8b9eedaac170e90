//! Row identifiers and field keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a row, as assigned by the remote API
///
/// Keys are always built from this id. List positions are never used,
/// since they go stale as soon as the list is re-sorted or mutated.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identity of a single editable value: one field of one row
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldKey<F> {
    pub row: RowId,
    pub field: F,
}

impl<F> FieldKey<F> {
    pub fn new(row: impl Into<RowId>, field: F) -> Self {
        Self {
            row: row.into(),
            field,
        }
    }
}

impl<F: fmt::Display> fmt::Display for FieldKey<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row, self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_key_equality_by_row_and_field() {
        let a = FieldKey::new("row1", "amount");
        let b = FieldKey::new(RowId::new("row1"), "amount");
        let c = FieldKey::new("row2", "amount");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_field_key_display() {
        let key = FieldKey::new("w-17", "amount");
        assert_eq!(key.to_string(), "w-17/amount");
    }
}
