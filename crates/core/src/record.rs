//! Typed records and the pure field `apply`

use crate::key::{FieldKey, RowId};
use crate::value::RawValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when a raw edit is applied to a record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("unknown record kind: {0:?}")]
    UnknownKind(String),

    #[error("unknown field {name:?} for {kind} records")]
    UnknownField { kind: RecordKind, name: String },

    #[error("invalid value {value} for field {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("edit for row {found} applied to row {expected}")]
    RowMismatch { expected: RowId, found: RowId },
}

impl ApplyError {
    pub(crate) fn invalid(field: &'static str, value: &RawValue, reason: impl Into<String>) -> Self {
        ApplyError::InvalidValue {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Kind of survey line item
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Reusable,
    Waste,
    HazardousWaste,
}

impl RecordKind {
    pub const ALL: &'static [RecordKind] = &[
        RecordKind::Reusable,
        RecordKind::Waste,
        RecordKind::HazardousWaste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Reusable => "reusable",
            RecordKind::Waste => "waste",
            RecordKind::HazardousWaste => "hazardous_waste",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = ApplyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reusable" => Ok(RecordKind::Reusable),
            "waste" => Ok(RecordKind::Waste),
            "hazardous_waste" | "hazardous-waste" | "hazardousWaste" => {
                Ok(RecordKind::HazardousWaste)
            }
            other => Err(ApplyError::UnknownKind(other.to_string())),
        }
    }
}

/// Field enum of a record type
///
/// Field names parse from their `snake_case` or `camelCase` spelling.
/// Anything else is rejected at parse time, so an edit can never target a
/// property the record does not have.
pub trait FieldName:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + FromStr<Err = ApplyError> + Send + Sync + 'static
{
    /// Every field of the record, in display order
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;
}

/// A row that can be edited field by field
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    type Field: FieldName;

    const KIND: RecordKind;

    /// Stable row identifier
    fn id(&self) -> &RowId;

    /// Return a copy of this record with one field replaced
    fn with_field(&self, field: Self::Field, value: &RawValue) -> Result<Self, ApplyError>;
}

/// Merge one edit into a record
///
/// Pure: `record` is left untouched and the merged copy is returned.
pub fn apply<R: Record>(
    record: &R,
    key: &FieldKey<R::Field>,
    value: &RawValue,
) -> Result<R, ApplyError> {
    if record.id() != &key.row {
        return Err(ApplyError::RowMismatch {
            expected: record.id().clone(),
            found: key.row.clone(),
        });
    }

    record.with_field(key.field, value)
}
