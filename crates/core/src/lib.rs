//! Record model for survey line-item editing
//!
//! This crate provides:
//! - Stable row identifiers and typed field keys
//! - Raw input values as produced by edit controls
//! - The `Record` trait with a pure, typed `apply`
//! - Survey line items (reusables, wastes, hazardous wastes)
//! - A concurrent row cache used to build commit records

pub mod items;
pub mod key;
pub mod record;
pub mod rows;
pub mod value;

// Re-exports
pub use items::{
    HazardousWasteField, HazardousWasteItem, ReusableField, ReusableItem, Unit, WasteField,
    WasteItem,
};
pub use key::{FieldKey, RowId};
pub use record::{apply, ApplyError, FieldName, Record, RecordKind};
pub use rows::{MergeError, RowCache};
pub use value::RawValue;
