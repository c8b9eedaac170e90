//! Timed edit scripts
//!
//! A script is a JSON document with optional initial rows and a list of
//! steps, each scheduled `at_ms` after the replay starts:
//!
//! ```json
//! {
//!   "rows": { "waste": [{ "id": "w1", "description": "Concrete" }] },
//!   "steps": [
//!     { "at_ms": 0,   "op": "edit", "kind": "waste", "row": "w1", "field": "amount", "value": "5" },
//!     { "at_ms": 100, "op": "edit", "kind": "waste", "row": "w1", "field": "amount", "value": "50" },
//!     { "at_ms": 900, "op": "flush" }
//!   ]
//! }
//! ```
//!
//! Field names are checked against the record kind while parsing.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use survey_core::{
    ApplyError, FieldKey, HazardousWasteField, HazardousWasteItem, RawValue, RecordKind,
    ReusableField, ReusableItem, RowId, WasteField, WasteItem,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("step {index}: {source}")]
    InvalidField { index: usize, source: ApplyError },

    #[error("step {index}: at_ms {at_ms} is earlier than the previous step ({previous})")]
    OutOfOrder {
        index: usize,
        at_ms: u64,
        previous: u64,
    },
}

/// Field key of any survey record kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SurveyKey {
    Reusable(FieldKey<ReusableField>),
    Waste(FieldKey<WasteField>),
    HazardousWaste(FieldKey<HazardousWasteField>),
}

impl SurveyKey {
    pub fn parse(kind: RecordKind, row: RowId, field: &str) -> Result<Self, ApplyError> {
        Ok(match kind {
            RecordKind::Reusable => SurveyKey::Reusable(FieldKey::new(row, field.parse()?)),
            RecordKind::Waste => SurveyKey::Waste(FieldKey::new(row, field.parse()?)),
            RecordKind::HazardousWaste => {
                SurveyKey::HazardousWaste(FieldKey::new(row, field.parse()?))
            }
        })
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            SurveyKey::Reusable(_) => RecordKind::Reusable,
            SurveyKey::Waste(_) => RecordKind::Waste,
            SurveyKey::HazardousWaste(_) => RecordKind::HazardousWaste,
        }
    }
}

impl fmt::Display for SurveyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyKey::Reusable(key) => write!(f, "reusable:{}", key),
            SurveyKey::Waste(key) => write!(f, "waste:{}", key),
            SurveyKey::HazardousWaste(key) => write!(f, "hazardous_waste:{}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Edit(SurveyKey, RawValue),
    Reset(SurveyKey, RawValue),
    Abandon(SurveyKey),
    Flush,
    AbandonAll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub at_ms: u64,
    pub action: Action,
}

/// Rows as loaded from the remote API, grouped by kind
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RowSet {
    pub reusable: Vec<ReusableItem>,
    pub waste: Vec<WasteItem>,
    pub hazardous_waste: Vec<HazardousWasteItem>,
}

impl RowSet {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rows file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse rows file: {}", path.display()))
    }

    pub fn extend(&mut self, other: RowSet) {
        self.reusable.extend(other.reusable);
        self.waste.extend(other.waste);
        self.hazardous_waste.extend(other.hazardous_waste);
    }

    pub fn len(&self) -> usize {
        self.reusable.len() + self.waste.len() + self.hazardous_waste.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Deserialize)]
struct RawScript {
    #[serde(default)]
    rows: RowSet,
    steps: Vec<RawStep>,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum RawStep {
    Edit {
        at_ms: u64,
        kind: RecordKind,
        row: RowId,
        field: String,
        value: RawValue,
    },
    Reset {
        at_ms: u64,
        kind: RecordKind,
        row: RowId,
        field: String,
        value: RawValue,
    },
    Abandon {
        at_ms: u64,
        kind: RecordKind,
        row: RowId,
        field: String,
    },
    Flush {
        at_ms: u64,
    },
    AbandonAll {
        at_ms: u64,
    },
}

impl RawStep {
    fn into_step(self, index: usize) -> Result<Step, ScriptError> {
        let key = |kind, row, field: &str| {
            SurveyKey::parse(kind, row, field)
                .map_err(|source| ScriptError::InvalidField { index, source })
        };

        Ok(match self {
            RawStep::Edit {
                at_ms,
                kind,
                row,
                field,
                value,
            } => Step {
                at_ms,
                action: Action::Edit(key(kind, row, &field)?, value),
            },
            RawStep::Reset {
                at_ms,
                kind,
                row,
                field,
                value,
            } => Step {
                at_ms,
                action: Action::Reset(key(kind, row, &field)?, value),
            },
            RawStep::Abandon {
                at_ms,
                kind,
                row,
                field,
            } => Step {
                at_ms,
                action: Action::Abandon(key(kind, row, &field)?),
            },
            RawStep::Flush { at_ms } => Step {
                at_ms,
                action: Action::Flush,
            },
            RawStep::AbandonAll { at_ms } => Step {
                at_ms,
                action: Action::AbandonAll,
            },
        })
    }
}

/// A parsed, validated edit script
#[derive(Debug)]
pub struct EditScript {
    pub rows: RowSet,
    pub steps: Vec<Step>,
}

impl EditScript {
    pub fn parse(json: &str) -> Result<Self> {
        let raw: RawScript = serde_json::from_str(json).context("Failed to parse edit script")?;

        let mut steps = Vec::with_capacity(raw.steps.len());
        let mut previous = 0u64;
        for (index, raw_step) in raw.steps.into_iter().enumerate() {
            let step = raw_step.into_step(index)?;
            if step.at_ms < previous {
                return Err(ScriptError::OutOfOrder {
                    index,
                    at_ms: step.at_ms,
                    previous,
                }
                .into());
            }
            previous = step.at_ms;
            steps.push(step);
        }

        Ok(Self {
            rows: raw.rows,
            steps,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read edit script: {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid edit script: {}", path.display()))
    }

    /// Offset of the last step
    pub fn duration_ms(&self) -> u64 {
        self.steps.last().map(|step| step.at_ms).unwrap_or(0)
    }

    pub fn edit_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step.action, Action::Edit(..)))
            .count()
    }
}
