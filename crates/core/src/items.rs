//! Survey line items: reusables, wastes and hazardous wastes

use crate::key::RowId;
use crate::record::{ApplyError, FieldName, Record, RecordKind};
use crate::value::RawValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Defines a field enum with its string names and the `FieldName` plumbing.
/// The first literal is the canonical name, the rest are accepted aliases.
macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident for $kind:path {
            $($variant:ident => $canonical:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl FieldName for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $canonical),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ApplyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($canonical $(| $alias)* => Ok($name::$variant),)+
                    other => Err(ApplyError::UnknownField {
                        kind: $kind,
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Unit of measure for an amount
///
/// Deserializes through [`FromStr`], so rows files accept the same
/// spellings as edits.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Unit {
    #[default]
    #[serde(rename = "pcs")]
    Piece,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "t")]
    Tonne,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "m2")]
    SquareMeter,
    #[serde(rename = "m3")]
    CubicMeter,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Piece => "pcs",
            Unit::Kilogram => "kg",
            Unit::Tonne => "t",
            Unit::Meter => "m",
            Unit::SquareMeter => "m2",
            Unit::CubicMeter => "m3",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pcs" | "piece" | "pieces" | "stk" => Ok(Unit::Piece),
            "kg" => Ok(Unit::Kilogram),
            "t" => Ok(Unit::Tonne),
            "m" => Ok(Unit::Meter),
            "m2" | "m²" => Ok(Unit::SquareMeter),
            "m3" | "m³" => Ok(Unit::CubicMeter),
            other => Err(format!("unknown unit {:?}", other)),
        }
    }
}

impl TryFrom<String> for Unit {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn default_waste_unit() -> Unit {
    Unit::Tonne
}

fn default_hazardous_waste_unit() -> Unit {
    Unit::Kilogram
}

/// Parse an amount: number or numeric text, decimal comma allowed, blank clears it
fn parse_amount(field: &'static str, value: &RawValue) -> Result<Option<f64>, ApplyError> {
    if value.is_blank() {
        return Ok(None);
    }

    let amount = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(text) => text
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map_err(|_| ApplyError::invalid(field, value, "not a number"))?,
        _ => return Err(ApplyError::invalid(field, value, "not a number")),
    };

    if !amount.is_finite() {
        return Err(ApplyError::invalid(field, value, "must be finite"));
    }
    if amount < 0.0 {
        return Err(ApplyError::invalid(field, value, "must not be negative"));
    }

    Ok(Some(amount))
}

fn parse_unit(field: &'static str, value: &RawValue) -> Result<Unit, ApplyError> {
    match value {
        RawValue::Text(text) => text
            .parse()
            .map_err(|reason: String| ApplyError::invalid(field, value, reason)),
        _ => Err(ApplyError::invalid(field, value, "expected a unit name")),
    }
}

/// Parse a European Waste Catalogue code into `NN NN NN` form
///
/// A trailing `*` marks a hazardous entry. `hazardous` forces the marker.
fn parse_waste_code(
    field: &'static str,
    value: &RawValue,
    hazardous: bool,
) -> Result<String, ApplyError> {
    let text = match value {
        RawValue::Text(text) => text.trim().to_string(),
        // Numeric inputs drop leading zeros: 10101 is 01 01 01
        RawValue::Number(n) if n.fract() == 0.0 && (0.0..1_000_000.0).contains(n) => {
            format!("{:06}", *n as u64)
        }
        _ if value.is_blank() => String::new(),
        _ => return Err(ApplyError::invalid(field, value, "expected six digits")),
    };
    let text = text.as_str();

    if text.is_empty() {
        return Err(ApplyError::invalid(field, value, "waste code is required"));
    }

    let (digits_part, starred) = match text.strip_suffix('*') {
        Some(rest) => (rest, true),
        None => (text, false),
    };

    let digits: String = digits_part.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApplyError::invalid(field, value, "expected six digits"));
    }

    let chapter: u8 = digits[..2]
        .parse()
        .map_err(|_| ApplyError::invalid(field, value, "expected six digits"))?;
    if !(1..=20).contains(&chapter) {
        return Err(ApplyError::invalid(field, value, "chapter must be 01-20"));
    }

    let mut code = format!("{} {} {}", &digits[..2], &digits[2..4], &digits[4..]);
    if starred || hazardous {
        code.push('*');
    }
    Ok(code)
}

field_enum! {
    /// Editable fields of a [`ReusableItem`]
    ReusableField for RecordKind::Reusable {
        Title => "title",
        Amount => "amount",
        Unit => "unit",
        Notes => "notes",
    }
}

/// Building component that can be salvaged and reused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReusableItem {
    pub id: RowId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub notes: String,
}

impl ReusableItem {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            amount: None,
            unit: Unit::default(),
            notes: String::new(),
        }
    }
}

impl Record for ReusableItem {
    type Field = ReusableField;

    const KIND: RecordKind = RecordKind::Reusable;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn with_field(&self, field: ReusableField, value: &RawValue) -> Result<Self, ApplyError> {
        let mut next = self.clone();
        match field {
            ReusableField::Title => next.title = value.to_text(),
            ReusableField::Amount => next.amount = parse_amount(field.as_str(), value)?,
            ReusableField::Unit => next.unit = parse_unit(field.as_str(), value)?,
            ReusableField::Notes => next.notes = value.to_text(),
        }
        Ok(next)
    }
}

field_enum! {
    /// Editable fields of a [`WasteItem`]
    WasteField for RecordKind::Waste {
        WasteCode => "waste_code" | "wasteCode",
        Description => "description",
        Amount => "amount",
        Unit => "unit",
    }
}

/// Non-hazardous demolition waste
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteItem {
    pub id: RowId,
    #[serde(default)]
    pub waste_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default = "default_waste_unit")]
    pub unit: Unit,
}

impl WasteItem {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            waste_code: String::new(),
            description: String::new(),
            amount: None,
            unit: default_waste_unit(),
        }
    }
}

impl Record for WasteItem {
    type Field = WasteField;

    const KIND: RecordKind = RecordKind::Waste;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn with_field(&self, field: WasteField, value: &RawValue) -> Result<Self, ApplyError> {
        let mut next = self.clone();
        match field {
            WasteField::WasteCode => {
                next.waste_code = parse_waste_code(field.as_str(), value, false)?
            }
            WasteField::Description => next.description = value.to_text(),
            WasteField::Amount => next.amount = parse_amount(field.as_str(), value)?,
            WasteField::Unit => next.unit = parse_unit(field.as_str(), value)?,
        }
        Ok(next)
    }
}

field_enum! {
    /// Editable fields of a [`HazardousWasteItem`]
    HazardousWasteField for RecordKind::HazardousWaste {
        WasteCode => "waste_code" | "wasteCode",
        Description => "description",
        Amount => "amount",
        Unit => "unit",
        Location => "location",
    }
}

/// Hazardous waste found during the survey, with where it was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardousWasteItem {
    pub id: RowId,
    #[serde(default)]
    pub waste_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default = "default_hazardous_waste_unit")]
    pub unit: Unit,
    #[serde(default)]
    pub location: String,
}

impl HazardousWasteItem {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            waste_code: String::new(),
            description: String::new(),
            amount: None,
            unit: default_hazardous_waste_unit(),
            location: String::new(),
        }
    }
}

impl Record for HazardousWasteItem {
    type Field = HazardousWasteField;

    const KIND: RecordKind = RecordKind::HazardousWaste;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn with_field(
        &self,
        field: HazardousWasteField,
        value: &RawValue,
    ) -> Result<Self, ApplyError> {
        let mut next = self.clone();
        match field {
            HazardousWasteField::WasteCode => {
                next.waste_code = parse_waste_code(field.as_str(), value, true)?
            }
            HazardousWasteField::Description => next.description = value.to_text(),
            HazardousWasteField::Amount => next.amount = parse_amount(field.as_str(), value)?,
            HazardousWasteField::Unit => next.unit = parse_unit(field.as_str(), value)?,
            HazardousWasteField::Location => next.location = value.to_text(),
        }
        Ok(next)
    }
}
