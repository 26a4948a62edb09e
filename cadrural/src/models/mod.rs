//! Entity types, their input payloads and per-resource listing tables.

pub mod document;
pub mod herd;
pub mod producer;
pub mod production_unit;
pub mod property;

pub use document::{Document, DocumentCategory, DocumentView, OwnerKind, format_file_size};
pub use herd::{Herd, HerdInput, SPECIES};
pub use producer::{Producer, ProducerInput};
pub use production_unit::{CROPS, ProductionUnit, ProductionUnitInput};
pub use property::{Property, PropertyInput};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    errors::{IssueCollector, ValidationResult},
    search::{FieldIndex, IndexedField, Listing},
    types::EntityKind,
    validators::char_len,
};

/// Upper bound shared by area fields.
pub const MAX_AREA: f64 = 999_999.99;

/// A persisted entity.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Fields mirrored into the search index.
    const INDEXED: &'static [IndexedField];

    fn id(&self) -> &str;
}

/// An entity exposed through a filterable list endpoint.
pub trait Listed: Resource {
    fn listing() -> &'static Listing;
}

/// A foreign key an entity holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityKind,
    pub id: String,
}

/// An entity created and updated from a client payload.
pub trait Writable: Resource {
    type Input: DeserializeOwned + Send + 'static;

    /// Fields whose value may appear on one entity only.
    const UNIQUE: &'static [&'static str] = &[];

    const CREATED: &'static str;
    const UPDATED: &'static str;
    const DELETED: &'static str;

    /// Validates `input`, merging it over `current` on update.
    fn build(input: Self::Input, id: String, current: Option<&Self>, now: DateTime<Utc>) -> ValidationResult<Self>;

    /// Rows that must exist for this entity to be stored.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

/// Indexed fields of any collection.
pub fn indexed_fields(kind: EntityKind) -> &'static [IndexedField] {
    match kind {
        EntityKind::Producer => Producer::INDEXED,
        EntityKind::Property => Property::INDEXED,
        EntityKind::ProductionUnit => ProductionUnit::INDEXED,
        EntityKind::Herd => Herd::INDEXED,
        EntityKind::Document => Document::INDEXED,
    }
}

/// Fields every collection indexes.
pub(crate) const fn id_field() -> IndexedField {
    IndexedField::new("id", FieldIndex::Tag)
}

pub(crate) const fn timestamp_field(name: &'static str) -> IndexedField {
    IndexedField::new(name, FieldIndex::Date)
}

/// Resolves a required text field from the incoming value or the current one.
pub(crate) fn required_text(
    issues: &mut IssueCollector,
    field: &str,
    incoming: Option<String>,
    current: Option<&str>,
    max: usize,
) -> String {
    let value = match incoming {
        Some(value) => value.trim().to_string(),
        None => current.unwrap_or_default().to_string(),
    };
    if value.is_empty() {
        issues.push(field, "validation.required", format!("O campo {field} é obrigatório."));
    } else if char_len(&value) > max {
        issues.push(
            field,
            "validation.max",
            format!("O campo {field} não pode ter mais de {max} caracteres."),
        );
    }
    value
}

/// Resolves an optional text field; a blank incoming value clears it.
pub(crate) fn optional_text(
    issues: &mut IssueCollector,
    field: &str,
    incoming: Option<String>,
    current: Option<&str>,
    max: usize,
) -> Option<String> {
    let value = match incoming {
        Some(value) => Some(value.trim().to_string()).filter(|value| !value.is_empty()),
        None => current.map(str::to_string),
    };
    if let Some(value) = &value {
        issues.check(
            char_len(value) > max,
            field,
            "validation.max",
            format!("O campo {field} não pode ter mais de {max} caracteres."),
        );
    }
    value
}

/// Resolves a required number within `[min, max]`.
pub(crate) fn bounded_number(
    issues: &mut IssueCollector,
    field: &str,
    incoming: Option<f64>,
    current: Option<f64>,
    min: f64,
    max: f64,
) -> f64 {
    match incoming.or(current) {
        Some(value) if value.is_finite() && (min..=max).contains(&value) => value,
        Some(value) => {
            issues.push(
                field,
                "validation.between",
                format!("O campo {field} deve estar entre {min} e {max}."),
            );
            value
        }
        None => {
            issues.push(field, "validation.required", format!("O campo {field} é obrigatório."));
            0.0
        }
    }
}

/// Resolves a `YYYY-MM-DD` date, falling back to the current value and then `default`.
pub(crate) fn date_or(
    issues: &mut IssueCollector,
    field: &str,
    incoming: Option<String>,
    current: Option<NaiveDate>,
    default: Option<NaiveDate>,
) -> Option<NaiveDate> {
    match incoming.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty()) {
        Some(raw) => match parse_input_date(&raw) {
            Some(date) => Some(date),
            None => {
                issues.push(field, "validation.date", format!("O campo {field} não é uma data válida."));
                None
            }
        },
        None => current.or(default),
    }
}

/// Accepts a plain date or the date part of a timestamp.
fn parse_input_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()))
}

/// Requires `value` to be one of `allowed`.
pub(crate) fn one_of(issues: &mut IssueCollector, field: &str, value: &str, allowed: &[&str]) {
    if !value.is_empty() && !allowed.contains(&value) {
        issues.push(
            field,
            "validation.in",
            format!("O campo {field} deve ser um dos valores: {}.", allowed.join(", ")),
        );
    }
}

/// `1.234,56 ha`: two decimals, dot thousands, comma decimals.
pub fn format_hectares(value: f64) -> String {
    format!("{} ha", format_decimal_br(value, 2))
}

pub(crate) fn format_decimal_br(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped},{fraction}")
    }
}
