//! Application-layer evaluation of [`FilterCondition`]s over JSON documents.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use super::{FilterCondition, SortOrder};
use crate::{
    filters::{digits_only, normalize},
    types::EntityKind,
};

/// Looks up the row a foreign key points at.
pub trait Resolver {
    fn resolve(&self, kind: EntityKind, id: &str) -> Option<&JsonValue>;
}

/// Resolver for documents without relationships.
pub struct NoRelations;

impl Resolver for NoRelations {
    fn resolve(&self, _kind: EntityKind, _id: &str) -> Option<&JsonValue> {
        None
    }
}

/// Returns whether `doc` satisfies `condition`.
pub fn matches(doc: &JsonValue, condition: &FilterCondition, resolver: &dyn Resolver) -> bool {
    match condition {
        FilterCondition::Equals { field, values } => {
            field_text(doc, field).is_some_and(|stored| values.iter().any(|value| *value == stored))
        }
        FilterCondition::Tokens { field, tokens } => field_text(doc, field).is_some_and(|stored| {
            let normalized = normalize(&stored);
            tokens.iter().all(|token| normalized.contains(token.as_str()))
        }),
        FilterCondition::DigitsPrefix { field, digits } => {
            field_text(doc, field).is_some_and(|stored| digits_only(&stored).starts_with(digits.as_str()))
        }
        FilterCondition::DigitsContains { field, digits } => {
            field_text(doc, field).is_some_and(|stored| digits_only(&stored).contains(digits.as_str()))
        }
        FilterCondition::Phrase { field, phrase } => {
            field_text(doc, field).is_some_and(|stored| normalize(&stored).contains(phrase.as_str()))
        }
        FilterCondition::NumericRange { field, min, max } => field_number(doc, field).is_some_and(|value| {
            min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
        }),
        FilterCondition::DateRange { field, from, to } => field_date(doc, field).is_some_and(|date| {
            from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
        }),
        FilterCondition::Related { step, condition } => doc
            .get(step.foreign_key)
            .and_then(JsonValue::as_str)
            .and_then(|id| resolver.resolve(step.target, id))
            .is_some_and(|target| matches(target, condition, resolver)),
        FilterCondition::And(conditions) => conditions.iter().all(|c| matches(doc, c, resolver)),
        FilterCondition::Or(conditions) => {
            conditions.is_empty() || conditions.iter().any(|c| matches(doc, c, resolver))
        }
    }
}

/// Textual form of a scalar field; `None` for missing, null and composite values.
pub fn field_text(doc: &JsonValue, field: &str) -> Option<String> {
    match doc.get(field)? {
        JsonValue::String(value) => Some(value.clone()),
        JsonValue::Number(value) => Some(value.to_string()),
        JsonValue::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

pub fn field_number(doc: &JsonValue, field: &str) -> Option<f64> {
    match doc.get(field)? {
        JsonValue::Number(value) => value.as_f64(),
        JsonValue::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Date part of a `YYYY-MM-DD` date or an RFC 3339 timestamp.
pub fn field_date(doc: &JsonValue, field: &str) -> Option<NaiveDate> {
    let raw = doc.get(field)?.as_str()?;
    let date_part = raw.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Orders two documents by `field`: numbers numerically, text by normalized form,
/// missing values first. Ties fall back to `id` ascending.
pub fn compare_by(a: &JsonValue, b: &JsonValue, field: &str, order: SortOrder) -> Ordering {
    let primary = compare_values(a.get(field), b.get(field));
    let primary = match order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| compare_values(a.get("id"), b.get("id")))
}

fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(JsonValue::Number(a)), Some(JsonValue::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(JsonValue::String(a)), Some(JsonValue::String(b))) => {
            normalize(a).cmp(&normalize(b)).then_with(|| a.cmp(b))
        }
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::types::RelationStep;

    struct Rows(HashMap<(EntityKind, String), JsonValue>);

    impl Resolver for Rows {
        fn resolve(&self, kind: EntityKind, id: &str) -> Option<&JsonValue> {
            self.0.get(&(kind, id.to_string()))
        }
    }

    #[test]
    fn tokens_require_every_token() {
        let vista = json!({"nome": "Fazenda Boa Vista"});
        let ruim = json!({"nome": "Fazenda Ruim"});
        let sitio = json!({"nome": "Sítio Boa Vista"});
        let condition = FilterCondition::tokens("nome", ["fazenda", "boa"]);
        assert!(matches(&vista, &condition, &NoRelations));
        assert!(!matches(&ruim, &condition, &NoRelations));
        assert!(!matches(&sitio, &condition, &NoRelations));
    }

    #[test]
    fn tokens_ignore_accents_in_stored_value() {
        let doc = json!({"nome": "José da Silva"});
        assert!(matches(&doc, &FilterCondition::tokens("nome", ["jose"]), &NoRelations));
    }

    #[test]
    fn digits_conditions_ignore_punctuation() {
        let doc = json!({"cpf_cnpj": "111.222.333-44", "telefone": "(11) 98765-4321"});
        assert!(matches(&doc, &FilterCondition::digits_prefix("cpf_cnpj", "111222"), &NoRelations));
        assert!(!matches(&doc, &FilterCondition::digits_prefix("cpf_cnpj", "222"), &NoRelations));
        assert!(matches(&doc, &FilterCondition::digits_contains("telefone", "8765"), &NoRelations));
    }

    #[test]
    fn ranges_are_inclusive() {
        let doc = json!({"area_total": 100.0, "created_at": "2025-03-10T15:30:00Z"});
        assert!(matches(&doc, &FilterCondition::numeric_range("area_total", Some(100.0), Some(100.0)), &NoRelations));
        assert!(!matches(&doc, &FilterCondition::numeric_range("area_total", Some(100.5), None), &NoRelations));

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date");
        assert!(matches(&doc, &FilterCondition::date_range("created_at", Some(day), Some(day)), &NoRelations));
        let next = NaiveDate::from_ymd_opt(2025, 3, 11).expect("valid date");
        assert!(!matches(&doc, &FilterCondition::date_range("created_at", Some(next), None), &NoRelations));
    }

    #[test]
    fn missing_fields_never_match_leaf_conditions() {
        let doc = json!({"nome": null});
        assert!(!matches(&doc, &FilterCondition::tokens("nome", ["x"]), &NoRelations));
        assert!(!matches(&doc, &FilterCondition::numeric_range("area_total", None, None), &NoRelations));
        assert!(matches(&doc, &FilterCondition::match_all(), &NoRelations));
    }

    #[test]
    fn related_conditions_follow_foreign_keys() {
        let mut rows: HashMap<(EntityKind, String), JsonValue> = HashMap::new();
        rows.insert((EntityKind::Producer, "p1".into()), json!({"id": "p1", "nome": "José"}));
        rows.insert(
            (EntityKind::Property, "f1".into()),
            json!({"id": "f1", "nome": "Boa Vista", "produtor_id": "p1"}),
        );
        let resolver = Rows(rows);

        let herd = json!({"id": "h1", "propriedade_id": "f1"});
        let orphan = json!({"id": "h2", "propriedade_id": "missing"});
        let condition = FilterCondition::related(
            RelationStep::TO_PROPERTY,
            FilterCondition::related(RelationStep::TO_PRODUCER, FilterCondition::tokens("nome", ["jose"])),
        );
        assert!(matches(&herd, &condition, &resolver));
        assert!(!matches(&orphan, &condition, &resolver));
    }

    #[test]
    fn compare_orders_text_accent_insensitively() {
        let a = json!({"id": "1", "nome": "Ávila"});
        let b = json!({"id": "2", "nome": "Bento"});
        assert_eq!(compare_by(&a, &b, "nome", SortOrder::Asc), Ordering::Less);
        assert_eq!(compare_by(&a, &b, "nome", SortOrder::Desc), Ordering::Greater);
        let c = json!({"id": "3", "nome": "Bento"});
        assert_eq!(compare_by(&b, &c, "nome", SortOrder::Desc), Ordering::Less);
    }
}
