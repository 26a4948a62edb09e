//! Declarative filter specs and the composer turning request parameters into a
//! [`FilterCondition`].
//!
//! Composition rules:
//! - only filled parameters (non-blank after trimming) whose key matches a spec apply;
//! - every applied spec contributes one predicate and the predicates are AND-ed;
//! - token filters require every token within one field, while array values match any;
//! - unknown keys and malformed numbers or dates are ignored;
//! - an empty parameter map composes to a no-op condition.

pub mod normalizers;

pub use normalizers::*;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::debug;
use serde_json::Value as JsonValue;

use crate::{search::FilterCondition, types::RelationStep};

/// How a request value is compared with the stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Equality; an array matches any listed value.
    Exact,
    /// Equality after uppercasing, for code-like fields such as `uf`.
    ExactUpper,
    /// Digits-only prefix match, for tax ids.
    DigitsPrefix,
    /// Digits-only substring match, for phone numbers.
    DigitsContains,
    /// Normalized tokens, all required in the field; an array matches any listed value exactly.
    Tokens,
    /// Normalized whole-phrase substring.
    Phrase,
    /// Inclusive numeric lower bound.
    Min,
    /// Inclusive numeric upper bound.
    Max,
    /// Inclusive lower bound on the date part.
    DateFrom,
    /// Inclusive upper bound on the date part.
    DateTo,
}

/// One filterable request parameter of a resource.
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    /// Query-string key.
    pub param: &'static str,
    /// Field on the entity reached at the end of `path`.
    pub field: &'static str,
    /// Relationship hops from the filtered entity; empty for direct fields.
    pub path: &'static [RelationStep],
    pub strategy: MatchStrategy,
}

impl FilterSpec {
    pub const fn direct(param: &'static str, field: &'static str, strategy: MatchStrategy) -> Self {
        Self {
            param,
            field,
            path: &[],
            strategy,
        }
    }

    pub const fn related(
        param: &'static str,
        path: &'static [RelationStep],
        field: &'static str,
        strategy: MatchStrategy,
    ) -> Self {
        Self {
            param,
            field,
            path,
            strategy,
        }
    }
}

/// A raw request value: a plain `key=value` or an array (`key[]=a&key[]=b` or repeated keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Single(String),
    Many(Vec<String>),
}

impl FilterValue {
    /// Non-blank values, trimmed.
    pub fn filled(&self) -> Vec<&str> {
        let values: Vec<&str> = match self {
            FilterValue::Single(value) => vec![value.as_str()],
            FilterValue::Many(values) => values.iter().map(String::as_str).collect(),
        };
        values.into_iter().map(str::trim).filter(|value| !value.is_empty()).collect()
    }

    pub fn is_filled(&self) -> bool {
        !self.filled().is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.filled().into_iter().next()
    }

    fn to_json(&self) -> JsonValue {
        match self {
            FilterValue::Single(value) => JsonValue::String(value.trim().to_string()),
            FilterValue::Many(_) => {
                JsonValue::Array(self.filled().into_iter().map(|value| JsonValue::String(value.to_string())).collect())
            }
        }
    }
}

/// Request parameters keyed by name, in stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    values: BTreeMap<String, FilterValue>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from decoded key/value pairs. `key[]` and repeated keys become arrays.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            match key.strip_suffix("[]") {
                Some(base) => params.push_many(base, value.into()),
                None => params.push(key, value.into()),
            }
        }
        params
    }

    /// Parses a raw `application/x-www-form-urlencoded` query string.
    pub fn from_query(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).map(|(key, value)| (key, value.into_owned())))
    }

    /// Sets a single value, turning the entry into an array if the key repeats.
    pub fn push(&mut self, key: &str, value: String) {
        match self.values.get_mut(key) {
            Some(FilterValue::Single(existing)) => {
                let first = std::mem::take(existing);
                self.values.insert(key.to_string(), FilterValue::Many(vec![first, value]));
            }
            Some(FilterValue::Many(values)) => values.push(value),
            None => {
                self.values.insert(key.to_string(), FilterValue::Single(value));
            }
        }
    }

    pub fn push_many(&mut self, key: &str, value: String) {
        match self.values.get_mut(key) {
            Some(FilterValue::Many(values)) => values.push(value),
            Some(FilterValue::Single(existing)) => {
                let first = std::mem::take(existing);
                self.values.insert(key.to_string(), FilterValue::Many(vec![first, value]));
            }
            None => {
                self.values.insert(key.to_string(), FilterValue::Many(vec![value]));
            }
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.push(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    /// First filled value for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(FilterValue::first)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of composing request parameters against a resource's specs.
#[derive(Debug, Clone)]
pub struct ComposedFilter {
    pub condition: FilterCondition,
    /// Filled, recognized parameters, echoed back to clients.
    pub applied: BTreeMap<String, JsonValue>,
}

/// Builds the combined predicate for `params` against `specs`.
pub fn compose(params: &FilterParams, specs: &[FilterSpec]) -> ComposedFilter {
    let mut predicates = Vec::new();
    let mut applied = BTreeMap::new();

    for spec in specs {
        let Some(value) = params.get(spec.param) else {
            continue;
        };
        if !value.is_filled() {
            continue;
        }
        applied.insert(spec.param.to_string(), value.to_json());
        if let Some(predicate) = build_predicate(spec, value) {
            predicates.push(wrap_path(spec.path, predicate));
        }
    }

    let condition = FilterCondition::and(predicates);
    debug!("composed filter: {}", condition.to_query_clause());
    ComposedFilter { condition, applied }
}

fn wrap_path(path: &[RelationStep], predicate: FilterCondition) -> FilterCondition {
    path.iter()
        .rev()
        .fold(predicate, |inner, step| FilterCondition::related(*step, inner))
}

fn build_predicate(spec: &FilterSpec, value: &FilterValue) -> Option<FilterCondition> {
    let values = value.filled();
    let first = *values.first()?;
    let field = spec.field;

    match spec.strategy {
        MatchStrategy::Exact => Some(FilterCondition::equals_any(field, values)),
        MatchStrategy::ExactUpper => Some(FilterCondition::equals_any(
            field,
            values.iter().map(|value| value.to_uppercase()),
        )),
        MatchStrategy::DigitsPrefix => {
            let digits = digits_only(first);
            (!digits.is_empty()).then(|| FilterCondition::digits_prefix(field, digits))
        }
        MatchStrategy::DigitsContains => {
            let digits = digits_only(first);
            (!digits.is_empty()).then(|| FilterCondition::digits_contains(field, digits))
        }
        MatchStrategy::Tokens => match value {
            FilterValue::Many(_) => Some(FilterCondition::equals_any(field, values)),
            FilterValue::Single(raw) => {
                let tokens = tokenize(raw);
                (!tokens.is_empty()).then(|| FilterCondition::tokens(field, tokens))
            }
        },
        MatchStrategy::Phrase => {
            let phrase = normalize(first);
            (!phrase.is_empty()).then(|| FilterCondition::phrase(field, phrase))
        }
        MatchStrategy::Min => parse_number(first).map(|min| FilterCondition::numeric_range(field, Some(min), None)),
        MatchStrategy::Max => parse_number(first).map(|max| FilterCondition::numeric_range(field, None, Some(max))),
        MatchStrategy::DateFrom => parse_date(first).map(|from| FilterCondition::date_range(field, Some(from), None)),
        MatchStrategy::DateTo => parse_date(first).map(|to| FilterCondition::date_range(field, None, Some(to))),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
