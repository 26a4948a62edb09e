//! # Filter conditions, listing parameters and RediSearch rendering
//!
//! A [`FilterCondition`] is evaluated in the application layer by the memory store
//! (see [`eval`]) and rendered to RediSearch query syntax by the Redis store.
//!
//! ## Index aliases
//!
//! Each indexed field is exposed under one or more aliases, chosen by the condition kind:
//!
//! | Condition          | Alias              | Indexed path          | Type    |
//! |--------------------|--------------------|-----------------------|---------|
//! | `Equals`           | `field`            | `$.field`             | TAG     |
//! | `Tokens`           | `field_norm`       | `$._norm.field`       | TAG     |
//! | `Phrase`           | `field_phrase`     | `$._norm.field`       | TAG     |
//! | `DigitsPrefix/...` | `field_digits`     | `$._digits.field`     | TAG     |
//! | `NumericRange`     | `field`            | `$.field`             | NUMERIC |
//! | `DateRange`        | `field_ts`         | `$._ts.field`         | NUMERIC |
//!
//! The `_norm`, `_digits`, `_ts` and `_month` shadow values are written next to the
//! entity by the Redis store.
//!
//! ## Escaping quick reference
//!
//! | Function                          | Input         | Output          |
//! |-----------------------------------|---------------|-----------------|
//! | `escape_for_tag_query(value)`     | `"test-user"` | `"test\-user"`  |
//! | `escape_for_tag_contains(value)`  | `"-23.5, -46"`| `"*\-23\.5\,\ \-46*"` |

pub mod eval;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::{
    filters::{FilterParams, FilterSpec, compose},
    types::RelationStep,
};

const DEFAULT_PAGE: u64 = 1;
const TAG_SEPARATOR: &str = "|";
const NO_MATCH_TAG: &str = "__none__";
/// Shortest infix term RediSearch accepts; shorter terms are left out of the query.
const MIN_INFIX_LEN: usize = 2;

/// True when `fragment` is long enough for a RediSearch contains query.
pub fn is_infix_fragment(fragment: &str) -> bool {
    fragment.chars().count() >= MIN_INFIX_LEN
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Parses `asc`/`desc` in any case.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortOrder::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortOrder::Desc)
        } else {
            None
        }
    }
}

/// Allow-listed sort: the public `name` clients send and the entity `field` it orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub name: &'static str,
    pub field: &'static str,
}

impl SortField {
    pub const fn new(name: &'static str) -> Self {
        Self { name, field: name }
    }
}

/// Static listing configuration of one resource.
#[derive(Debug, Clone, Copy)]
pub struct Listing {
    pub filters: &'static [FilterSpec],
    pub sorts: &'static [SortField],
    pub default_sort: SortField,
    pub default_order: SortOrder,
    pub page_sizes: &'static [u64],
    pub default_page_size: u64,
}

/// A composable filter condition.
///
/// Leaf conditions target one field; `Related` scopes a condition to the row a
/// foreign key points at; `And` and `Or` combine conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// Field equals any of `values`.
    Equals { field: String, values: Vec<String> },
    /// Every token is a substring of the normalized field.
    Tokens { field: String, tokens: Vec<String> },
    /// Digits of the field start with `digits`.
    DigitsPrefix { field: String, digits: String },
    /// Digits of the field contain `digits`.
    DigitsContains { field: String, digits: String },
    /// Normalized field contains the normalized `phrase`.
    Phrase { field: String, phrase: String },
    /// Inclusive numeric bounds.
    NumericRange {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Inclusive bounds on the date part of a date or timestamp field.
    DateRange {
        field: String,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    /// The row referenced through `step` exists and satisfies `condition`.
    Related {
        step: RelationStep,
        condition: Box<FilterCondition>,
    },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
}

impl FilterCondition {
    #[inline]
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            values: vec![value.into()],
        }
    }

    #[inline]
    pub fn equals_any<S: Into<String>>(field: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::Equals {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn tokens<S: Into<String>>(field: impl Into<String>, tokens: impl IntoIterator<Item = S>) -> Self {
        Self::Tokens {
            field: field.into(),
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn digits_prefix(field: impl Into<String>, digits: impl Into<String>) -> Self {
        Self::DigitsPrefix {
            field: field.into(),
            digits: digits.into(),
        }
    }

    #[inline]
    pub fn digits_contains(field: impl Into<String>, digits: impl Into<String>) -> Self {
        Self::DigitsContains {
            field: field.into(),
            digits: digits.into(),
        }
    }

    #[inline]
    pub fn phrase(field: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self::Phrase {
            field: field.into(),
            phrase: phrase.into(),
        }
    }

    #[inline]
    pub fn numeric_range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::NumericRange {
            field: field.into(),
            min,
            max,
        }
    }

    #[inline]
    pub fn date_range(field: impl Into<String>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self::DateRange {
            field: field.into(),
            from,
            to,
        }
    }

    #[inline]
    pub fn related(step: RelationStep, condition: FilterCondition) -> Self {
        Self::Related {
            step,
            condition: Box::new(condition),
        }
    }

    #[inline]
    pub fn and(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    #[inline]
    pub fn or(conditions: impl IntoIterator<Item = FilterCondition>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// The no-op condition.
    #[inline]
    pub fn match_all() -> Self {
        Self::And(Vec::new())
    }

    /// True when the condition cannot exclude any row.
    pub fn is_match_all(&self) -> bool {
        match self {
            Self::And(conditions) => conditions.iter().all(Self::is_match_all),
            Self::Or(conditions) => conditions.is_empty() || conditions.iter().any(Self::is_match_all),
            _ => false,
        }
    }

    /// True when the condition can be decided as matching nothing without a query.
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Self::Equals { values, .. } => values.is_empty(),
            Self::Related { condition, .. } => condition.is_unsatisfiable(),
            Self::And(conditions) => conditions.iter().any(Self::is_unsatisfiable),
            Self::Or(conditions) => !conditions.is_empty() && conditions.iter().all(Self::is_unsatisfiable),
            _ => false,
        }
    }

    /// Convert this condition to a RediSearch query clause.
    ///
    /// `Related` conditions render as a readable placeholder; stores must resolve them
    /// into `Equals` on the foreign key before querying. Tokens and digit fragments
    /// shorter than two characters are left out, so stores match those themselves.
    pub fn to_query_clause(&self) -> String {
        match self {
            Self::Equals { field, values } => {
                if values.is_empty() {
                    return format!("(@{}:{{{}}})", field, NO_MATCH_TAG);
                }
                let escaped: Vec<String> = values.iter().map(|v| escape_for_tag_query(v)).collect();
                format!("(@{}:{{{}}})", field, escaped.join(TAG_SEPARATOR))
            }
            Self::Tokens { field, tokens } => {
                let alias = text_alias(field);
                let clauses: Vec<String> = tokens
                    .iter()
                    .filter(|token| is_infix_fragment(token))
                    .map(|token| format!("@{}:{{{}}}", alias, escape_for_tag_contains(token)))
                    .collect();
                if clauses.is_empty() {
                    return String::new();
                }
                format!("({})", clauses.join(" "))
            }
            Self::DigitsPrefix { field, digits } => {
                format!("(@{}:{{{}*}})", digits_alias(field), escape_for_tag_query(digits))
            }
            Self::DigitsContains { field, digits } => {
                if !is_infix_fragment(digits) {
                    return String::new();
                }
                format!("(@{}:{{*{}*}})", digits_alias(field), escape_for_tag_query(digits))
            }
            Self::Phrase { field, phrase } => {
                format!("(@{}:{{{}}})", phrase_alias(field), escape_for_tag_contains(phrase))
            }
            Self::NumericRange { field, min, max } => {
                let min_s = min.map(format_numeric).unwrap_or_else(|| "-inf".to_string());
                let max_s = max.map(format_numeric).unwrap_or_else(|| "+inf".to_string());
                format!("(@{}:[{} {}])", field, min_s, max_s)
            }
            Self::DateRange { field, from, to } => {
                let min_s = from
                    .map(|date| day_start_timestamp(date).to_string())
                    .unwrap_or_else(|| "-inf".to_string());
                let max_s = to
                    .map(|date| day_end_timestamp(date).to_string())
                    .unwrap_or_else(|| "+inf".to_string());
                format!("(@{}:[{} {}])", date_alias(field), min_s, max_s)
            }
            Self::Related { step, condition } => {
                let inner = condition.to_query_clause();
                let inner = if inner.is_empty() { "*".to_string() } else { inner };
                format!("(@{}:=>{}{})", step.foreign_key, step.target.collection(), inner)
            }
            Self::And(conditions) => join_clauses(conditions, " "),
            Self::Or(conditions) => join_clauses(conditions, "|"),
        }
    }
}

fn join_clauses(conditions: &[FilterCondition], separator: &str) -> String {
    let clauses: Vec<String> = conditions
        .iter()
        .map(|c| c.to_query_clause())
        .filter(|s| !s.is_empty())
        .collect();
    match clauses.len() {
        0 => String::new(),
        1 => clauses.into_iter().next().unwrap_or_default(),
        _ => format!("({})", clauses.join(separator)),
    }
}

/// Epoch seconds at 00:00:00 UTC of `date`.
pub fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|datetime| datetime.and_utc().timestamp())
        .unwrap_or_default()
}

/// Epoch seconds at 23:59:59 UTC of `date`.
pub fn day_end_timestamp(date: NaiveDate) -> i64 {
    match date.checked_add_days(Days::new(1)) {
        Some(next) => day_start_timestamp(next) - 1,
        None => i64::MAX,
    }
}

#[derive(Debug, Clone)]
pub struct SearchSort {
    pub field: String,
    pub order: SortOrder,
}

/// Validated search parameters handed to a store.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub page: u64,
    pub page_size: u64,
    pub sort: Option<SearchSort>,
    /// All conditions are ANDed at top level.
    pub conditions: Vec<FilterCondition>,
}

impl SearchParams {
    pub fn new(page_size: u64) -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size,
            sort: None,
            conditions: Vec::new(),
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    #[inline]
    pub fn with_sort(mut self, sort: Option<SearchSort>) -> Self {
        self.sort = sort;
        self
    }

    #[inline]
    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[inline]
    pub fn with_page(mut self, page: u64, page_size: u64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// All conditions as one `And`.
    pub fn condition(&self) -> FilterCondition {
        FilterCondition::and(self.conditions.iter().cloned())
    }

    pub fn build_query(&self) -> String {
        let clause = self.condition().to_query_clause();
        if clause.is_empty() { "*".to_string() } else { clause }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> SearchResult<T> {
    pub fn empty(params: &SearchParams) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: params.page,
            page_size: params.page_size,
        }
    }

    #[inline]
    pub fn has_more(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> SearchResult<U> {
        SearchResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.page_size, self.total, self.items.len() as u64)
    }
}

/// Page metadata of a list response.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64, returned: u64) -> Self {
        let last_page = if per_page == 0 { 1 } else { total.div_ceil(per_page).max(1) };
        let (from, to) = if returned == 0 {
            (None, None)
        } else {
            let first = page.saturating_sub(1).saturating_mul(per_page).saturating_add(1);
            (Some(first), Some(first.saturating_add(returned - 1)))
        };
        Self {
            current_page: page,
            last_page,
            per_page,
            total,
            from,
            to,
        }
    }
}

/// A list request: reserved paging/sorting keys plus free filter parameters.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort_field: Option<String>,
    pub sort_direction: Option<String>,
    pub filters: FilterParams,
}

impl ListQuery {
    pub fn from_params(params: FilterParams) -> Self {
        Self {
            page: params.first("page").map(str::to_string),
            per_page: params.first("per_page").map(str::to_string),
            sort_field: params.first("sort_field").map(str::to_string),
            sort_direction: params.first("sort_direction").map(str::to_string),
            filters: params,
        }
    }

    pub fn from_query(query: &str) -> Self {
        Self::from_params(FilterParams::from_query(query))
    }

    /// Validates paging and sorting against `listing` and composes its filters.
    ///
    /// Never fails: unknown sorts, directions and page sizes fall back to the listing
    /// defaults and unparsable pages become page 1.
    pub fn into_params(self, listing: &Listing) -> (SearchParams, std::collections::BTreeMap<String, JsonValue>) {
        let page = self
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_PAGE)
            .max(1);

        let page_size = self
            .per_page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|size| listing.page_sizes.contains(size))
            .unwrap_or(listing.default_page_size);

        let sort_field = self
            .sort_field
            .as_deref()
            .and_then(|name| listing.sorts.iter().find(|sort| sort.name == name.trim()))
            .copied()
            .unwrap_or(listing.default_sort);

        let order = self
            .sort_direction
            .as_deref()
            .and_then(SortOrder::parse)
            .unwrap_or(listing.default_order);

        let composed = compose(&self.filters, listing.filters);
        let params = SearchParams::new(page_size)
            .with_page(page, page_size)
            .with_sort(Some(SearchSort {
                field: sort_field.field.to_string(),
                order,
            }))
            .with_condition(composed.condition);
        (params, composed.applied)
    }
}

/// How a field is mirrored into the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIndex {
    /// Exact values (ids, codes).
    Tag,
    /// Free text: exact values plus a normalized mirror matched by substring.
    Text,
    /// Exact values plus a digits-only mirror.
    Digits,
    /// Exact values plus a normalized phrase mirror.
    Phrase,
    Numeric,
    /// Date or timestamp: epoch-seconds and `YYYY-MM` mirrors.
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexedField {
    pub field: &'static str,
    pub index: FieldIndex,
}

impl IndexedField {
    pub const fn new(field: &'static str, index: FieldIndex) -> Self {
        Self { field, index }
    }
}

pub fn text_alias(field: &str) -> String {
    format!("{field}_norm")
}

pub fn digits_alias(field: &str) -> String {
    format!("{field}_digits")
}

pub fn phrase_alias(field: &str) -> String {
    format!("{field}_phrase")
}

pub fn date_alias(field: &str) -> String {
    format!("{field}_ts")
}

pub fn month_alias(field: &str) -> String {
    format!("{field}_month")
}

/// Alias a sort on `field` uses, given the collection's indexed fields.
pub fn sort_alias(fields: &[IndexedField], field: &str) -> String {
    match fields.iter().find(|indexed| indexed.field == field) {
        Some(indexed) if indexed.index == FieldIndex::Date => date_alias(field),
        _ => field.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFieldType {
    Tag,
    Numeric,
}

impl IndexFieldType {
    /// Words following `AS alias` in an `FT.CREATE` schema.
    pub fn schema_args(self) -> &'static [&'static str] {
        match self {
            IndexFieldType::Tag => &["TAG", "SEPARATOR", TAG_SEPARATOR, "CASESENSITIVE"],
            IndexFieldType::Numeric => &["NUMERIC"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexField {
    pub path: String,
    pub field_name: String,
    pub field_type: IndexFieldType,
    pub sortable: bool,
}

impl IndexField {
    fn new(path: String, field_name: String, field_type: IndexFieldType, sortable: bool) -> Self {
        Self {
            path,
            field_name,
            field_type,
            sortable,
        }
    }
}

/// Expands indexed fields into the RediSearch schema described in the module docs.
pub fn index_schema(fields: &[IndexedField]) -> Vec<IndexField> {
    let mut schema = Vec::with_capacity(fields.len() * 2);
    for indexed in fields {
        let field = indexed.field;
        let raw = format!("$.{field}");
        match indexed.index {
            FieldIndex::Tag => {
                schema.push(IndexField::new(raw, field.to_string(), IndexFieldType::Tag, true));
            }
            FieldIndex::Text => {
                schema.push(IndexField::new(raw, field.to_string(), IndexFieldType::Tag, true));
                schema.push(IndexField::new(
                    format!("$._norm.{field}"),
                    text_alias(field),
                    IndexFieldType::Tag,
                    false,
                ));
            }
            FieldIndex::Digits => {
                schema.push(IndexField::new(raw, field.to_string(), IndexFieldType::Tag, true));
                schema.push(IndexField::new(
                    format!("$._digits.{field}"),
                    digits_alias(field),
                    IndexFieldType::Tag,
                    false,
                ));
            }
            FieldIndex::Phrase => {
                schema.push(IndexField::new(raw, field.to_string(), IndexFieldType::Tag, true));
                schema.push(IndexField::new(
                    format!("$._norm.{field}"),
                    phrase_alias(field),
                    IndexFieldType::Tag,
                    false,
                ));
            }
            FieldIndex::Numeric => {
                schema.push(IndexField::new(raw, field.to_string(), IndexFieldType::Numeric, true));
            }
            FieldIndex::Date => {
                schema.push(IndexField::new(
                    format!("$._ts.{field}"),
                    date_alias(field),
                    IndexFieldType::Numeric,
                    true,
                ));
                schema.push(IndexField::new(
                    format!("$._month.{field}"),
                    month_alias(field),
                    IndexFieldType::Tag,
                    false,
                ));
            }
        }
    }
    schema
}

/// Escape a value for RediSearch TAG field queries.
///
/// Escapes `$ { } \ | . -`. Spaces, colons, brackets and quotes pass through.
///
/// ```
/// use cadrural::search::escape_for_tag_query;
///
/// assert_eq!(escape_for_tag_query("SP"), "SP");
/// assert_eq!(escape_for_tag_query("550e8400-e29b"), "550e8400\\-e29b");
/// assert_eq!(escape_for_tag_query("a|b"), "a\\|b");
/// assert_eq!(escape_for_tag_query("1.5"), "1\\.5");
/// ```
pub fn escape_for_tag_query(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '$' | '{' | '}' | '\\' | '|' | '.' | '-' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape a value for a TAG wildcard contains query (`{*value*}`).
///
/// Everything but letters, digits and `_` is escaped, spaces included.
///
/// ```
/// use cadrural::search::escape_for_tag_contains;
///
/// assert_eq!(escape_for_tag_contains("-23.5, -46"), "*\\-23\\.5\\,\\ \\-46*");
/// assert_eq!(escape_for_tag_contains("jose@example.com"), "*jose\\@example\\.com*");
/// ```
pub fn escape_for_tag_contains(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('*');
    for ch in value.chars() {
        if !(ch.is_alphanumeric() || ch == '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('*');
    escaped
}

fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FilterSpec, MatchStrategy};
    use crate::types::RelationStep;

    const FILTERS: &[FilterSpec] = &[FilterSpec::direct("nome", "nome", MatchStrategy::Tokens)];
    const SORTS: &[SortField] = &[SortField::new("nome"), SortField::new("created_at")];
    const LISTING: Listing = Listing {
        filters: FILTERS,
        sorts: SORTS,
        default_sort: SortField::new("nome"),
        default_order: SortOrder::Asc,
        page_sizes: &[10, 15, 25, 50, 100],
        default_page_size: 15,
    };

    fn params_for(query: &str) -> SearchParams {
        ListQuery::from_query(query).into_params(&LISTING).0
    }

    #[test]
    fn into_params_applies_defaults() {
        let params = params_for("");
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 15);
        let sort = params.sort.as_ref().expect("sort present");
        assert_eq!(sort.field, "nome");
        assert_eq!(sort.order, SortOrder::Asc);
        assert!(params.condition().is_match_all());
        assert_eq!(params.build_query(), "*");
    }

    #[test]
    fn unknown_sort_field_falls_back_to_default() {
        let params = params_for("sort_field=DROP%20TABLE&sort_direction=desc");
        let sort = params.sort.expect("sort present");
        assert_eq!(sort.field, "nome");
        assert_eq!(sort.order, SortOrder::Desc);
    }

    #[test]
    fn invalid_direction_uses_listing_default() {
        let params = params_for("sort_field=created_at&sort_direction=sideways");
        let sort = params.sort.expect("sort present");
        assert_eq!(sort.field, "created_at");
        assert_eq!(sort.order, SortOrder::Asc);

        let params = params_for("sort_direction=DESC");
        assert_eq!(params.sort.map(|sort| sort.order), Some(SortOrder::Desc));
    }

    #[test]
    fn page_size_outside_allow_list_falls_back() {
        assert_eq!(params_for("per_page=7").page_size, 15);
        assert_eq!(params_for("per_page=50").page_size, 50);
        assert_eq!(params_for("per_page=abc").page_size, 15);
    }

    #[test]
    fn page_is_clamped_to_one() {
        assert_eq!(params_for("page=0").page, 1);
        assert_eq!(params_for("page=-3").page, 1);
        assert_eq!(params_for("page=4").page, 4);
    }

    #[test]
    fn huge_pages_saturate_instead_of_overflowing() {
        let params = params_for("page=2000000000000000000");
        assert_eq!(params.page, 2_000_000_000_000_000_000);
        assert_eq!(params.offset(), u64::MAX);

        let result: SearchResult<()> = SearchResult::empty(&params);
        assert!(!result.has_more());
        assert_eq!(result.pagination().from, None);

        let pagination = Pagination::new(u64::MAX, 100, 5, 2);
        assert_eq!(pagination.from, Some(u64::MAX));
        assert_eq!(pagination.to, Some(u64::MAX));
    }

    #[test]
    fn tokens_render_as_tag_contains() {
        let clause = FilterCondition::tokens("nome", ["fazenda", "boa"]).to_query_clause();
        assert_eq!(clause, "(@nome_norm:{*fazenda*} @nome_norm:{*boa*})");

        let clause = FilterCondition::tokens("email", ["jose@example.com"]).to_query_clause();
        assert_eq!(clause, r"(@email_norm:{*jose\@example\.com*})");
        let clause = FilterCondition::tokens("nome_cultura", ["cana-de"]).to_query_clause();
        assert_eq!(clause, r"(@nome_cultura_norm:{*cana\-de*})");

        let clause = FilterCondition::tokens("nome", ["sitio", "e"]).to_query_clause();
        assert_eq!(clause, "(@nome_norm:{*sitio*})");
        assert_eq!(FilterCondition::tokens("nome", ["a"]).to_query_clause(), "");
        assert!(!is_infix_fragment("e"));
        assert!(is_infix_fragment("ze"));
    }

    #[test]
    fn leaf_clauses_render_with_aliases() {
        assert_eq!(FilterCondition::equals("uf", "SP").to_query_clause(), "(@uf:{SP})");
        assert_eq!(
            FilterCondition::equals_any("especie", ["Bovino", "Aves"]).to_query_clause(),
            "(@especie:{Bovino|Aves})"
        );
        assert_eq!(
            FilterCondition::digits_prefix("cpf_cnpj", "111").to_query_clause(),
            "(@cpf_cnpj_digits:{111*})"
        );
        assert_eq!(
            FilterCondition::digits_contains("telefone", "9876").to_query_clause(),
            "(@telefone_digits:{*9876*})"
        );
        assert_eq!(
            FilterCondition::numeric_range("area_total", Some(10.0), None).to_query_clause(),
            "(@area_total:[10 +inf])"
        );
        assert_eq!(
            FilterCondition::numeric_range("area_total", None, Some(2.5)).to_query_clause(),
            "(@area_total:[-inf 2.5])"
        );
    }

    #[test]
    fn date_range_covers_whole_days() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date");
        let clause = FilterCondition::date_range("created_at", Some(day), Some(day)).to_query_clause();
        assert_eq!(clause, "(@created_at_ts:[1735776000 1735862399])");
    }

    #[test]
    fn empty_equals_matches_nothing() {
        let condition = FilterCondition::equals_any::<String>("produtor_id", Vec::new());
        assert!(condition.is_unsatisfiable());
        assert_eq!(condition.to_query_clause(), "(@produtor_id:{__none__})");
        assert!(FilterCondition::and([condition.clone(), FilterCondition::equals("uf", "SP")]).is_unsatisfiable());
        assert!(!FilterCondition::or([condition, FilterCondition::equals("uf", "SP")]).is_unsatisfiable());
    }

    #[test]
    fn related_is_unsatisfiable_through_inner_condition() {
        let inner = FilterCondition::equals_any::<String>("id", Vec::new());
        assert!(FilterCondition::related(RelationStep::TO_PRODUCER, inner).is_unsatisfiable());
    }

    #[test]
    fn and_or_composition() {
        let condition = FilterCondition::and([
            FilterCondition::equals("uf", "SP"),
            FilterCondition::or([FilterCondition::equals("a", "1"), FilterCondition::equals("b", "2")]),
        ]);
        assert_eq!(condition.to_query_clause(), "((@uf:{SP}) ((@a:{1})|(@b:{2})))");
        assert_eq!(FilterCondition::and([FilterCondition::equals("uf", "SP")]).to_query_clause(), "(@uf:{SP})");
        assert_eq!(FilterCondition::match_all().to_query_clause(), "");
    }

    #[test]
    fn pagination_metadata() {
        let pagination = Pagination::new(2, 15, 40, 15);
        assert_eq!(pagination.last_page, 3);
        assert_eq!(pagination.from, Some(16));
        assert_eq!(pagination.to, Some(30));

        let past_end = Pagination::new(9, 15, 40, 0);
        assert_eq!(past_end.from, None);
        assert_eq!(past_end.to, None);

        assert_eq!(Pagination::new(1, 15, 0, 0).last_page, 1);
    }

    #[test]
    fn schema_expands_shadow_aliases() {
        let schema = index_schema(&[
            IndexedField::new("nome", FieldIndex::Text),
            IndexedField::new("created_at", FieldIndex::Date),
        ]);
        let names: Vec<&str> = schema.iter().map(|field| field.field_name.as_str()).collect();
        assert_eq!(names, vec!["nome", "nome_norm", "created_at_ts", "created_at_month"]);
        assert_eq!(schema[1].path, "$._norm.nome");
        assert_eq!(schema[1].field_type, IndexFieldType::Tag);
        assert_eq!(
            sort_alias(&[IndexedField::new("created_at", FieldIndex::Date)], "created_at"),
            "created_at_ts"
        );
    }
}
