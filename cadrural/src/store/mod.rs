//! Storage backends for entity documents.
//!
//! A [`Store`] keeps JSON documents keyed by `(EntityKind, id)` and answers the
//! queries the repository, services and reports need: filtered pages, counts,
//! id sets, grouped aggregates and per-month counts.

pub mod memory;
pub mod redis;
mod redisearch;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use crate::{
    errors::RepoError,
    search::{FilterCondition, SearchParams, SearchResult},
    types::EntityKind,
};

/// One group of an aggregate query.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    /// Group values in the order the fields were requested; missing values are blank.
    pub keys: Vec<String>,
    pub count: u64,
    /// Sum of the requested field, zero when no sum was requested.
    pub sum: f64,
}

impl GroupRow {
    pub fn key(&self, index: usize) -> &str {
        self.keys.get(index).map(String::as_str).unwrap_or_default()
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts or replaces a document.
    async fn put(&self, kind: EntityKind, id: &str, document: &JsonValue) -> Result<(), RepoError>;

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<JsonValue>, RepoError>;

    /// Removes a document, returning whether it existed.
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, RepoError>;

    /// Filtered, sorted page of documents.
    async fn search(&self, kind: EntityKind, params: &SearchParams) -> Result<SearchResult<JsonValue>, RepoError>;

    async fn count(&self, kind: EntityKind, condition: &FilterCondition) -> Result<u64, RepoError>;

    /// Ids of every document matching `condition`.
    async fn ids_where(&self, kind: EntityKind, condition: &FilterCondition) -> Result<Vec<String>, RepoError>;

    /// Groups matching documents by `fields`, counting them and summing `sum`.
    ///
    /// With no fields, a single group covers every matching document; no group is
    /// returned when nothing matches.
    async fn group_by(
        &self,
        kind: EntityKind,
        condition: &FilterCondition,
        fields: &[&str],
        sum: Option<&str>,
    ) -> Result<Vec<GroupRow>, RepoError>;

    /// Document counts keyed by `YYYY-MM` of `date_field`, for dates on or after `since`.
    async fn monthly_counts(
        &self,
        kind: EntityKind,
        date_field: &str,
        since: NaiveDate,
    ) -> Result<BTreeMap<String, u64>, RepoError>;

    /// Sum of `field` over every document of `kind`.
    async fn sum(&self, kind: EntityKind, field: &str) -> Result<f64, RepoError> {
        let rows = self.group_by(kind, &FilterCondition::match_all(), &[], Some(field)).await?;
        Ok(rows.iter().map(|row| row.sum).sum())
    }

    async fn count_all(&self, kind: EntityKind) -> Result<u64, RepoError> {
        self.count(kind, &FilterCondition::match_all()).await
    }
}

/// `YYYY-MM` key of a date.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Removes the `_`-prefixed shadow values a store mirrors next to a document.
pub fn strip_shadow(mut document: JsonValue) -> JsonValue {
    if let Some(object) = document.as_object_mut() {
        object.retain(|key, _| !key.starts_with('_'));
    }
    document
}
