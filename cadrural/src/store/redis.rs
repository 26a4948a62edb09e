use std::{collections::BTreeMap, future::Future, pin::Pin};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::debug;
use redis::{Value, aio::ConnectionManager, cmd};
use serde_json::{Map, Value as JsonValue};

use super::{
    GroupRow, Store, month_key,
    redisearch::{IndexDefinition, ensure_index, field_pairs, reply_text, search_page, split_reply},
    strip_shadow,
};
use crate::{
    errors::RepoError,
    filters::{digits_only, normalize},
    keys::KeyContext,
    models::indexed_fields,
    search::{
        FieldIndex, FilterCondition, SearchParams, SearchResult, date_alias, day_start_timestamp, index_schema,
        is_infix_fragment, month_alias, sort_alias,
    },
    types::EntityKind,
};

const ID_BATCH: u64 = 1000;
const AGGREGATE_LIMIT: u64 = 10_000;
const AGGREGATE_DIALECT: u64 = 2;
const SCANNED_VALUE: &str = "scanned";

type BoxedCondition<'a> = Pin<Box<dyn Future<Output = Result<FilterCondition, RepoError>> + Send + 'a>>;

/// RedisJSON documents indexed by RediSearch.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connects and makes sure every collection index exists.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, RepoError> {
        let redis_client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(redis_client).await?;
        let store = Self {
            conn,
            prefix: prefix.into(),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    async fn ensure_indexes(&self) -> Result<(), RepoError> {
        let mut conn = self.conn.clone();
        for kind in EntityKind::ALL {
            let keys = self.keys();
            let definition = IndexDefinition {
                name: keys.index(kind),
                prefix: keys.collection_prefix(kind),
                schema: index_schema(indexed_fields(kind)),
            };
            ensure_index(&mut conn, &definition).await?;
        }
        Ok(())
    }

    /// Replaces relationship hops with foreign-key id sets and fragments too short
    /// for a contains query with the ids of the rows that hold them.
    fn resolve<'a>(&'a self, kind: EntityKind, condition: &'a FilterCondition) -> BoxedCondition<'a> {
        Box::pin(async move {
            match condition {
                FilterCondition::Related { step, condition } => {
                    let inner = self.resolve(step.target, condition).await?;
                    let ids = self.resolved_ids(step.target, &inner).await?;
                    Ok(FilterCondition::equals_any(step.foreign_key, ids))
                }
                FilterCondition::Tokens { field, tokens } if !tokens.iter().all(|token| is_infix_fragment(token)) => {
                    let (long, short): (Vec<&String>, Vec<&String>) =
                        tokens.iter().partition(|token| is_infix_fragment(token));
                    let scope = FilterCondition::tokens(field.as_str(), long);
                    let ids = self.ids_containing(kind, &format!("$._norm.{field}"), &scope, &short).await?;
                    Ok(FilterCondition::equals_any("id", ids))
                }
                FilterCondition::DigitsContains { field, digits } if !is_infix_fragment(digits) => {
                    let ids = self
                        .ids_containing(kind, &format!("$._digits.{field}"), &FilterCondition::match_all(), &[digits])
                        .await?;
                    Ok(FilterCondition::equals_any("id", ids))
                }
                FilterCondition::And(conditions) => {
                    let mut resolved = Vec::with_capacity(conditions.len());
                    for condition in conditions {
                        resolved.push(self.resolve(kind, condition).await?);
                    }
                    Ok(FilterCondition::And(resolved))
                }
                FilterCondition::Or(conditions) => {
                    let mut resolved = Vec::with_capacity(conditions.len());
                    for condition in conditions {
                        resolved.push(self.resolve(kind, condition).await?);
                    }
                    Ok(FilterCondition::Or(resolved))
                }
                other => Ok(other.clone()),
            }
        })
    }

    async fn resolved_query(&self, kind: EntityKind, condition: &FilterCondition) -> Result<Option<String>, RepoError> {
        let resolved = self.resolve(kind, condition).await?;
        if resolved.is_unsatisfiable() {
            return Ok(None);
        }
        let clause = resolved.to_query_clause();
        Ok(Some(if clause.is_empty() { "*".to_string() } else { clause }))
    }

    async fn resolved_ids(&self, kind: EntityKind, condition: &FilterCondition) -> Result<Vec<String>, RepoError> {
        if condition.is_unsatisfiable() {
            return Ok(Vec::new());
        }
        let clause = condition.to_query_clause();
        let query = if clause.is_empty() { "*".to_string() } else { clause };
        self.ids_for_query(kind, &query).await
    }

    async fn ids_for_query(&self, kind: EntityKind, query: &str) -> Result<Vec<String>, RepoError> {
        let keys = self.keys();
        let index = keys.index(kind);
        let key_prefix = keys.collection_prefix(kind);
        let mut conn = self.conn.clone();
        let mut ids = Vec::new();
        let mut offset = 0;

        loop {
            let raw: Value = cmd("FT.SEARCH")
                .arg(&index)
                .arg(query)
                .arg("NOCONTENT")
                .arg("LIMIT")
                .arg(offset)
                .arg(ID_BATCH)
                .arg("DIALECT")
                .arg(AGGREGATE_DIALECT)
                .query_async(&mut conn)
                .await?;
            let (total, found) = split_reply(raw)?;
            for key in &found {
                let key = reply_text(key)?;
                ids.push(key.strip_prefix(&key_prefix).unwrap_or(&key).to_string());
            }
            offset += ID_BATCH;
            if found.is_empty() || offset >= total {
                break;
            }
        }

        debug!("{} ids of {} match {}", ids.len(), kind.collection(), query);
        Ok(ids)
    }

    /// Ids of rows in `scope` whose value at `path` contains every fragment.
    async fn ids_containing(
        &self,
        kind: EntityKind,
        path: &str,
        scope: &FilterCondition,
        fragments: &[&String],
    ) -> Result<Vec<String>, RepoError> {
        let keys = self.keys();
        let index = keys.index(kind);
        let key_prefix = keys.collection_prefix(kind);
        let clause = scope.to_query_clause();
        let query = if clause.is_empty() { "*".to_string() } else { clause };
        let mut conn = self.conn.clone();
        let mut ids = Vec::new();
        let mut offset = 0;

        loop {
            let raw: Value = cmd("FT.SEARCH")
                .arg(&index)
                .arg(&query)
                .arg("RETURN")
                .arg(3)
                .arg(path)
                .arg("AS")
                .arg(SCANNED_VALUE)
                .arg("LIMIT")
                .arg(offset)
                .arg(ID_BATCH)
                .arg("DIALECT")
                .arg(AGGREGATE_DIALECT)
                .query_async(&mut conn)
                .await?;
            let (total, entries) = split_reply(raw)?;
            for entry in entries.chunks_exact(2) {
                let fields = field_pairs(&entry[1])?;
                let value = fields.get(SCANNED_VALUE).and_then(JsonValue::as_str).unwrap_or_default();
                if fragments.iter().all(|fragment| value.contains(fragment.as_str())) {
                    let key = reply_text(&entry[0])?;
                    ids.push(key.strip_prefix(&key_prefix).unwrap_or(&key).to_string());
                }
            }
            offset += ID_BATCH;
            if entries.is_empty() || offset >= total {
                break;
            }
        }

        debug!("{} {} rows hold {:?} at {}", ids.len(), kind.collection(), fragments, path);
        Ok(ids)
    }

    async fn aggregate(&self, kind: EntityKind, query: &str, tail: &[String]) -> Result<Vec<Map<String, JsonValue>>, RepoError> {
        let mut command = cmd("FT.AGGREGATE");
        command.arg(self.keys().index(kind)).arg(query);
        for arg in tail {
            command.arg(arg.as_str());
        }
        command.arg("LIMIT").arg(0).arg(AGGREGATE_LIMIT);
        command.arg("DIALECT").arg(AGGREGATE_DIALECT);

        let mut conn = self.conn.clone();
        let raw: Value = command.query_async(&mut conn).await?;
        let (_, rows) = split_reply(raw)?;
        rows.iter().map(field_pairs).collect()
    }
}

/// Entity document plus the shadow values its indexed fields need.
fn with_shadow(kind: EntityKind, document: &JsonValue) -> JsonValue {
    let Some(object) = document.as_object() else {
        return document.clone();
    };
    let mut stored: Map<String, JsonValue> = object
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let mut norm = Map::new();
    let mut digits = Map::new();
    let mut ts = Map::new();
    let mut month = Map::new();

    for indexed in indexed_fields(kind) {
        let Some(value) = object.get(indexed.field).filter(|value| !value.is_null()) else {
            continue;
        };
        let text = match value {
            JsonValue::String(text) => text.clone(),
            other => other.to_string(),
        };
        let field = indexed.field.to_string();
        match indexed.index {
            FieldIndex::Text | FieldIndex::Phrase => {
                norm.insert(field, JsonValue::String(normalize(&text)));
            }
            FieldIndex::Digits => {
                digits.insert(field, JsonValue::String(digits_only(&text)));
            }
            FieldIndex::Date => {
                if let Some((seconds, date)) = parse_timestamp(&text) {
                    ts.insert(field.clone(), JsonValue::from(seconds));
                    month.insert(field, JsonValue::String(month_key(date)));
                }
            }
            FieldIndex::Tag | FieldIndex::Numeric => {}
        }
    }

    stored.insert("_norm".to_string(), JsonValue::Object(norm));
    stored.insert("_digits".to_string(), JsonValue::Object(digits));
    stored.insert("_ts".to_string(), JsonValue::Object(ts));
    stored.insert("_month".to_string(), JsonValue::Object(month));
    JsonValue::Object(stored)
}

/// Epoch seconds and date of an RFC 3339 timestamp or a `YYYY-MM-DD` date.
fn parse_timestamp(raw: &str) -> Option<(i64, NaiveDate)> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some((datetime.timestamp(), datetime.date_naive()));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some((day_start_timestamp(date), date))
}

fn field_string(row: &Map<String, JsonValue>, name: &str) -> String {
    row.get(name).and_then(JsonValue::as_str).unwrap_or_default().to_string()
}

fn field_f64(row: &Map<String, JsonValue>, name: &str) -> f64 {
    row.get(name)
        .and_then(JsonValue::as_str)
        .and_then(|raw| raw.parse::<f64>().ok())
        .unwrap_or_default()
}

#[async_trait]
impl Store for RedisStore {
    async fn put(&self, kind: EntityKind, id: &str, document: &JsonValue) -> Result<(), RepoError> {
        let payload = serde_json::to_string(&with_shadow(kind, document))?;
        let mut conn = self.conn.clone();
        let _: () = cmd("JSON.SET")
            .arg(self.keys().entity(kind, id))
            .arg("$")
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        debug!("stored {} {}", kind.collection(), id);
        Ok(())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<JsonValue>, RepoError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = cmd("JSON.GET")
            .arg(self.keys().entity(kind, id))
            .query_async(&mut conn)
            .await?;
        match result {
            Some(json) => Ok(Some(strip_shadow(serde_json::from_str(&json)?))),
            None => Ok(None),
        }
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, RepoError> {
        let mut conn = self.conn.clone();
        let removed: u64 = cmd("DEL")
            .arg(self.keys().entity(kind, id))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn search(&self, kind: EntityKind, params: &SearchParams) -> Result<SearchResult<JsonValue>, RepoError> {
        let Some(query) = self.resolved_query(kind, &params.condition()).await? else {
            return Ok(SearchResult::empty(params));
        };
        debug!("redis search on {}: {}", kind.collection(), query);

        let sort_field = params
            .sort
            .as_ref()
            .map(|sort| (sort_alias(indexed_fields(kind), &sort.field), sort.order));
        let mut conn = self.conn.clone();
        let (total, items) = search_page(
            &mut conn,
            &self.keys().index(kind),
            &query,
            sort_field.as_ref().map(|(field, order)| (field.as_str(), *order)),
            params.offset(),
            params.page_size,
        )
        .await?;

        Ok(SearchResult {
            items: items.into_iter().map(strip_shadow).collect(),
            total,
            page: params.page,
            page_size: params.page_size,
        })
    }

    async fn count(&self, kind: EntityKind, condition: &FilterCondition) -> Result<u64, RepoError> {
        let Some(query) = self.resolved_query(kind, condition).await? else {
            return Ok(0);
        };
        let mut conn = self.conn.clone();
        let raw: Value = cmd("FT.SEARCH")
            .arg(self.keys().index(kind))
            .arg(&query)
            .arg("LIMIT")
            .arg(0)
            .arg(0)
            .arg("DIALECT")
            .arg(AGGREGATE_DIALECT)
            .query_async(&mut conn)
            .await?;
        let (total, _) = split_reply(raw)?;
        Ok(total)
    }

    async fn ids_where(&self, kind: EntityKind, condition: &FilterCondition) -> Result<Vec<String>, RepoError> {
        match self.resolved_query(kind, condition).await? {
            Some(query) => self.ids_for_query(kind, &query).await,
            None => Ok(Vec::new()),
        }
    }

    async fn group_by(
        &self,
        kind: EntityKind,
        condition: &FilterCondition,
        fields: &[&str],
        sum: Option<&str>,
    ) -> Result<Vec<GroupRow>, RepoError> {
        let Some(query) = self.resolved_query(kind, condition).await? else {
            return Ok(Vec::new());
        };

        let loaded: Vec<&str> = fields.iter().copied().chain(sum).collect();
        let mut tail = vec!["LOAD".to_string(), loaded.len().to_string()];
        tail.extend(loaded.iter().map(|field| format!("@{field}")));
        tail.push("GROUPBY".to_string());
        tail.push(fields.len().to_string());
        tail.extend(fields.iter().map(|field| format!("@{field}")));
        tail.extend(["REDUCE", "COUNT", "0", "AS", "count"].map(String::from));
        if let Some(field) = sum {
            tail.extend(["REDUCE".to_string(), "SUM".to_string(), "1".to_string(), format!("@{field}")]);
            tail.extend(["AS", "sum"].map(String::from));
        }

        let mut rows: Vec<GroupRow> = self
            .aggregate(kind, &query, &tail)
            .await?
            .into_iter()
            .map(|row| GroupRow {
                keys: fields.iter().map(|field| field_string(&row, field)).collect(),
                count: field_f64(&row, "count") as u64,
                sum: field_f64(&row, "sum"),
            })
            .filter(|row| row.count > 0)
            .collect();
        rows.sort_by(|a, b| a.keys.cmp(&b.keys));
        Ok(rows)
    }

    async fn monthly_counts(
        &self,
        kind: EntityKind,
        date_field: &str,
        since: NaiveDate,
    ) -> Result<BTreeMap<String, u64>, RepoError> {
        let query = format!("(@{}:[{} +inf])", date_alias(date_field), day_start_timestamp(since));
        let month = month_alias(date_field);
        let tail = vec![
            "LOAD".to_string(),
            "1".to_string(),
            format!("@{month}"),
            "GROUPBY".to_string(),
            "1".to_string(),
            format!("@{month}"),
            "REDUCE".to_string(),
            "COUNT".to_string(),
            "0".to_string(),
            "AS".to_string(),
            "count".to_string(),
        ];

        let mut counts = BTreeMap::new();
        for row in self.aggregate(kind, &query, &tail).await? {
            let key = field_string(&row, &month);
            if !key.is_empty() {
                counts.insert(key, field_f64(&row, "count") as u64);
            }
        }
        Ok(counts)
    }
}
