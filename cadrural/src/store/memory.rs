use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use super::{GroupRow, Store, month_key};
use crate::{
    errors::RepoError,
    search::{
        FilterCondition, SearchParams, SearchResult,
        eval::{Resolver, compare_by, field_date, field_number, field_text, matches},
    },
    types::EntityKind,
};

/// Process-local store. Filters are evaluated in the application layer.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    rows: HashMap<EntityKind, BTreeMap<String, JsonValue>>,
}

impl State {
    fn matching<'a>(&'a self, kind: EntityKind, condition: &'a FilterCondition) -> impl Iterator<Item = &'a JsonValue> {
        self.rows
            .get(&kind)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(move |doc| matches(doc, condition, self))
    }
}

impl Resolver for State {
    fn resolve(&self, kind: EntityKind, id: &str) -> Option<&JsonValue> {
        self.rows.get(&kind)?.get(id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, kind: EntityKind, id: &str, document: &JsonValue) -> Result<(), RepoError> {
        let mut guard = self.state.lock().await;
        guard.rows.entry(kind).or_default().insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<JsonValue>, RepoError> {
        let guard = self.state.lock().await;
        Ok(guard.resolve(kind, id).cloned())
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, RepoError> {
        let mut guard = self.state.lock().await;
        Ok(guard
            .rows
            .get_mut(&kind)
            .is_some_and(|rows| rows.remove(id).is_some()))
    }

    async fn search(&self, kind: EntityKind, params: &SearchParams) -> Result<SearchResult<JsonValue>, RepoError> {
        let condition = params.condition();
        debug!("memory search on {}: {}", kind.collection(), params.build_query());

        let guard = self.state.lock().await;
        let mut hits: Vec<&JsonValue> = guard.matching(kind, &condition).collect();
        if let Some(sort) = &params.sort {
            hits.sort_by(|a, b| compare_by(a, b, &sort.field, sort.order));
        }

        let total = hits.len() as u64;
        let offset = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let page_size = usize::try_from(params.page_size).unwrap_or(usize::MAX);
        let items = hits.into_iter().skip(offset).take(page_size).cloned().collect();

        Ok(SearchResult {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
        })
    }

    async fn count(&self, kind: EntityKind, condition: &FilterCondition) -> Result<u64, RepoError> {
        let guard = self.state.lock().await;
        Ok(guard.matching(kind, condition).count() as u64)
    }

    async fn ids_where(&self, kind: EntityKind, condition: &FilterCondition) -> Result<Vec<String>, RepoError> {
        let guard = self.state.lock().await;
        Ok(guard
            .matching(kind, condition)
            .filter_map(|doc| field_text(doc, "id"))
            .collect())
    }

    async fn group_by(
        &self,
        kind: EntityKind,
        condition: &FilterCondition,
        fields: &[&str],
        sum: Option<&str>,
    ) -> Result<Vec<GroupRow>, RepoError> {
        let guard = self.state.lock().await;
        let mut groups: BTreeMap<Vec<String>, (u64, f64)> = BTreeMap::new();
        for doc in guard.matching(kind, condition) {
            let keys = fields
                .iter()
                .map(|field| field_text(doc, field).unwrap_or_default())
                .collect();
            let entry = groups.entry(keys).or_default();
            entry.0 += 1;
            if let Some(field) = sum {
                entry.1 += field_number(doc, field).unwrap_or_default();
            }
        }
        Ok(groups
            .into_iter()
            .map(|(keys, (count, sum))| GroupRow { keys, count, sum })
            .collect())
    }

    async fn monthly_counts(
        &self,
        kind: EntityKind,
        date_field: &str,
        since: NaiveDate,
    ) -> Result<BTreeMap<String, u64>, RepoError> {
        let guard = self.state.lock().await;
        let mut counts = BTreeMap::new();
        for doc in guard.rows.get(&kind).into_iter().flat_map(BTreeMap::values) {
            if let Some(date) = field_date(doc, date_field).filter(|date| *date >= since) {
                *counts.entry(month_key(date)).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        search::{SearchSort, SortOrder},
        types::RelationStep,
    };

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put(EntityKind::Producer, "p1", &json!({"id": "p1", "nome": "José da Silva"}))
            .await
            .expect("put");
        store
            .put(EntityKind::Producer, "p2", &json!({"id": "p2", "nome": "Maria Souza"}))
            .await
            .expect("put");
        for (id, nome, municipio, produtor, area) in [
            ("f1", "Fazenda Boa Vista", "Campinas", "p1", 100.0),
            ("f2", "Sítio Alegre", "Campinas", "p2", 20.5),
            ("f3", "Fazenda Ruim", "Jundiaí", "p2", 7.0),
        ] {
            store
                .put(
                    EntityKind::Property,
                    id,
                    &json!({
                        "id": id,
                        "nome": nome,
                        "municipio": municipio,
                        "produtor_id": produtor,
                        "area_total": area,
                        "data_cadastro": "2025-09-10",
                    }),
                )
                .await
                .expect("put");
        }
        store
    }

    #[tokio::test]
    async fn search_filters_sorts_and_pages() {
        let store = seeded().await;
        let params = SearchParams::new(1)
            .with_condition(FilterCondition::related(
                RelationStep::TO_PRODUCER,
                FilterCondition::tokens("nome", ["maria"]),
            ))
            .with_sort(Some(SearchSort {
                field: "area_total".into(),
                order: SortOrder::Desc,
            }));
        let page = store.search(EntityKind::Property, &params).await.expect("search");
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0]["id"], "f2");

        let past_end = store
            .search(EntityKind::Property, &params.clone().with_page(5, 1))
            .await
            .expect("search");
        assert_eq!(past_end.total, 2);
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn group_by_counts_and_sums() {
        let store = seeded().await;
        let rows = store
            .group_by(EntityKind::Property, &FilterCondition::match_all(), &["municipio"], Some("area_total"))
            .await
            .expect("group");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key(0), "Campinas");
        assert_eq!(rows[0].count, 2);
        assert!((rows[0].sum - 120.5).abs() < 1e-9);

        assert!((store.sum(EntityKind::Property, "area_total").await.expect("sum") - 127.5).abs() < 1e-9);
        assert_eq!(store.sum(EntityKind::Herd, "quantidade").await.expect("sum"), 0.0);
    }

    #[tokio::test]
    async fn monthly_counts_respect_the_lower_bound() {
        let store = seeded().await;
        let since = NaiveDate::from_ymd_opt(2025, 9, 1).expect("date");
        let counts = store
            .monthly_counts(EntityKind::Property, "data_cadastro", since)
            .await
            .expect("counts");
        assert_eq!(counts.get("2025-09"), Some(&3));

        let later = NaiveDate::from_ymd_opt(2025, 10, 1).expect("date");
        assert!(
            store
                .monthly_counts(EntityKind::Property, "data_cadastro", later)
                .await
                .expect("counts")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = seeded().await;
        assert!(store.delete(EntityKind::Producer, "p1").await.expect("delete"));
        assert!(!store.delete(EntityKind::Producer, "p1").await.expect("delete"));
        assert_eq!(store.count_all(EntityKind::Producer).await.expect("count"), 1);
    }
}
