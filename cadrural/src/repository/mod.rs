//! Typed access to one collection of a [`Store`].

use std::{marker::PhantomData, sync::Arc};

use log::debug;
use serde_json::Value as JsonValue;

use crate::{
    errors::RepoError,
    models::{Listed, Resource},
    search::{FilterCondition, ListQuery, SearchParams, SearchResult},
    store::Store,
};

/// Typed repository over the documents of `T::KIND`.
pub struct Repo<T>
where
    T: Resource,
{
    store: Arc<dyn Store>,
    _marker: PhantomData<T>,
}

impl<T> Clone for Repo<T>
where
    T: Resource,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T> Repo<T>
where
    T: Resource,
{
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn get(&self, entity_id: &str) -> Result<Option<T>, RepoError> {
        match self.store.get(T::KIND, entity_id).await? {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    /// Like [`Repo::get`], failing with [`RepoError::NotFound`] when absent.
    pub async fn get_required(&self, entity_id: &str) -> Result<T, RepoError> {
        self.get(entity_id)
            .await?
            .ok_or_else(|| RepoError::not_found(T::KIND, entity_id))
    }

    /// Check if an entity with the given ID exists.
    pub async fn exists(&self, entity_id: &str) -> Result<bool, RepoError> {
        Ok(self.store.get(T::KIND, entity_id).await?.is_some())
    }

    pub async fn save(&self, entity: &T) -> Result<(), RepoError> {
        let value = serde_json::to_value(entity)?;
        self.store.put(T::KIND, entity.id(), &value).await?;
        debug!("saved {} {}", T::KIND.collection(), entity.id());
        Ok(())
    }

    pub async fn delete(&self, entity_id: &str) -> Result<bool, RepoError> {
        self.store.delete(T::KIND, entity_id).await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<SearchResult<T>, RepoError> {
        let page = self.store.search(T::KIND, params).await?;
        let items = page.items.into_iter().map(decode).collect::<Result<Vec<T>, _>>()?;
        Ok(SearchResult {
            items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    pub async fn count(&self, condition: &FilterCondition) -> Result<u64, RepoError> {
        self.store.count(T::KIND, condition).await
    }

    pub async fn ids_where(&self, condition: &FilterCondition) -> Result<Vec<String>, RepoError> {
        self.store.ids_where(T::KIND, condition).await
    }

    /// Every entity matching `condition`.
    pub async fn find_all(&self, condition: &FilterCondition) -> Result<Vec<T>, RepoError> {
        let mut found = Vec::new();
        for id in self.ids_where(condition).await? {
            if let Some(entity) = self.get(&id).await? {
                found.push(entity);
            }
        }
        Ok(found)
    }
}

impl<T> Repo<T>
where
    T: Listed,
{
    /// Runs a list request against the resource's filter and sort tables.
    ///
    /// Returns the page plus the recognized filters that were applied.
    pub async fn list(
        &self,
        query: ListQuery,
    ) -> Result<(SearchResult<T>, std::collections::BTreeMap<String, JsonValue>), RepoError> {
        let (params, applied) = query.into_params(T::listing());
        let page = self.search(&params).await?;
        Ok((page, applied))
    }
}

fn decode<T: Resource>(value: JsonValue) -> Result<T, RepoError> {
    serde_json::from_value(value).map_err(|err| RepoError::Other {
        message: format!("failed to deserialize {}: {err}", T::KIND.collection()).into(),
    })
}
