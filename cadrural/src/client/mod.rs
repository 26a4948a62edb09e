//! Client facade over a store and the document file storage.
//!
//! This module provides:
//! - `Client` - Main entry point for registry operations
//! - mutations with reference checks, unique fields and cascading deletes
//! - enriched list rows (`Presented`)
//! - document upload, download and removal
//!
//! # Example
//! ```ignore
//! let client = Client::in_memory(DocumentStorage::new("storage/documentos", DEFAULT_MAX_BYTES));
//! let producer = client.create::<Producer>(input).await?;
//! let (page, filters) = client.collection::<Producer>().list(query).await?;
//! ```

mod documents;
mod mutations;
mod rows;

pub use rows::{HerdRow, Presented, ProducerRow, ProductionUnitRow, PropertyRow};

use std::sync::Arc;

use log::info;

use crate::{
    config::{AppConfig, StorageBackend},
    documents::DocumentStorage,
    errors::RepoError,
    models::Resource,
    repository::Repo,
    store::{MemoryStore, RedisStore, Store},
};

/// Main client for registry operations.
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn Store>,
    documents: DocumentStorage,
}

impl Client {
    pub fn new(store: Arc<dyn Store>, documents: DocumentStorage) -> Self {
        Self { store, documents }
    }

    /// Client backed by a process-local store.
    pub fn in_memory(documents: DocumentStorage) -> Self {
        Self::new(Arc::new(MemoryStore::new()), documents)
    }

    /// Client backed by Redis.
    ///
    /// # Example
    /// ```ignore
    /// let client = Client::connect("redis://localhost:6379", "cadrural", documents).await?;
    /// ```
    pub async fn connect(url: &str, prefix: &str, documents: DocumentStorage) -> Result<Self, RepoError> {
        let store = RedisStore::connect(url, prefix).await?;
        Ok(Self::new(Arc::new(store), documents))
    }

    /// Client for the configured backend.
    pub async fn from_config(config: &AppConfig) -> Result<Self, RepoError> {
        let documents = DocumentStorage::new(&config.documents.root, config.documents.max_bytes);
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("using in-memory storage");
                Ok(Self::in_memory(documents))
            }
            StorageBackend::Redis => {
                let url = config.storage.url.as_deref().ok_or_else(|| RepoError::InvalidRequest {
                    message: "storage.url is required for the redis backend".to_string(),
                })?;
                info!("using redis storage with prefix '{}'", config.storage.prefix);
                Self::connect(url, &config.storage.prefix, documents).await
            }
        }
    }

    /// Get a type-safe repository for the specified entity collection.
    pub fn collection<T: Resource>(&self) -> Repo<T> {
        Repo::new(Arc::clone(&self.store))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn documents(&self) -> &DocumentStorage {
        &self.documents
    }
}
