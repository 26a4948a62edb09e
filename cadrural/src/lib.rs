//! cadrural core library.
//!
//! Rural registry of producers, properties, production units, herds and their
//! documents: accent-insensitive filtering, paged listings, dashboard aggregates
//! and a JSON API, over an in-memory or Redis (RedisJSON + RediSearch) store.

pub mod client;
pub mod config;
pub mod documents;
pub mod errors;
pub mod exports;
pub mod filters;
pub mod http;
pub mod id;
pub mod keys;
pub mod models;
pub mod reports;
pub mod repository;
pub mod search;
pub mod seed;
pub mod store;
pub mod types;
pub mod validators;

pub use client::{Client, Presented};
pub use config::{AppConfig, StorageBackend};
pub use documents::{DocumentStorage, Upload};
pub use errors::*;
pub use filters::{FilterParams, FilterSpec, MatchStrategy, compose};
pub use repository::Repo;
pub use search::{FilterCondition, ListQuery, SearchParams, SearchResult, SortOrder};
pub use store::{MemoryStore, RedisStore, Store};
pub use types::EntityKind;

// Re-export redis types so users don't need to depend on a specific redis version
pub use redis;
pub use redis::aio::ConnectionManager;
