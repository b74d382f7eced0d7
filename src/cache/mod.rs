//! Cache-aside query layer.
//!
//! Sits between the application services and two collaborators: the durable
//! record store (authoritative) and a volatile key-value cache. Reads follow
//! read-through semantics (`read_path`), writes trigger synchronous
//! invalidation (`invalidation`), and both agree on key construction
//! (`keys`). The cache backend is an injected capability (`client`), never a
//! singleton, so tests substitute an in-memory implementation.

pub mod client;
pub mod config;
pub mod invalidation;
pub mod keys;
pub mod read_path;

pub use client::{CacheClient, CacheError, MemoryCacheClient};
pub use config::CacheConfig;
pub use invalidation::Invalidator;
pub use keys::{CollectionQuery, EntityKind, collection_key, collection_prefix, entity_key};
pub use read_path::{FetchError, fetch_collection, fetch_entity};
