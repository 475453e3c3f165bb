//! Key-value store abstraction.
//!
//! The shortener treats its persistence as a generic document store: records
//! are loose field maps addressed by `(collection, key)`, with atomic
//! per-document numeric increments. Backends implement [`KvStore`] and are
//! selected by name through [`StoreFactory`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::errors::Result;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// A stored record. Field values are loosely typed on purpose: the resolve
/// path must be able to observe a record whose `url` field is missing or
/// mistyped and classify it as corrupt data.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch one document. `Ok(None)` means the key is absent; `Err` is a
    /// backend failure.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Create or overwrite the whole document at `key`.
    async fn set(&self, collection: &str, key: &str, fields: Document) -> Result<()>;

    /// Atomically add `by` to one numeric field of an existing document.
    /// The document must exist; the field may be absent (treated as 0).
    async fn increment(&self, collection: &str, key: &str, field: &str, by: i64) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub struct StoreFactory;

impl StoreFactory {
    pub async fn create(config: &StoreConfig) -> Result<Arc<dyn KvStore>> {
        let boxed: Box<dyn KvStore> = match config.backend.as_str() {
            "redis" => Box::new(self::redis::RedisStore::new(&config.redis).await?),
            _ => Box::new(MemoryStore::new()),
        };

        Ok(Arc::from(boxed))
    }
}
