//! In-process store backend.
//!
//! Default backend for development and tests. Documents live in a `DashMap`;
//! `increment` mutates through the entry guard, which holds the shard lock
//! for the duration of the read-modify-write, so concurrent increments on
//! one document never lose updates.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{Document, KvStore};
use crate::errors::{Result, SnaplinkError};

#[derive(Default)]
pub struct MemoryStore {
    inner: DashMap<String, Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    fn composite_key(collection: &str, key: &str) -> String {
        format!("{collection}\u{1f}{key}")
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        Ok(self
            .inner
            .get(&Self::composite_key(collection, key))
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        self.inner.insert(Self::composite_key(collection, key), fields);
        Ok(())
    }

    async fn increment(&self, collection: &str, key: &str, field: &str, by: i64) -> Result<()> {
        let mut entry = self
            .inner
            .get_mut(&Self::composite_key(collection, key))
            .ok_or_else(|| {
                SnaplinkError::not_found(format!("no document '{key}' in '{collection}'"))
            })?;

        let doc = entry.value_mut();
        let current = match doc.get(field) {
            Some(value) => value.as_i64().ok_or_else(|| {
                SnaplinkError::corrupt_data(format!(
                    "field '{field}' of '{key}' is not an integer"
                ))
            })?,
            None => 0,
        };

        doc.insert(field.to_string(), Value::from(current + by));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
