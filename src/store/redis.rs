//! Redis store backend.
//!
//! Each document is a Redis hash at `{prefix}{collection}:{key}` with every
//! field value JSON-encoded. JSON integers encode as bare decimals, so
//! `HINCRBY` operates on them directly and the incremented value stays
//! valid JSON.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::{Document, KvStore};
use crate::config::RedisConfig;
use crate::errors::{Result, SnaplinkError};

pub struct RedisStore {
    client: redis::Client,
    /// Lazily re-established multiplexed connection, reset on error.
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisStore {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.clone())
            .map_err(|e| SnaplinkError::storage(format!("invalid redis url: {e}")))?;

        // Verify reachability up front so a bad REDIS_URL fails at startup
        // instead of on the first request.
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        debug!("Redis connection established, prefix: '{}'", config.key_prefix);

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(Some(conn))),
            key_prefix: config.key_prefix.clone(),
        })
    }

    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // Double-check after taking the write lock.
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection re-established");

        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn make_key(&self, collection: &str, key: &str) -> String {
        format!("{}{}:{}", self.key_prefix, collection, key)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let redis_key = self.make_key(collection, key);
        let mut conn = self.get_connection().await?;

        let raw: HashMap<String, String> = match conn.hgetall(&redis_key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to read '{}': {}", redis_key, e);
                self.reset_connection().await;
                return Err(e.into());
            }
        };

        // An empty hash and an absent key are indistinguishable; documents
        // written by this store always carry at least one field.
        if raw.is_empty() {
            return Ok(None);
        }

        let mut doc = Document::new();
        for (field, value) in raw {
            let parsed = serde_json::from_str(&value).map_err(|e| {
                SnaplinkError::corrupt_data(format!(
                    "field '{field}' of '{redis_key}' holds invalid JSON: {e}"
                ))
            })?;
            doc.insert(field, parsed);
        }

        Ok(Some(doc))
    }

    async fn set(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        let redis_key = self.make_key(collection, key);
        let mut conn = self.get_connection().await?;

        // DEL + HSET in one atomic pipeline gives overwrite semantics:
        // fields from a previous document never leak into the new one.
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.del(&redis_key).ignore();
        for (field, value) in &fields {
            let encoded = serde_json::to_string(value)
                .map_err(|e| SnaplinkError::storage(format!("unencodable field '{field}': {e}")))?;
            pipe.hset(&redis_key, field, encoded).ignore();
        }

        if let Err(e) = pipe.query_async::<()>(&mut conn).await {
            error!("Failed to write '{}': {}", redis_key, e);
            self.reset_connection().await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn increment(&self, collection: &str, key: &str, field: &str, by: i64) -> Result<()> {
        let redis_key = self.make_key(collection, key);
        let mut conn = self.get_connection().await?;

        let exists: bool = match conn.exists(&redis_key).await {
            Ok(exists) => exists,
            Err(e) => {
                error!("Failed to check '{}': {}", redis_key, e);
                self.reset_connection().await;
                return Err(e.into());
            }
        };
        if !exists {
            return Err(SnaplinkError::not_found(format!(
                "no document '{key}' in '{collection}'"
            )));
        }

        match conn.hincr::<_, _, _, i64>(&redis_key, field, by).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to increment '{}.{}': {}", redis_key, field, e);
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
