//! Core shortening logic: token assignment with collision probing, and
//! resolution with best-effort click counting.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SnaplinkError};
use crate::store::{Document, KvStore};
use crate::token;

/// Outcome of a successful resolve.
///
/// The redirect target is the primary result; `click_recorded` reports
/// whether the best-effort counter update landed. Callers redirect either
/// way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub url: String,
    pub click_recorded: bool,
}

/// Stateless between calls: everything lives in the injected store.
pub struct ShortenerService {
    store: Arc<dyn KvStore>,
    collection: String,
    max_attempts: usize,
}

impl ShortenerService {
    pub fn new(
        store: Arc<dyn KvStore>,
        collection: impl Into<String>,
        max_attempts: usize,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Shorten `long_url`, returning the committed token.
    ///
    /// Probes candidate tokens against the store until a free one is found,
    /// up to the configured attempt bound. Probing is the only retried
    /// operation; any backend failure aborts immediately.
    pub async fn create(&self, long_url: &str) -> Result<String> {
        if long_url.is_empty() {
            return Err(SnaplinkError::validation("url must not be empty"));
        }

        let mut attempts = 0usize;
        let token = loop {
            if attempts >= self.max_attempts {
                return Err(SnaplinkError::retries_exhausted(format!(
                    "no free token after {attempts} attempts"
                )));
            }
            attempts += 1;

            let candidate = token::generate(long_url);
            match self.store.get(&self.collection, &candidate).await? {
                None => break candidate,
                Some(_) => {
                    debug!("Token collision on '{}', regenerating", candidate);
                }
            }
        };

        let mut fields = Document::new();
        fields.insert("url".to_string(), Value::from(long_url));
        fields.insert("clicks".to_string(), Value::from(0));
        self.store.set(&self.collection, &token, fields).await?;

        Ok(token)
    }

    /// Resolve `token` to its long URL, counting the visit.
    ///
    /// The counter update is fire-and-forget with respect to the redirect:
    /// a failed increment is logged and reported through
    /// [`Resolution::click_recorded`], never as an error.
    pub async fn resolve(&self, token: &str) -> Result<Resolution> {
        if token.is_empty() {
            return Err(SnaplinkError::not_found("empty token"));
        }

        let doc = self
            .store
            .get(&self.collection, token)
            .await?
            .ok_or_else(|| SnaplinkError::not_found(format!("unknown token '{token}'")))?;

        let url = match doc.get("url") {
            Some(Value::String(url)) => url.clone(),
            Some(_) => {
                return Err(SnaplinkError::corrupt_data(format!(
                    "token '{token}' has a non-string url field"
                )));
            }
            None => {
                return Err(SnaplinkError::corrupt_data(format!(
                    "token '{token}' has no url field"
                )));
            }
        };

        let click_recorded = match self
            .store
            .increment(&self.collection, token, "clicks", 1)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to count click for '{}': {}", token, e);
                false
            }
        };

        Ok(Resolution {
            url,
            click_recorded,
        })
    }
}
