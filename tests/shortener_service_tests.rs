//! Shortener service tests
//!
//! Create/resolve orchestration against a scripted store: collision
//! probing, bounded retries, error classification and the best-effort
//! click counter.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use snaplink::errors::{Result, SnaplinkError};
use snaplink::services::ShortenerService;
use snaplink::store::{Document, KvStore, MemoryStore};
use snaplink::token::TOKEN_LEN;

const COLLECTION: &str = "shortener";

fn link_doc(url: &str, clicks: i64) -> Document {
    let mut doc = Document::new();
    doc.insert("url".to_string(), Value::from(url));
    doc.insert("clicks".to_string(), Value::from(clicks));
    doc
}

// =============================================================================
// Test store with injectable behavior
// =============================================================================

/// Store double that counts calls and can simulate collisions and backend
/// failures.
#[derive(Default)]
struct ScriptedStore {
    docs: RwLock<HashMap<String, Document>>,
    /// Report "key exists" for the first N `get` calls.
    collide_first: usize,
    fail_gets: bool,
    fail_sets: bool,
    fail_increments: bool,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
    increment_calls: AtomicUsize,
}

#[async_trait]
impl KvStore for ScriptedStore {
    async fn get(&self, _collection: &str, key: &str) -> Result<Option<Document>> {
        let probes = self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets {
            return Err(SnaplinkError::storage("injected get failure"));
        }
        if probes < self.collide_first {
            return Ok(Some(link_doc("https://occupied.example/", 0)));
        }
        Ok(self.docs.read().await.get(key).cloned())
    }

    async fn set(&self, _collection: &str, key: &str, fields: Document) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets {
            return Err(SnaplinkError::storage("injected set failure"));
        }
        self.docs.write().await.insert(key.to_string(), fields);
        Ok(())
    }

    async fn increment(&self, _collection: &str, key: &str, field: &str, by: i64) -> Result<()> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments {
            return Err(SnaplinkError::storage("injected increment failure"));
        }
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(key)
            .ok_or_else(|| SnaplinkError::not_found(format!("no document '{key}'")))?;
        let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
        doc.insert(field.to_string(), Value::from(current + by));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

fn service_over(store: Arc<dyn KvStore>) -> ShortenerService {
    ShortenerService::new(store, COLLECTION, 16)
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_commits_url_with_zero_clicks() {
    let store = Arc::new(MemoryStore::new());
    let service = service_over(store.clone());

    let token = service
        .create("https://example.com/a")
        .await
        .expect("create");
    assert_eq!(token.len(), TOKEN_LEN);

    let doc = store
        .get(COLLECTION, &token)
        .await
        .expect("get")
        .expect("document");
    assert_eq!(doc.get("url"), Some(&Value::from("https://example.com/a")));
    assert_eq!(doc.get("clicks"), Some(&Value::from(0)));
}

#[tokio::test]
async fn create_rejects_empty_url_without_touching_the_store() {
    let store = Arc::new(ScriptedStore::default());
    let service = service_over(store.clone());

    let err = service.create("").await.expect_err("must fail");
    assert!(matches!(err, SnaplinkError::Validation(_)), "got {err}");
    assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.set_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn create_retries_past_collisions() {
    let store = Arc::new(ScriptedStore {
        collide_first: 2,
        ..Default::default()
    });
    let service = service_over(store.clone());

    let token = service
        .create("https://example.com/a")
        .await
        .expect("create");
    assert_eq!(token.len(), TOKEN_LEN);

    // Two occupied probes, then the free one that got committed.
    assert_eq!(store.get_calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.set_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn create_does_not_retry_backend_errors() {
    let store = Arc::new(ScriptedStore {
        fail_gets: true,
        ..Default::default()
    });
    let service = service_over(store.clone());

    let err = service
        .create("https://example.com/a")
        .await
        .expect_err("must fail");
    assert!(matches!(err, SnaplinkError::Storage(_)), "got {err}");
    assert_eq!(store.get_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.set_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn create_surfaces_write_failures() {
    let store = Arc::new(ScriptedStore {
        fail_sets: true,
        ..Default::default()
    });
    let service = service_over(store.clone());

    let err = service
        .create("https://example.com/a")
        .await
        .expect_err("must fail");
    assert!(matches!(err, SnaplinkError::Storage(_)), "got {err}");
    assert_eq!(store.set_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn create_bounds_collision_probing() {
    let store = Arc::new(ScriptedStore {
        collide_first: usize::MAX,
        ..Default::default()
    });
    let service = ShortenerService::new(store.clone(), COLLECTION, 5);

    let err = service
        .create("https://example.com/a")
        .await
        .expect_err("must fail");
    assert!(matches!(err, SnaplinkError::RetriesExhausted(_)), "got {err}");
    assert_eq!(store.get_calls.load(Ordering::SeqCst), 5);
    assert_eq!(store.set_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Resolve
// =============================================================================

#[tokio::test]
async fn resolve_unknown_token_is_not_found_and_writes_nothing() {
    let store = Arc::new(ScriptedStore::default());
    let service = service_over(store.clone());

    let err = service.resolve("doesnotexist").await.expect_err("must fail");
    assert!(matches!(err, SnaplinkError::NotFound(_)), "got {err}");
    assert_eq!(store.set_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.increment_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resolve_empty_token_never_touches_the_store() {
    let store = Arc::new(ScriptedStore::default());
    let service = service_over(store.clone());

    let err = service.resolve("").await.expect_err("must fail");
    assert!(matches!(err, SnaplinkError::NotFound(_)), "got {err}");
    assert_eq!(store.get_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn round_trip_returns_the_original_url_and_counts_clicks() {
    let store = Arc::new(MemoryStore::new());
    let service = service_over(store.clone());

    let token = service
        .create("https://example.com/a")
        .await
        .expect("create");

    let first = service.resolve(&token).await.expect("resolve");
    assert_eq!(first.url, "https://example.com/a");
    assert!(first.click_recorded);

    let doc = store
        .get(COLLECTION, &token)
        .await
        .expect("get")
        .expect("document");
    assert_eq!(doc.get("clicks"), Some(&Value::from(1)));

    let second = service.resolve(&token).await.expect("resolve");
    assert_eq!(second.url, "https://example.com/a");

    let doc = store
        .get(COLLECTION, &token)
        .await
        .expect("get")
        .expect("document");
    assert_eq!(doc.get("clicks"), Some(&Value::from(2)));
}

#[tokio::test]
async fn resolve_missing_url_field_is_corrupt_data() {
    let store = Arc::new(MemoryStore::new());
    let mut doc = Document::new();
    doc.insert("clicks".to_string(), Value::from(0));
    store.set(COLLECTION, "abc1234", doc).await.expect("set");
    let service = service_over(store.clone());

    let err = service.resolve("abc1234").await.expect_err("must fail");
    assert!(matches!(err, SnaplinkError::CorruptData(_)), "got {err}");

    // The click counter must not move for a record we refused to serve.
    let doc = store
        .get(COLLECTION, "abc1234")
        .await
        .expect("get")
        .expect("document");
    assert_eq!(doc.get("clicks"), Some(&Value::from(0)));
}

#[tokio::test]
async fn resolve_non_string_url_is_corrupt_data() {
    let store = Arc::new(MemoryStore::new());
    let mut doc = Document::new();
    doc.insert("url".to_string(), Value::from(42));
    doc.insert("clicks".to_string(), Value::from(0));
    store.set(COLLECTION, "abc1234", doc).await.expect("set");
    let service = service_over(store);

    let err = service.resolve("abc1234").await.expect_err("must fail");
    assert!(matches!(err, SnaplinkError::CorruptData(_)), "got {err}");
}

#[tokio::test]
async fn resolve_survives_a_failed_click_increment() {
    let store = Arc::new(ScriptedStore {
        fail_increments: true,
        ..Default::default()
    });
    store
        .docs
        .write()
        .await
        .insert("abc1234".to_string(), link_doc("https://example.com/a", 0));
    let service = service_over(store.clone());

    let resolution = service.resolve("abc1234").await.expect("resolve");
    assert_eq!(resolution.url, "https://example.com/a");
    assert!(!resolution.click_recorded);
    assert_eq!(store.increment_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_sum_their_clicks_exactly() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(service_over(store.clone()));

    let token = service
        .create("https://example.com/a")
        .await
        .expect("create");

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = service.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let resolution = service.resolve(&token).await.expect("resolve");
            assert_eq!(resolution.url, "https://example.com/a");
        }));
    }
    for handle in handles {
        handle.await.expect("task");
    }

    let doc = store
        .get(COLLECTION, &token)
        .await
        .expect("get")
        .expect("document");
    assert_eq!(doc.get("clicks"), Some(&Value::from(20)));
}
