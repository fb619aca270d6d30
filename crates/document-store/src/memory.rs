use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    DocumentStore, KeyedGuard, KeyedLocks, ReplaceOptions, Result, StoreError, Version, Versioned,
};

/// Planned write failures for a single collection.
#[derive(Debug, Clone, Copy, Default)]
struct WriteFault {
    /// Writes still allowed to succeed before failures start.
    skip: usize,
    /// Writes that will fail once `skip` is exhausted.
    fail: usize,
}

#[derive(Debug, Default)]
struct InMemoryState {
    collections: HashMap<String, Versioned<serde_json::Value>>,
    faults: HashMap<String, WriteFault>,
}

/// In-memory document store.
///
/// Behaves like the file-backed store, minus the files. Writes can be made to
/// fail on purpose with [`InMemoryDocumentStore::fail_writes`], which is how
/// tests exercise persistence failures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<InMemoryState>>,
    writers: KeyedLocks<String>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes to `collection` fail: after `skip` more successful writes,
    /// the next `count` writes are rejected.
    pub async fn fail_writes(&self, collection: &str, skip: usize, count: usize) {
        self.state
            .write()
            .await
            .faults
            .insert(collection.to_string(), WriteFault { skip, fail: count });
    }

    /// Removes all planned write failures.
    pub async fn clear_faults(&self) {
        self.state.write().await.faults.clear();
    }

    /// Returns the current version of a collection.
    pub async fn version_of(&self, collection: &str) -> Version {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map(|c| c.version)
            .unwrap_or_default()
    }

    /// Returns the number of collections that have been written.
    pub async fn collection_count(&self) -> usize {
        self.state.read().await.collections.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_all(&self, collection: &str) -> Result<Versioned<serde_json::Value>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_else(|| Versioned::new(Version::initial(), serde_json::Value::Null)))
    }

    async fn replace_all(
        &self,
        collection: &str,
        documents: serde_json::Value,
        options: ReplaceOptions,
    ) -> Result<Version> {
        let mut state = self.state.write().await;

        let current_version = state
            .collections
            .get(collection)
            .map(|c| c.version)
            .unwrap_or_default();

        // Check expected version if specified
        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                collection: collection.to_string(),
                expected,
                actual: current_version,
            });
        }

        if let Some(fault) = state.faults.get_mut(collection) {
            if fault.skip > 0 {
                fault.skip -= 1;
            } else if fault.fail > 0 {
                fault.fail -= 1;
                return Err(StoreError::WriteRejected {
                    collection: collection.to_string(),
                    reason: "injected write failure".to_string(),
                });
            }
        }

        let new_version = current_version.next();
        state.collections.insert(
            collection.to_string(),
            Versioned::new(new_version, documents),
        );

        Ok(new_version)
    }

    async fn lock_collection(&self, collection: &str) -> KeyedGuard<String> {
        self.writers.lock(&collection.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentStoreExt, MAX_CONFLICT_RETRIES};
    use serde_json::json;

    #[tokio::test]
    async fn unwritten_collection_reads_null() {
        let store = InMemoryDocumentStore::new();

        let result = store.get_all("orders").await.unwrap();
        assert!(result.value.is_null());
        assert_eq!(result.version, Version::initial());
    }

    #[tokio::test]
    async fn replace_then_read() {
        let store = InMemoryDocumentStore::new();

        let version = store
            .replace_all("orders", json!([{"id": 1}]), ReplaceOptions::new())
            .await
            .unwrap();
        assert_eq!(version, Version::new(1));

        let result = store.get_all("orders").await.unwrap();
        assert_eq!(result.value, json!([{"id": 1}]));
        assert_eq!(result.version, Version::new(1));
    }

    #[tokio::test]
    async fn concurrency_conflict_on_wrong_version() {
        let store = InMemoryDocumentStore::new();

        store
            .replace_all("locks", json!({}), ReplaceOptions::expect_version(Version::initial()))
            .await
            .unwrap();

        // Second writer still believes the collection is unwritten
        let result = store
            .replace_all(
                "locks",
                json!({"a": 1}),
                ReplaceOptions::expect_version(Version::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(store.get_all("locks").await.unwrap().value, json!({}));
    }

    #[tokio::test]
    async fn collections_are_versioned_independently() {
        let store = InMemoryDocumentStore::new();

        store
            .replace_all("a", json!(1), ReplaceOptions::new())
            .await
            .unwrap();
        store
            .replace_all("a", json!(2), ReplaceOptions::new())
            .await
            .unwrap();
        store
            .replace_all("b", json!(3), ReplaceOptions::new())
            .await
            .unwrap();

        assert_eq!(store.version_of("a").await, Version::new(2));
        assert_eq!(store.version_of("b").await, Version::new(1));
        assert_eq!(store.collection_count().await, 2);
    }

    #[tokio::test]
    async fn injected_faults_skip_then_fail() {
        let store = InMemoryDocumentStore::new();
        store.fail_writes("products", 1, 1).await;

        assert!(
            store
                .replace_all("products", json!([]), ReplaceOptions::new())
                .await
                .is_ok()
        );
        assert!(matches!(
            store
                .replace_all("products", json!([1]), ReplaceOptions::new())
                .await,
            Err(StoreError::WriteRejected { .. })
        ));
        assert!(
            store
                .replace_all("products", json!([2]), ReplaceOptions::new())
                .await
                .is_ok()
        );
        assert_eq!(store.get_all("products").await.unwrap().value, json!([2]));
    }

    #[tokio::test]
    async fn modify_applies_and_persists() {
        let store = InMemoryDocumentStore::new();

        let len = store
            .modify("numbers", |numbers: &mut Vec<u32>| {
                numbers.push(7);
                Ok::<_, StoreError>(numbers.len())
            })
            .await
            .unwrap();
        assert_eq!(len, 1);

        let loaded = store.load::<Vec<u32>>("numbers").await.unwrap();
        assert_eq!(loaded.value, vec![7]);
        assert_eq!(loaded.version, Version::new(1));
    }

    #[tokio::test]
    async fn modify_error_writes_nothing() {
        let store = InMemoryDocumentStore::new();

        let result: std::result::Result<(), StoreError> = store
            .modify("numbers", |numbers: &mut Vec<u32>| {
                numbers.push(1);
                Err(StoreError::WriteRejected {
                    collection: "numbers".into(),
                    reason: "nope".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.version_of("numbers").await, Version::initial());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn heavily_contended_modify_never_gives_up() {
        let store = InMemoryDocumentStore::new();
        let writers = (MAX_CONFLICT_RETRIES * 10) as u32;

        let tasks: Vec<_> = (0..writers)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .modify("numbers", |numbers: &mut Vec<u32>| {
                            numbers.push(i);
                            Ok::<_, StoreError>(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let loaded = store.load::<Vec<u32>>("numbers").await.unwrap();
        assert_eq!(loaded.value.len(), writers as usize);
        assert!(store.writers.is_empty());
    }
}
