use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{KeyedGuard, Result, StoreError, Version, Versioned};

/// Number of times [`DocumentStoreExt::modify`] re-reads a collection after a
/// version conflict before giving up. Only writers that bypass `modify` can
/// cause such a conflict.
pub const MAX_CONFLICT_RETRIES: usize = 32;

/// Options for replacing a collection.
#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    /// Expected version of the collection for optimistic concurrency control.
    /// If None, no version check is performed (last writer wins).
    pub expected_version: Option<Version>,
}

impl ReplaceOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the collection to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }
}

/// Core trait for document store backends.
///
/// A store addresses collections by logical name and only knows two
/// operations: read a whole collection and replace a whole collection. There
/// are no partial updates and no multi-collection transactions.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the full contents of a collection.
    ///
    /// A collection that has never been written reads as `Value::Null` at
    /// [`Version::initial`].
    async fn get_all(&self, collection: &str) -> Result<Versioned<serde_json::Value>>;

    /// Replaces the full contents of a collection.
    ///
    /// If `options.expected_version` is set, the operation fails with
    /// `ConcurrencyConflict` when the current version doesn't match.
    ///
    /// Returns the new version of the collection.
    async fn replace_all(
        &self,
        collection: &str,
        documents: serde_json::Value,
        options: ReplaceOptions,
    ) -> Result<Version>;

    /// Waits for exclusive write access to `collection`.
    ///
    /// [`DocumentStoreExt::modify`] holds this across its read-modify-write, so
    /// concurrent modifications of one collection queue up instead of
    /// conflicting. Reads are not blocked.
    async fn lock_collection(&self, collection: &str) -> KeyedGuard<String>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn get_all(&self, collection: &str) -> Result<Versioned<serde_json::Value>> {
        (**self).get_all(collection).await
    }

    async fn replace_all(
        &self,
        collection: &str,
        documents: serde_json::Value,
        options: ReplaceOptions,
    ) -> Result<Version> {
        (**self).replace_all(collection, documents, options).await
    }

    async fn lock_collection(&self, collection: &str) -> KeyedGuard<String> {
        (**self).lock_collection(collection).await
    }
}

/// Extension trait providing typed access on top of raw JSON collections.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Loads a collection and deserializes it.
    ///
    /// An unwritten (null) collection yields `T::default()`.
    async fn load<T>(&self, collection: &str) -> Result<Versioned<T>>
    where
        T: DeserializeOwned + Default + Send,
    {
        let raw = self.get_all(collection).await?;
        if raw.value.is_null() {
            return Ok(Versioned::new(raw.version, T::default()));
        }
        let version = raw.version;
        let value = serde_json::from_value(raw.value)?;
        Ok(Versioned::new(version, value))
    }

    /// Serializes and stores a collection.
    async fn save<T>(&self, collection: &str, value: &T, options: ReplaceOptions) -> Result<Version>
    where
        T: Serialize + Sync,
    {
        let documents = serde_json::to_value(value)?;
        self.replace_all(collection, documents, options).await
    }

    /// Runs a read-modify-write cycle over a collection.
    ///
    /// Runs under [`DocumentStore::lock_collection`]. `apply` receives the
    /// freshly loaded contents. If it returns `Ok`, the mutated contents are
    /// written back with a compare-and-swap against the version that was read;
    /// on conflict with an outside writer the whole cycle starts over with a
    /// new read, up to [`MAX_CONFLICT_RETRIES`] times. If `apply` returns
    /// `Err`, nothing is written and the error is returned as is.
    async fn modify<T, R, E, F>(&self, collection: &str, mut apply: F) -> std::result::Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync,
        R: Send,
        E: From<StoreError> + Send,
        F: FnMut(&mut T) -> std::result::Result<R, E> + Send,
    {
        let _writer = self.lock_collection(collection).await;

        let mut attempt = 0;
        loop {
            let Versioned { version, mut value } = self.load::<T>(collection).await?;
            let outcome = apply(&mut value)?;

            match self
                .save(collection, &value, ReplaceOptions::expect_version(version))
                .await
            {
                Ok(_) => return Ok(outcome),
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    metrics::counter!("document_store_conflict_retries_total").increment(1);
                    tracing::debug!(collection, attempt, "version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
