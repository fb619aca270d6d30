//! Persistence collaborator for the order fulfillment system.
//!
//! A [`DocumentStore`] holds named collections and only supports whole-collection
//! reads and whole-collection replacement. Every collection carries a
//! [`Version`] token so writers can replace it with an optimistic
//! compare-and-swap; [`DocumentStoreExt::modify`] wraps that into a
//! read-modify-write cycle serialized per collection.

pub mod error;
pub mod file;
pub mod keyed_lock;
pub mod memory;
pub mod store;
pub mod version;

pub use error::{Result, StoreError};
pub use file::JsonFileStore;
pub use keyed_lock::{KeyedGuard, KeyedLocks};
pub use memory::InMemoryDocumentStore;
pub use store::{DocumentStore, DocumentStoreExt, MAX_CONFLICT_RETRIES, ReplaceOptions};
pub use version::{Version, Versioned};
