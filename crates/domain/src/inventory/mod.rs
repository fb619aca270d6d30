//! Product stock and the reservation ledger guarding it.

mod catalog;
mod ledger;
mod product;
mod sku_locks;

pub use catalog::ProductCatalog;
pub use ledger::{InventoryLedger, ReservedCommit};
pub use product::{LockEntry, LockTable, NewProduct, Product, lock_key};
pub use sku_locks::SkuLocks;

/// Collection holding the product list.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Collection holding the lock table.
pub const LOCKS_COLLECTION: &str = "locks";
