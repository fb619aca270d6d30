use common::Sku;
use document_store::{DocumentStore, DocumentStoreExt};

use super::product::{LockTable, Product, lock_key};
use super::sku_locks::SkuLocks;
use super::{LOCKS_COLLECTION, PRODUCTS_COLLECTION};
use crate::dispatcher::Dispatcher;
use crate::error::{DomainError, Result};
use crate::events::Notification;

/// Product stock plus a reservation counter per SKU.
///
/// `available = quantity - lockedQuantity`, floored at zero. Reserve, release,
/// commit and restock each hold the SKU's guard from [`SkuLocks`] for their
/// whole read-modify-write, so operations on one SKU are serialized while
/// different SKUs proceed in parallel. Writes to the shared collections are
/// compare-and-swap, so a concurrent write for another SKU is retried rather
/// than lost.
#[derive(Clone)]
pub struct InventoryLedger<S> {
    pub(super) store: S,
    pub(super) dispatcher: Dispatcher,
    pub(super) locks: SkuLocks,
}

impl<S: DocumentStore> InventoryLedger<S> {
    pub fn new(store: S, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            dispatcher,
            locks: SkuLocks::new(),
        }
    }

    /// Locks `quantity` units of `sku` for an in-flight order.
    ///
    /// Fails with `InsufficientStock` when fewer than `quantity` units are
    /// available; the lock table is left untouched in that case.
    #[tracing::instrument(skip(self), fields(sku = %sku))]
    pub async fn reserve(&self, sku: &Sku, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "Reservation quantity must be greater than 0".to_string(),
            ));
        }

        let _guard = self.locks.lock(sku).await;
        metrics::counter!("inventory_reservations_total").increment(1);

        let result = self.try_reserve(sku, quantity).await;
        match &result {
            Ok(locked) => tracing::debug!(locked, "stock reserved"),
            Err(e) => {
                metrics::counter!("inventory_reservations_rejected").increment(1);
                tracing::info!(error = %e, "reservation rejected");
            }
        }
        result.map(|_| ())
    }

    async fn try_reserve(&self, sku: &Sku, quantity: u32) -> Result<u32> {
        let product = self.product(sku).await?;
        let key = lock_key(sku);

        self.store
            .modify(LOCKS_COLLECTION, |locks: &mut LockTable| {
                let entry = locks.entry(key.clone()).or_default();
                let available = product.quantity.saturating_sub(entry.locked_quantity);
                if available < quantity {
                    return Err(DomainError::InsufficientStock {
                        sku: sku.clone(),
                        requested: quantity,
                        available,
                    });
                }
                entry.locked_quantity += quantity;
                Ok(entry.locked_quantity)
            })
            .await
    }

    /// Unlocks up to `quantity` units of `sku`.
    ///
    /// Never drives the locked quantity below zero and never fails for an
    /// unknown or unlocked SKU.
    #[tracing::instrument(skip(self), fields(sku = %sku))]
    pub async fn release(&self, sku: &Sku, quantity: u32) -> Result<()> {
        let _guard = self.locks.lock(sku).await;
        let key = lock_key(sku);

        let locks = self.store.load::<LockTable>(LOCKS_COLLECTION).await?.value;
        if !locks.contains_key(&key) {
            tracing::debug!("nothing locked, release skipped");
            return Ok(());
        }

        let remaining = self.unlock(&key, quantity).await?;
        tracing::debug!(remaining, "stock released");
        Ok(())
    }

    /// Removes `quantity` units of `sku` from stock.
    ///
    /// The lock counter is not touched; callers release separately.
    #[tracing::instrument(skip(self), fields(sku = %sku))]
    pub async fn commit(&self, sku: &Sku, quantity: u32) -> Result<Product> {
        let _guard = self.locks.lock(sku).await;

        let product = self.take_stock(sku, quantity).await?;
        tracing::debug!(quantity = product.quantity, "stock committed");
        self.dispatcher.publish(Notification::ProductUpdated {
            product: product.clone(),
        });
        Ok(product)
    }

    /// Commits units that were reserved earlier and drops them from the lock
    /// entry while still holding the SKU's guard.
    ///
    /// Committed units never count against availability twice. If stock was
    /// taken but the lock entry could not be lowered, the commit still
    /// succeeds with `lock_released == false` and the caller must release the
    /// units itself.
    #[tracing::instrument(skip(self), fields(sku = %sku))]
    pub async fn commit_reserved(&self, sku: &Sku, quantity: u32) -> Result<ReservedCommit> {
        let _guard = self.locks.lock(sku).await;

        let product = self.take_stock(sku, quantity).await?;
        let lock_released = match self.unlock(&lock_key(sku), quantity).await {
            Ok(remaining) => {
                tracing::debug!(quantity = product.quantity, remaining, "reserved stock committed");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "stock committed but lock entry not lowered");
                false
            }
        };

        self.dispatcher.publish(Notification::ProductUpdated {
            product: product.clone(),
        });
        Ok(ReservedCommit {
            product,
            lock_released,
        })
    }

    /// Puts `quantity` units of `sku` back into stock. Inverse of [`commit`](Self::commit).
    #[tracing::instrument(skip(self), fields(sku = %sku))]
    pub async fn restock(&self, sku: &Sku, quantity: u32) -> Result<Product> {
        let _guard = self.locks.lock(sku).await;

        let product = self
            .store
            .modify(PRODUCTS_COLLECTION, |products: &mut Vec<Product>| {
                let product = find_mut(products, sku)?;
                product.quantity = product.quantity.checked_add(quantity).ok_or_else(|| {
                    DomainError::Validation(format!("Quantity overflow for product {sku}"))
                })?;
                Ok::<_, DomainError>(product.clone())
            })
            .await?;

        tracing::debug!(quantity = product.quantity, "stock restored");
        self.dispatcher.publish(Notification::ProductUpdated {
            product: product.clone(),
        });
        Ok(product)
    }

    /// Returns the product with `sku`.
    pub async fn product(&self, sku: &Sku) -> Result<Product> {
        self.products()
            .await?
            .into_iter()
            .find(|p| &p.sku == sku)
            .ok_or_else(|| DomainError::ProductNotFound(sku.clone()))
    }

    /// Returns every product in insertion order.
    pub async fn products(&self) -> Result<Vec<Product>> {
        Ok(self
            .store
            .load::<Vec<Product>>(PRODUCTS_COLLECTION)
            .await?
            .value)
    }

    /// Returns the quantity of `sku` currently locked. Zero when nothing is locked.
    pub async fn locked_quantity(&self, sku: &Sku) -> Result<u32> {
        let locks = self.store.load::<LockTable>(LOCKS_COLLECTION).await?.value;
        Ok(locks
            .get(&lock_key(sku))
            .map(|e| e.locked_quantity)
            .unwrap_or(0))
    }

    /// Returns the quantity of `sku` that can still be reserved.
    pub async fn available(&self, sku: &Sku) -> Result<u32> {
        let product = self.product(sku).await?;
        let locked = self.locked_quantity(sku).await?;
        Ok(product.quantity.saturating_sub(locked))
    }

    /// Returns the dispatcher used for product notifications.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<S: DocumentStore> InventoryLedger<S> {
    async fn take_stock(&self, sku: &Sku, quantity: u32) -> Result<Product> {
        self.store
            .modify(PRODUCTS_COLLECTION, |products: &mut Vec<Product>| {
                let product = find_mut(products, sku)?;
                if product.quantity < quantity {
                    return Err(DomainError::InsufficientStock {
                        sku: sku.clone(),
                        requested: quantity,
                        available: product.quantity,
                    });
                }
                product.quantity -= quantity;
                Ok(product.clone())
            })
            .await
    }

    /// Lowers a lock entry, never below zero. Returns what is still locked.
    async fn unlock(&self, key: &str, quantity: u32) -> Result<u32> {
        self.store
            .modify(LOCKS_COLLECTION, |locks: &mut LockTable| {
                let entry = locks.entry(key.to_string()).or_default();
                entry.locked_quantity = entry.locked_quantity.saturating_sub(quantity);
                Ok::<_, DomainError>(entry.locked_quantity)
            })
            .await
    }
}

/// Outcome of [`InventoryLedger::commit_reserved`].
#[derive(Debug, Clone)]
pub struct ReservedCommit {
    pub product: Product,
    /// False when the stock was taken but the lock entry still holds the units.
    pub lock_released: bool,
}

pub(super) fn find_mut<'a>(products: &'a mut [Product], sku: &Sku) -> Result<&'a mut Product> {
    products
        .iter_mut()
        .find(|p| &p.sku == sku)
        .ok_or_else(|| DomainError::ProductNotFound(sku.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;
    use document_store::{InMemoryDocumentStore, ReplaceOptions};

    async fn ledger_with(products: Vec<Product>) -> InventoryLedger<InMemoryDocumentStore> {
        let store = InMemoryDocumentStore::new();
        store
            .save(PRODUCTS_COLLECTION, &products, ReplaceOptions::new())
            .await
            .unwrap();
        InventoryLedger::new(store, Dispatcher::start())
    }

    fn widget(quantity: u32) -> Product {
        Product::new("W", "Widget", "", Money::from_cents(100), quantity)
    }

    #[tokio::test]
    async fn test_reserve_locks_quantity() {
        let ledger = ledger_with(vec![widget(5)]).await;
        let sku = Sku::new("W");

        ledger.reserve(&sku, 3).await.unwrap();

        assert_eq!(ledger.locked_quantity(&sku).await.unwrap(), 3);
        assert_eq!(ledger.available(&sku).await.unwrap(), 2);
        assert_eq!(ledger.product(&sku).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_reserve_rejects_zero() {
        let ledger = ledger_with(vec![widget(5)]).await;
        let result = ledger.reserve(&Sku::new("W"), 0).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reserve_unknown_sku() {
        let ledger = ledger_with(vec![widget(5)]).await;
        let result = ledger.reserve(&Sku::new("nope"), 1).await;
        assert!(matches!(result, Err(DomainError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_reserve_insufficient_leaves_state() {
        let ledger = ledger_with(vec![widget(5)]).await;
        let sku = Sku::new("W");
        ledger.reserve(&sku, 4).await.unwrap();

        let result = ledger.reserve(&sku, 2).await;
        match result {
            Err(DomainError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(ledger.locked_quantity(&sku).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let ledger = ledger_with(vec![widget(5)]).await;
        let sku = Sku::new("W");
        ledger.reserve(&sku, 2).await.unwrap();

        ledger.release(&sku, 2).await.unwrap();
        ledger.release(&sku, 2).await.unwrap();
        ledger.release(&sku, 10).await.unwrap();

        assert_eq!(ledger.locked_quantity(&sku).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_release_unknown_sku_is_noop() {
        let ledger = ledger_with(vec![]).await;
        ledger.release(&Sku::new("ghost"), 1).await.unwrap();
        assert_eq!(ledger.locked_quantity(&Sku::new("ghost")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_and_restock() {
        let ledger = ledger_with(vec![widget(5)]).await;
        let sku = Sku::new("W");

        assert_eq!(ledger.commit(&sku, 3).await.unwrap().quantity, 2);
        assert!(matches!(
            ledger.commit(&sku, 3).await,
            Err(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(ledger.restock(&sku, 3).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_commit_reserved_frees_stock_for_next_order() {
        let ledger = ledger_with(vec![widget(10)]).await;
        let sku = Sku::new("W");
        ledger.reserve(&sku, 4).await.unwrap();

        let commit = ledger.commit_reserved(&sku, 4).await.unwrap();
        assert!(commit.lock_released);
        assert_eq!(commit.product.quantity, 6);
        assert_eq!(ledger.locked_quantity(&sku).await.unwrap(), 0);

        ledger.reserve(&sku, 4).await.unwrap();
        assert_eq!(ledger.available(&sku).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_commit_reserved_keeps_lock_when_lock_write_fails() {
        let ledger = ledger_with(vec![widget(10)]).await;
        let sku = Sku::new("W");
        ledger.reserve(&sku, 4).await.unwrap();
        ledger.store.fail_writes(LOCKS_COLLECTION, 0, 1).await;

        let commit = ledger.commit_reserved(&sku, 4).await.unwrap();

        assert!(!commit.lock_released);
        assert_eq!(commit.product.quantity, 6);
        assert_eq!(ledger.locked_quantity(&sku).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_commit_reserved_failure_changes_nothing() {
        let ledger = ledger_with(vec![widget(3)]).await;
        let sku = Sku::new("W");
        ledger.reserve(&sku, 3).await.unwrap();
        ledger.store.fail_writes(PRODUCTS_COLLECTION, 0, 1).await;

        assert!(ledger.commit_reserved(&sku, 3).await.is_err());
        assert_eq!(ledger.product(&sku).await.unwrap().quantity, 3);
        assert_eq!(ledger.locked_quantity(&sku).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_skus_leave_no_guards_behind() {
        let ledger = ledger_with(vec![widget(1)]).await;

        for i in 0..50 {
            let sku = Sku::new(format!("ghost-{i}"));
            assert!(ledger.reserve(&sku, 1).await.is_err());
            ledger.release(&sku, 1).await.unwrap();
        }

        assert!(ledger.locks.is_empty());
    }

    #[tokio::test]
    async fn test_available_is_floored_at_zero() {
        let ledger = ledger_with(vec![widget(4)]).await;
        let sku = Sku::new("W");
        ledger.reserve(&sku, 4).await.unwrap();
        ledger.commit(&sku, 4).await.unwrap();

        assert_eq!(ledger.available(&sku).await.unwrap(), 0);
        assert!(ledger.reserve(&sku, 1).await.is_err());
    }
}
