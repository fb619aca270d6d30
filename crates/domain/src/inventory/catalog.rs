use common::Sku;
use document_store::{DocumentStore, DocumentStoreExt};

use super::ledger::{InventoryLedger, find_mut};
use super::product::{NewProduct, Product};
use super::PRODUCTS_COLLECTION;
use crate::error::{DomainError, Result};
use crate::events::Notification;

/// Direct product management, outside of any order.
///
/// Shares the ledger's per-SKU guards, so a manual stock adjustment never
/// interleaves with a reservation or commit for the same SKU.
#[derive(Clone)]
pub struct ProductCatalog<S> {
    ledger: InventoryLedger<S>,
}

impl<S: DocumentStore> ProductCatalog<S> {
    pub fn new(ledger: InventoryLedger<S>) -> Self {
        Self { ledger }
    }

    /// Adds a product. Fails with `DuplicateProduct` if the SKU is taken.
    #[tracing::instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn add_product(&self, input: NewProduct) -> Result<Product> {
        input.validate()?;
        let _guard = self.ledger.locks.lock(&input.sku).await;

        let product = Product::from(input);
        self.ledger
            .store
            .modify(PRODUCTS_COLLECTION, |products: &mut Vec<Product>| {
                if products.iter().any(|p| p.sku == product.sku) {
                    return Err(DomainError::DuplicateProduct(product.sku.clone()));
                }
                products.push(product.clone());
                Ok(())
            })
            .await?;

        tracing::info!(quantity = product.quantity, "product added");
        self.ledger.dispatcher.publish(Notification::ProductAdded {
            product: product.clone(),
        });
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.ledger.products().await
    }

    pub async fn get_product(&self, sku: &Sku) -> Result<Product> {
        self.ledger.product(sku).await
    }

    /// Applies a signed stock change.
    ///
    /// Refused with `InsufficientStock` when the new quantity would drop below
    /// zero or below what in-flight orders currently hold.
    #[tracing::instrument(skip(self), fields(sku = %sku))]
    pub async fn adjust_quantity(&self, sku: &Sku, change: i64) -> Result<Product> {
        let _guard = self.ledger.locks.lock(sku).await;
        let locked = self.ledger.locked_quantity(sku).await?;

        let product = self
            .ledger
            .store
            .modify(PRODUCTS_COLLECTION, |products: &mut Vec<Product>| {
                let product = find_mut(products, sku)?;
                let target = i64::from(product.quantity)
                    .checked_add(change)
                    .ok_or_else(|| {
                        DomainError::Validation(format!("Quantity overflow for product {sku}"))
                    })?;
                if target < i64::from(locked) {
                    let available = product.quantity.saturating_sub(locked);
                    return Err(DomainError::InsufficientStock {
                        sku: sku.clone(),
                        requested: u32::try_from(change.unsigned_abs()).unwrap_or(u32::MAX),
                        available,
                    });
                }
                product.quantity = u32::try_from(target).map_err(|_| {
                    DomainError::Validation(format!("Quantity overflow for product {sku}"))
                })?;
                Ok(product.clone())
            })
            .await?;

        tracing::info!(change, quantity = product.quantity, "product quantity adjusted");
        self.ledger.dispatcher.publish(Notification::ProductUpdated {
            product: product.clone(),
        });
        Ok(product)
    }

    /// Returns the ledger backing this catalog.
    pub fn ledger(&self) -> &InventoryLedger<S> {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dispatcher, Money};
    use document_store::InMemoryDocumentStore;

    fn catalog() -> ProductCatalog<InMemoryDocumentStore> {
        let ledger = InventoryLedger::new(InMemoryDocumentStore::new(), Dispatcher::start());
        ProductCatalog::new(ledger)
    }

    fn new_product(sku: &str, quantity: u32) -> NewProduct {
        NewProduct {
            sku: Sku::new(sku),
            name: "Widget".to_string(),
            description: String::new(),
            price: Money::from_cents(250),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_add_and_get_product() {
        let catalog = catalog();
        catalog.add_product(new_product("A", 3)).await.unwrap();

        let product = catalog.get_product(&Sku::new("A")).await.unwrap();
        assert_eq!(product.quantity, 3);
        assert_eq!(catalog.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let catalog = catalog();
        catalog.add_product(new_product("A", 3)).await.unwrap();

        let err = catalog.add_product(new_product("A", 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Product with SKU A already exists.");
    }

    #[tokio::test]
    async fn test_adjust_quantity_both_directions() {
        let catalog = catalog();
        let sku = Sku::new("A");
        catalog.add_product(new_product("A", 3)).await.unwrap();

        assert_eq!(catalog.adjust_quantity(&sku, 4).await.unwrap().quantity, 7);
        assert_eq!(catalog.adjust_quantity(&sku, -7).await.unwrap().quantity, 0);
        assert!(matches!(
            catalog.adjust_quantity(&sku, -1).await,
            Err(DomainError::InsufficientStock { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_quantity_respects_locks() {
        let catalog = catalog();
        let sku = Sku::new("A");
        catalog.add_product(new_product("A", 5)).await.unwrap();
        catalog.ledger().reserve(&sku, 4).await.unwrap();

        assert!(catalog.adjust_quantity(&sku, -2).await.is_err());
        assert_eq!(catalog.adjust_quantity(&sku, -1).await.unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn test_adjust_quantity_rejects_overflow() {
        let catalog = catalog();
        let sku = Sku::new("A");
        catalog.add_product(new_product("A", 3)).await.unwrap();

        for change in [i64::MAX, i64::from(u32::MAX)] {
            let result = catalog.adjust_quantity(&sku, change).await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
        assert!(matches!(
            catalog.adjust_quantity(&sku, i64::MIN).await,
            Err(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(catalog.get_product(&sku).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_adjust_unknown_product() {
        let catalog = catalog();
        let result = catalog.adjust_quantity(&Sku::new("ghost"), 1).await;
        assert!(matches!(result, Err(DomainError::ProductNotFound(_))));
    }
}
