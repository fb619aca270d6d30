use common::OrderId;
use document_store::{DocumentStore, DocumentStoreExt};

use super::model::Order;
use super::state::OrderStatus;
use crate::error::{DomainError, Result};

/// Collection holding every order.
pub const ORDERS_COLLECTION: &str = "orders";

/// Create and status-update operations over the order collection.
#[derive(Clone)]
pub struct OrderStore<S> {
    store: S,
}

impl<S: DocumentStore> OrderStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Appends a new order and persists the collection.
    pub async fn create(&self, order: Order) -> Result<Order> {
        self.store
            .modify(ORDERS_COLLECTION, |orders: &mut Vec<Order>| {
                if orders.iter().any(|o| o.id == order.id) {
                    return Err(DomainError::DuplicateOrder(order.id));
                }
                orders.push(order.clone());
                Ok(())
            })
            .await?;

        tracing::debug!(order_id = %order.id, "order stored");
        Ok(order)
    }

    /// Sets the status of one order and refreshes its `updatedAt`.
    ///
    /// Returns `Ok(None)` if no order has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let result = self
            .store
            .modify(ORDERS_COLLECTION, |orders: &mut Vec<Order>| {
                let order = orders
                    .iter_mut()
                    .find(|o| o.id == order_id)
                    .ok_or(DomainError::OrderNotFound(order_id))?;
                order.set_status(status);
                Ok::<_, DomainError>(order.clone())
            })
            .await;

        match result {
            Ok(order) => Ok(Some(order)),
            Err(DomainError::OrderNotFound(_)) => {
                tracing::warn!("order not found, status not updated");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, order_id: OrderId) -> Result<Order> {
        self.list()
            .await?
            .into_iter()
            .find(|o| o.id == order_id)
            .ok_or(DomainError::OrderNotFound(order_id))
    }

    /// Returns every order in placement order.
    pub async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.store.load::<Vec<Order>>(ORDERS_COLLECTION).await?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;
    use crate::order::{OrderItem, PaymentMethod, PlaceOrder};
    use document_store::InMemoryDocumentStore;

    fn order() -> Order {
        PlaceOrder::new(
            "cust123",
            vec![OrderItem::new("ITEM001", 1)],
            PaymentMethod::Visa,
            Money::from_cents(100),
        )
        .into_order()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let orders = OrderStore::new(InMemoryDocumentStore::new());
        let created = orders.create(order()).await.unwrap();

        let loaded = orders.get(created.id).await.unwrap();
        assert_eq!(loaded, created);
        assert_eq!(orders.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let orders = OrderStore::new(InMemoryDocumentStore::new());
        let created = orders.create(order()).await.unwrap();

        let result = orders.create(created).await;
        assert!(matches!(result, Err(DomainError::DuplicateOrder(_))));
    }

    #[tokio::test]
    async fn test_update_status() {
        let orders = OrderStore::new(InMemoryDocumentStore::new());
        let created = orders.create(order()).await.unwrap();

        let updated = orders
            .update_status(created.id, OrderStatus::Failed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Failed);
        assert_eq!(
            orders.get(created.id).await.unwrap().status,
            OrderStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_update_status_unknown_order_is_none() {
        let orders = OrderStore::new(InMemoryDocumentStore::new());
        let result = orders
            .update_status(OrderId::new(), OrderStatus::Processed)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_order() {
        let orders = OrderStore::new(InMemoryDocumentStore::new());
        assert!(orders.get(OrderId::new()).await.unwrap_err().is_not_found());
    }
}
