//! Integration tests for order placement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use document_store::InMemoryDocumentStore;
use domain::order::ORDERS_COLLECTION;
use domain::{
    Dispatcher, DomainError, EventHandler, EventName, HandlerError, Money, Notification,
    OrderItem, OrderService, OrderStatus, OrderStore, PaymentMethod, PlaceOrder,
};

/// Marks every placed order as processed and announces completion.
struct AutoComplete {
    orders: OrderStore<InMemoryDocumentStore>,
    dispatcher: Dispatcher,
}

#[async_trait]
impl EventHandler for AutoComplete {
    fn name(&self) -> &'static str {
        "auto-complete"
    }

    async fn handle(&self, event: Notification) -> Result<(), HandlerError> {
        if let Notification::OrderPlaced { order } = event {
            let updated = self
                .orders
                .update_status(order.id, OrderStatus::Processed)
                .await?
                .unwrap_or(order);
            self.dispatcher
                .publish(Notification::OrderCompleted { order: updated });
        }
        Ok(())
    }
}

struct Harness {
    store: InMemoryDocumentStore,
    dispatcher: Dispatcher,
    service: OrderService<InMemoryDocumentStore>,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryDocumentStore::new();
        let dispatcher = Dispatcher::start();
        let service = OrderService::new(OrderStore::new(store.clone()), dispatcher.clone());
        Self {
            store,
            dispatcher,
            service,
        }
    }

    fn with_auto_complete(self) -> Self {
        self.dispatcher.subscribe(
            EventName::OrderPlaced,
            Arc::new(AutoComplete {
                orders: self.service.orders().clone(),
                dispatcher: self.dispatcher.clone(),
            }),
        );
        self
    }
}

fn command() -> PlaceOrder {
    PlaceOrder::new(
        "cust123",
        vec![OrderItem::new("ITEM001", 2)],
        PaymentMethod::Visa,
        Money::from_cents(4000),
    )
}

mod place_order {
    use super::*;

    #[tokio::test]
    async fn stores_pending_order_and_publishes() {
        let harness = Harness::new();
        let placed = harness.dispatcher.subscribe_once(EventName::OrderPlaced);

        let order = harness.service.place_order(command()).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        let stored = harness.service.orders().get(order.id).await.unwrap();
        assert_eq!(stored, order);

        let event = placed.await.unwrap();
        assert_eq!(event.order().map(|o| o.id), Some(order.id));
    }

    #[tokio::test]
    async fn invalid_command_is_not_stored() {
        let harness = Harness::new();
        let mut cmd = command();
        cmd.items.clear();

        let result = harness.service.place_order(cmd).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(harness.service.orders().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_reported_generically() {
        let harness = Harness::new();
        harness.store.fail_writes(ORDERS_COLLECTION, 0, 1).await;
        let mut placed = harness.dispatcher.subscribe_once(EventName::OrderPlaced);

        let err = harness.service.place_order(command()).await.unwrap_err();

        assert!(matches!(err, DomainError::PlacementFailed(_)));
        assert_eq!(
            err.to_string(),
            "We failed to place your order. Please try again."
        );
        assert!(placed.try_recv().is_err());
        assert!(harness.service.orders().list().await.unwrap().is_empty());
    }
}

mod place_and_wait {
    use super::*;

    #[tokio::test]
    async fn returns_completed_order() {
        let harness = Harness::new().with_auto_complete();

        let order = harness
            .service
            .place_and_wait(command(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Processed);
    }

    #[tokio::test]
    async fn ignores_completion_of_other_orders() {
        let harness = Harness::new();
        let other = command().into_order();
        let dispatcher = harness.dispatcher.clone();

        let waiting = harness
            .service
            .place_and_wait(command(), Duration::from_millis(200));
        let noise = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            dispatcher.publish(Notification::OrderCompleted { order: other });
        };
        let (result, ()) = tokio::join!(waiting, noise);

        assert!(matches!(result, Err(DomainError::CompletionTimeout(_))));
    }

    #[tokio::test]
    async fn times_out_without_completion() {
        let harness = Harness::new();

        let result = harness
            .service
            .place_and_wait(command(), Duration::from_millis(50))
            .await;

        match result {
            Err(DomainError::CompletionTimeout(id)) => {
                let stored = harness.service.orders().get(id).await.unwrap();
                assert_eq!(stored.status, OrderStatus::Pending);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
