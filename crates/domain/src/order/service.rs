//! Order service providing the placement entry points.

use std::time::Duration;

use document_store::DocumentStore;

use super::commands::PlaceOrder;
use super::model::Order;
use super::store::OrderStore;
use crate::dispatcher::Dispatcher;
use crate::error::{DomainError, Result};
use crate::events::{EventName, Notification};

/// Service for placing orders.
///
/// Placement persists the order as PENDING and announces it with
/// `order:placed`; fulfillment happens afterwards in whatever handlers are
/// subscribed to that notification.
#[derive(Clone)]
pub struct OrderService<S> {
    orders: OrderStore<S>,
    dispatcher: Dispatcher,
}

impl<S: DocumentStore> OrderService<S> {
    /// Creates a new order service.
    pub fn new(orders: OrderStore<S>, dispatcher: Dispatcher) -> Self {
        Self { orders, dispatcher }
    }

    /// Returns the underlying order store.
    pub fn orders(&self) -> &OrderStore<S> {
        &self.orders
    }

    /// Validates, persists and announces a new order.
    ///
    /// Returns as soon as the PENDING order is stored; it does not wait for
    /// fulfillment. A storage failure is reported as `PlacementFailed`.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, customer_id = %cmd.customer_id))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        cmd.validate()?;

        let order = self
            .orders
            .create(cmd.into_order())
            .await
            .map_err(|e| match e {
                DomainError::Storage(source) => DomainError::PlacementFailed(source),
                other => other,
            })
            .inspect_err(|e| tracing::error!(error = %e, "failed to place order"))?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(items = order.items.len(), "order placed");

        self.dispatcher.publish(Notification::OrderPlaced {
            order: order.clone(),
        });
        Ok(order)
    }

    /// Places an order and waits up to `timeout` for its `order:completed`.
    ///
    /// Returns the order with its final status. On timeout the order keeps
    /// processing in the background and `CompletionTimeout` is returned.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn place_and_wait(&self, cmd: PlaceOrder, timeout: Duration) -> Result<Order> {
        let order_id = cmd.order_id;
        let completion = self
            .dispatcher
            .subscribe_once_where(EventName::OrderCompleted, move |event| {
                event.order().is_some_and(|o| o.id == order_id)
            });

        self.place_order(cmd).await?;

        match tokio::time::timeout(timeout, completion).await {
            Ok(Ok(event)) => event
                .into_order()
                .ok_or(DomainError::OrderNotFound(order_id)),
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(?timeout, "order did not complete in time");
                Err(DomainError::CompletionTimeout(order_id))
            }
        }
    }
}
