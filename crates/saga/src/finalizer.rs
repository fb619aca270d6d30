//! Turns saga milestones into persisted order status.

use async_trait::async_trait;
use document_store::DocumentStore;
use domain::{Dispatcher, EventHandler, HandlerError, Notification, OrderStatus, OrderStore};

use crate::order_fulfillment;

/// Sole writer of an order's final status.
///
/// On `order:processed` or `order:processing_failed` it stores PROCESSED or
/// FAILED and then publishes `order:completed`. If the status cannot be
/// stored, the error goes back to the dispatcher and nothing is published.
pub struct StatusFinalizer<S> {
    orders: OrderStore<S>,
    dispatcher: Dispatcher,
}

impl<S: DocumentStore> StatusFinalizer<S> {
    pub fn new(orders: OrderStore<S>, dispatcher: Dispatcher) -> Self {
        Self { orders, dispatcher }
    }
}

#[async_trait]
impl<S: DocumentStore + 'static> EventHandler for StatusFinalizer<S> {
    fn name(&self) -> &'static str {
        order_fulfillment::FINALIZER_HANDLER
    }

    async fn handle(&self, event: Notification) -> Result<(), HandlerError> {
        let (order, status) = match event {
            Notification::OrderProcessed { order } => (order, OrderStatus::Processed),
            Notification::OrderProcessingFailed { order, .. } => (order, OrderStatus::Failed),
            _ => return Ok(()),
        };

        let order_id = order.id;
        let completed = self
            .orders
            .update_status(order_id, status)
            .await
            .inspect_err(|e| tracing::error!(%order_id, error = %e, "failed to store final status"))?
            .unwrap_or(order);

        tracing::info!(%order_id, status = %completed.status, "order completed");
        self.dispatcher
            .publish(Notification::OrderCompleted { order: completed });
        Ok(())
    }
}
