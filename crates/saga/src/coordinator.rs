//! Saga coordinator for order fulfillment.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use common::OrderId;
use document_store::DocumentStore;
use domain::{
    Dispatcher, EventHandler, HandlerError, InventoryLedger, Notification, Order, OrderItem,
};
use futures_util::future::join_all;
use tokio::sync::RwLock;

use crate::error::{Result, SagaError};
use crate::instance::SagaInstance;
use crate::order_fulfillment;
use crate::state::SagaState;

/// Drives reservation, commit and compensation for placed orders.
///
/// Each order gets one [`SagaInstance`], kept in an in-memory registry so its
/// progress can be inspected with [`FulfillmentSaga::get_saga`]. The registry
/// does not survive a restart.
pub struct FulfillmentSaga<S> {
    ledger: InventoryLedger<S>,
    dispatcher: Dispatcher,
    instances: RwLock<HashMap<OrderId, SagaInstance>>,
}

impl<S: DocumentStore> FulfillmentSaga<S> {
    /// Creates a new saga coordinator.
    pub fn new(ledger: InventoryLedger<S>, dispatcher: Dispatcher) -> Self {
        Self {
            ledger,
            dispatcher,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Runs the saga for a freshly placed order to completion.
    ///
    /// Publishes `order:processed` or `order:processing_failed` at the end and
    /// returns the final instance. Stock shortfalls and commit failures end in
    /// FAILED; they are not returned as errors.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, saga_type = order_fulfillment::SAGA_TYPE))]
    pub async fn run(&self, order: Order) -> Result<SagaInstance> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();

        let mut saga = self.begin(order.id).await?;
        saga.transition(SagaState::Reserving)?;

        // Every item is attempted so the failure reason lists all shortfalls.
        let mut unavailable = Vec::new();
        for item in &order.items {
            match self.ledger.reserve(&item.sku, item.quantity).await {
                Ok(()) => saga.record_reserved(item.clone()),
                Err(e) => {
                    tracing::info!(sku = %item.sku, error = %e, "item could not be reserved");
                    unavailable.push(e.to_string());
                }
            }
        }
        self.save(&saga).await;

        let still_locked = if unavailable.is_empty() {
            saga.transition(SagaState::AllReserved)?;
            self.commit_all(&mut saga).await?
        } else {
            saga.transition(SagaState::ReserveFailed)?;
            saga.fail_with(format!(
                "{}: {}",
                order_fulfillment::RESERVE_FAILED_REASON,
                unavailable.join("; ")
            ));
            saga.transition(SagaState::Compensating)?;
            saga.reserved().to_vec()
        };

        // Committed items already gave up their locks; the rest are released
        // as compensation.
        self.release_all(&still_locked).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);

        if saga.state() == SagaState::Committing {
            saga.transition(SagaState::Processed)?;
            self.save(&saga).await;

            metrics::counter!("saga_processed").increment(1);
            tracing::info!(duration, "saga processed");
            self.dispatcher
                .publish(Notification::OrderProcessed { order });
        } else {
            saga.transition(SagaState::Failed)?;
            self.save(&saga).await;

            let reason = saga.failure_reason().unwrap_or("unknown").to_string();
            metrics::counter!("saga_failed").increment(1);
            tracing::warn!(duration, %reason, "saga failed");
            self.dispatcher
                .publish(Notification::OrderProcessingFailed { order, reason });
        }

        Ok(saga)
    }

    /// Returns the saga instance for `order_id`, if one has started.
    pub async fn get_saga(&self, order_id: OrderId) -> Option<SagaInstance> {
        self.instances.read().await.get(&order_id).cloned()
    }

    /// Returns the number of sagas that have not reached a terminal state.
    pub async fn active_count(&self) -> usize {
        self.instances
            .read()
            .await
            .values()
            .filter(|s| !s.is_finished())
            .count()
    }

    async fn begin(&self, order_id: OrderId) -> Result<SagaInstance> {
        let mut instances = self.instances.write().await;
        if instances.contains_key(&order_id) {
            return Err(SagaError::AlreadyStarted(order_id));
        }
        let saga = SagaInstance::new(order_id);
        instances.insert(order_id, saga.clone());
        Ok(saga)
    }

    async fn save(&self, saga: &SagaInstance) {
        self.instances
            .write()
            .await
            .insert(saga.order_id(), saga.clone());
    }

    /// Commits every reserved item in order, lowering each item's lock as its
    /// stock is taken. On the first failure, rolls back what was already
    /// committed and leaves the saga COMPENSATING.
    ///
    /// Returns the items whose locks are still held.
    async fn commit_all(&self, saga: &mut SagaInstance) -> Result<Vec<OrderItem>> {
        saga.transition(SagaState::Committing)?;

        let mut still_locked = Vec::new();
        let mut pending = saga.reserved().to_vec().into_iter();
        while let Some(item) = pending.next() {
            match self.ledger.commit_reserved(&item.sku, item.quantity).await {
                Ok(commit) => {
                    if !commit.lock_released {
                        still_locked.push(item.clone());
                    }
                    saga.record_committed(item);
                }
                Err(e) => {
                    tracing::error!(sku = %item.sku, error = %e, "commit failed, rolling back");
                    saga.fail_with(format!(
                        "{} for {}: {e}",
                        order_fulfillment::COMMIT_FAILED_REASON,
                        item.sku
                    ));
                    saga.transition(SagaState::Compensating)?;
                    self.rollback_commits(saga).await;
                    still_locked.push(item);
                    still_locked.extend(pending.by_ref());
                    break;
                }
            }
        }

        self.save(saga).await;
        Ok(still_locked)
    }

    /// Restocks committed items in reverse order.
    async fn rollback_commits(&self, saga: &mut SagaInstance) {
        let committed: Vec<OrderItem> = saga.committed().iter().rev().cloned().collect();
        for item in committed {
            if let Err(e) = self.ledger.restock(&item.sku, item.quantity).await {
                tracing::error!(sku = %item.sku, quantity = item.quantity, error = %e, "rollback restock failed");
                saga.record_unreverted(item);
            }
        }
    }

    async fn release_all(&self, items: &[OrderItem]) {
        let releases = items
            .iter()
            .map(|item| async move { (item, self.ledger.release(&item.sku, item.quantity).await) });

        for (item, result) in join_all(releases).await {
            if let Err(e) = result {
                tracing::error!(sku = %item.sku, quantity = item.quantity, error = %e, "failed to release lock");
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore + 'static> EventHandler for FulfillmentSaga<S> {
    fn name(&self) -> &'static str {
        order_fulfillment::SAGA_HANDLER
    }

    async fn handle(&self, event: Notification) -> std::result::Result<(), HandlerError> {
        match event {
            Notification::OrderPlaced { order } => {
                self.run(order).await?;
                Ok(())
            }
            other => {
                tracing::debug!(event = %other.name(), "ignored by saga");
                Ok(())
            }
        }
    }
}
