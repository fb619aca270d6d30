//! Saga instance record.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::OrderItem;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::state::SagaState;

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaTransition {
    pub from: SagaState,
    pub to: SagaState,
    pub at: DateTime<Utc>,
}

/// The in-memory record of one order's fulfillment saga.
///
/// Tracks the current state together with what has been done so far, which is
/// exactly what compensation needs to undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaInstance {
    order_id: OrderId,
    state: SagaState,
    /// Items whose reservation succeeded.
    reserved: Vec<OrderItem>,
    /// Items whose stock was committed.
    committed: Vec<OrderItem>,
    /// Committed items whose rollback failed.
    unreverted: Vec<OrderItem>,
    failure_reason: Option<String>,
    history: Vec<SagaTransition>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl SagaInstance {
    /// Creates a saga in the PLACED state.
    pub fn new(order_id: OrderId) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            state: SagaState::Placed,
            reserved: Vec::new(),
            committed: Vec::new(),
            unreverted: Vec::new(),
            failure_reason: None,
            history: Vec::new(),
            started_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Moves to `next`, or fails with `InvalidTransition`.
    pub fn transition(&mut self, next: SagaState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SagaError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let now = Utc::now();
        self.history.push(SagaTransition {
            from: self.state,
            to: next,
            at: now,
        });
        tracing::debug!(order_id = %self.order_id, from = %self.state, to = %next, "saga transition");

        self.state = next;
        self.updated_at = now;
        if next.is_terminal() {
            self.finished_at = Some(now);
        }
        Ok(())
    }

    pub fn record_reserved(&mut self, item: OrderItem) {
        self.reserved.push(item);
    }

    pub fn record_committed(&mut self, item: OrderItem) {
        self.committed.push(item);
    }

    pub fn record_unreverted(&mut self, item: OrderItem) {
        self.unreverted.push(item);
    }

    /// Sets the failure reason. The first reason wins.
    pub fn fail_with(&mut self, reason: impl Into<String>) {
        if self.failure_reason.is_none() {
            self.failure_reason = Some(reason.into());
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn reserved(&self) -> &[OrderItem] {
        &self.reserved
    }

    pub fn committed(&self) -> &[OrderItem] {
        &self.committed
    }

    pub fn unreverted(&self) -> &[OrderItem] {
        &self.unreverted
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn history(&self) -> &[SagaTransition] {
        &self.history
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_saga_is_placed() {
        let saga = SagaInstance::new(OrderId::new());
        assert_eq!(saga.state(), SagaState::Placed);
        assert!(saga.history().is_empty());
        assert!(saga.finished_at().is_none());
    }

    #[test]
    fn test_transitions_are_recorded() {
        let mut saga = SagaInstance::new(OrderId::new());
        saga.transition(SagaState::Reserving).unwrap();
        saga.transition(SagaState::AllReserved).unwrap();
        saga.transition(SagaState::Committing).unwrap();
        saga.transition(SagaState::Processed).unwrap();

        assert_eq!(saga.history().len(), 4);
        assert_eq!(saga.history()[0].from, SagaState::Placed);
        assert!(saga.is_finished());
        assert!(saga.finished_at().is_some());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut saga = SagaInstance::new(OrderId::new());

        let err = saga.transition(SagaState::Committing).unwrap_err();

        assert!(matches!(
            err,
            SagaError::InvalidTransition {
                from: SagaState::Placed,
                to: SagaState::Committing
            }
        ));
        assert_eq!(saga.state(), SagaState::Placed);
    }

    #[test]
    fn test_first_failure_reason_wins() {
        let mut saga = SagaInstance::new(OrderId::new());
        saga.fail_with("first");
        saga.fail_with("second");
        assert_eq!(saga.failure_reason(), Some("first"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut saga = SagaInstance::new(OrderId::new());
        saga.record_reserved(OrderItem::new("A", 1));

        let json = serde_json::to_value(&saga).unwrap();
        assert_eq!(json["state"], "PLACED");
        assert_eq!(json["reserved"][0]["sku"], "A");
        assert!(json.get("orderId").is_some());
        assert!(json["failureReason"].is_null());
    }
}
