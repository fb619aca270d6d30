//! Saga error types.

use common::OrderId;
use domain::DomainError;
use thiserror::Error;

use crate::state::SagaState;

/// Errors that can occur during saga operations.
///
/// Reservation and commit failures are not errors here: the saga absorbs them
/// into a FAILED outcome.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The state machine was asked to make an illegal move.
    #[error("Invalid saga transition from {from} to {to}")]
    InvalidTransition { from: SagaState, to: SagaState },

    /// A saga for this order has already run or is running.
    #[error("Saga for order {0} has already been started")]
    AlreadyStarted(OrderId),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
