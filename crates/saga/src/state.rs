//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a fulfillment saga.
///
/// State transitions:
/// ```text
/// PLACED ──► RESERVING ──┬──► ALL_RESERVED ──► COMMITTING ──┬──► PROCESSED
///                        │                                  │
///                        └──► RESERVE_FAILED ──► COMPENSATING ◄┘
///                                                  │
///                                                  └──► FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    /// The order-placed notification was received.
    #[default]
    Placed,

    /// Reservations are being attempted item by item.
    Reserving,

    /// Every item was reserved.
    AllReserved,

    /// At least one item could not be reserved.
    ReserveFailed,

    /// Acquired reservations (and any commits) are being undone.
    Compensating,

    /// Reserved stock is being removed from inventory.
    Committing,

    /// Every item was committed (terminal state).
    Processed,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if the saga may move from this state to `next`.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        use SagaState::*;
        matches!(
            (self, next),
            (Placed, Reserving)
                | (Reserving, AllReserved)
                | (Reserving, ReserveFailed)
                | (AllReserved, Committing)
                | (ReserveFailed, Compensating)
                | (Committing, Processed)
                | (Committing, Compensating)
                | (Compensating, Failed)
        )
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Processed | SagaState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Placed => "PLACED",
            SagaState::Reserving => "RESERVING",
            SagaState::AllReserved => "ALL_RESERVED",
            SagaState::ReserveFailed => "RESERVE_FAILED",
            SagaState::Compensating => "COMPENSATING",
            SagaState::Committing => "COMMITTING",
            SagaState::Processed => "PROCESSED",
            SagaState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
