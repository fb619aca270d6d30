//! Order status.

use serde::{Deserialize, Serialize};

/// The persisted status of an order.
///
/// ```text
/// PENDING ──► PROCESSED
///    │
///    └──────► FAILED
/// ```
///
/// `PROCESSING` and `CANCELLED` are valid values that no current flow assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, saga not finished yet.
    #[default]
    Pending,

    /// Saga in progress. Reserved for finer-grained tracking; nothing sets it.
    Processing,

    /// Stock was committed for every item (terminal state).
    Processed,

    /// Stock could not be reserved or committed (terminal state).
    Failed,

    /// Cancelled by the customer (terminal state). Nothing sets it yet.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Processed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
