//! Domain error types.

use common::{OrderId, Sku};
use document_store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No product exists with the given SKU.
    #[error("Product not found: {0}")]
    ProductNotFound(Sku),

    /// No order exists with the given ID.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requested quantity exceeds what is available.
    #[error("Insufficient stock for product {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// Input was rejected before reaching the core.
    #[error("{0}")]
    Validation(String),

    /// A product with this SKU already exists.
    #[error("Product with SKU {0} already exists.")]
    DuplicateProduct(Sku),

    /// An order with this ID already exists.
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderId),

    /// The order could not be persisted at placement time.
    #[error("We failed to place your order. Please try again.")]
    PlacementFailed(#[source] StoreError),

    /// The caller stopped waiting for the order to complete.
    #[error("Timed out waiting for order {0} to complete")]
    CompletionTimeout(OrderId),

    /// An error occurred in the document store.
    #[error("Persistence error: {0}")]
    Storage(#[from] StoreError),
}

impl DomainError {
    /// Returns true for NotFound-kind errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::ProductNotFound(_) | DomainError::OrderNotFound(_)
        )
    }

    /// Returns true for persistence failures.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            DomainError::Storage(_) | DomainError::PlacementFailed(_)
        )
    }
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
