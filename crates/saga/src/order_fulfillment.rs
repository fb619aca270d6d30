//! Order fulfillment saga constants.

/// The saga type identifier for order fulfillment.
pub const SAGA_TYPE: &str = "OrderFulfillment";

/// Handler name of the saga coordinator.
pub const SAGA_HANDLER: &str = "order-fulfillment-saga";

/// Handler name of the status finalizer.
pub const FINALIZER_HANDLER: &str = "order-status-finalizer";

/// Prefix of the failure reason when reservations fail.
pub const RESERVE_FAILED_REASON: &str = "Unable to reserve stock";

/// Prefix of the failure reason when a commit fails.
pub const COMMIT_FAILED_REASON: &str = "Unable to commit stock";
