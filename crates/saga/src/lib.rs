//! Order fulfillment saga.
//!
//! When an order is placed, [`FulfillmentSaga`] reserves stock for every item,
//! commits it, and releases the reservations. If any item cannot be reserved,
//! or a commit fails, the acquired reservations are released (and any commits
//! restocked) so the order has no net effect on stock. [`StatusFinalizer`] then
//! persists the final order status and announces `order:completed`.
//!
//! [`FulfillmentSystem`] wires all of this over a single document store.

pub mod coordinator;
pub mod error;
pub mod finalizer;
pub mod instance;
pub mod listeners;
pub mod order_fulfillment;
pub mod state;
pub mod system;

pub use coordinator::FulfillmentSaga;
pub use error::{Result, SagaError};
pub use finalizer::StatusFinalizer;
pub use instance::{SagaInstance, SagaTransition};
pub use listeners::register_listeners;
pub use state::SagaState;
pub use system::FulfillmentSystem;
