//! Domain layer for the order fulfillment system.
//!
//! This crate provides:
//! - [`Dispatcher`]: in-process publish/subscribe for [`Notification`]s
//! - [`InventoryLedger`]: per-SKU reservations and stock commits
//! - [`ProductCatalog`]: direct product CRUD outside the saga
//! - [`OrderStore`] / [`OrderService`]: order creation, placement and status updates

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod inventory;
pub mod order;
pub mod value_objects;

pub use dispatcher::{DispatchWorker, Dispatcher, EventHandler, HandlerError};
pub use error::{DomainError, Result};
pub use events::{EventName, Notification};
pub use inventory::{
    InventoryLedger, LockEntry, NewProduct, Product, ProductCatalog, ReservedCommit,
};
pub use order::{
    Order, OrderItem, OrderService, OrderStatus, OrderStore, PaymentMethod, PlaceOrder,
};
pub use value_objects::Money;
