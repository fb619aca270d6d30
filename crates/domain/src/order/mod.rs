//! Orders: the placement command, the persisted model and its store.

mod commands;
mod model;
mod service;
mod state;
mod store;

pub use commands::PlaceOrder;
pub use model::{Order, OrderItem, PaymentMethod};
pub use service::OrderService;
pub use state::OrderStatus;
pub use store::{ORDERS_COLLECTION, OrderStore};
