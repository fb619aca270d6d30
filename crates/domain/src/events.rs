//! Notifications exchanged through the [`Dispatcher`](crate::Dispatcher).

use serde::{Deserialize, Serialize};

use crate::inventory::Product;
use crate::order::Order;

/// Names of the notifications used throughout the system.
///
/// Names follow a `domain:action` pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// A new product was added to the inventory.
    #[serde(rename = "product:added")]
    ProductAdded,
    /// An existing product's stock or details changed.
    #[serde(rename = "product:updated")]
    ProductUpdated,
    /// A customer placed a new order.
    #[serde(rename = "order:placed")]
    OrderPlaced,
    /// Milestone: every item was reserved and committed.
    #[serde(rename = "order:processed")]
    OrderProcessed,
    /// Milestone: reservation or commit failed and the saga compensated.
    #[serde(rename = "order:processing_failed")]
    OrderProcessingFailed,
    /// Terminal: the order's final status has been persisted.
    #[serde(rename = "order:completed")]
    OrderCompleted,
}

impl EventName {
    /// Returns the wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ProductAdded => "product:added",
            EventName::ProductUpdated => "product:updated",
            EventName::OrderPlaced => "order:placed",
            EventName::OrderProcessed => "order:processed",
            EventName::OrderProcessingFailed => "order:processing_failed",
            EventName::OrderCompleted => "order:completed",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named event together with its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Notification {
    ProductAdded { product: Product },
    ProductUpdated { product: Product },
    OrderPlaced { order: Order },
    OrderProcessed { order: Order },
    OrderProcessingFailed { order: Order, reason: String },
    OrderCompleted { order: Order },
}

impl Notification {
    /// Returns the name handlers subscribe to.
    pub fn name(&self) -> EventName {
        match self {
            Notification::ProductAdded { .. } => EventName::ProductAdded,
            Notification::ProductUpdated { .. } => EventName::ProductUpdated,
            Notification::OrderPlaced { .. } => EventName::OrderPlaced,
            Notification::OrderProcessed { .. } => EventName::OrderProcessed,
            Notification::OrderProcessingFailed { .. } => EventName::OrderProcessingFailed,
            Notification::OrderCompleted { .. } => EventName::OrderCompleted,
        }
    }

    /// Returns the order carried by order notifications.
    pub fn order(&self) -> Option<&Order> {
        match self {
            Notification::OrderPlaced { order }
            | Notification::OrderProcessed { order }
            | Notification::OrderProcessingFailed { order, .. }
            | Notification::OrderCompleted { order } => Some(order),
            Notification::ProductAdded { .. } | Notification::ProductUpdated { .. } => None,
        }
    }

    /// Consumes the notification and returns its order, if it carries one.
    pub fn into_order(self) -> Option<Order> {
        match self {
            Notification::OrderPlaced { order }
            | Notification::OrderProcessed { order }
            | Notification::OrderProcessingFailed { order, .. }
            | Notification::OrderCompleted { order } => Some(order),
            Notification::ProductAdded { .. } | Notification::ProductUpdated { .. } => None,
        }
    }

    /// Returns the product carried by product notifications.
    pub fn product(&self) -> Option<&Product> {
        match self {
            Notification::ProductAdded { product } | Notification::ProductUpdated { product } => {
                Some(product)
            }
            _ => None,
        }
    }
}
