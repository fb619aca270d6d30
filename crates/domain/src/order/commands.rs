//! Order commands.

use chrono::Utc;
use common::{CustomerId, OrderId};

use super::model::{Order, OrderItem, PaymentMethod};
use super::state::OrderStatus;
use crate::error::{DomainError, Result};
use crate::value_objects::Money;

/// Command to place a new order.
///
/// The order ID is allocated when the command is built, so a caller can
/// subscribe to the order's completion before placing it.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The order ID to create.
    pub order_id: OrderId,

    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// Requested items, in order.
    pub items: Vec<OrderItem>,

    pub payment_method: PaymentMethod,

    pub payment_amount: Money,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command with a generated order ID.
    pub fn new(
        customer_id: impl Into<CustomerId>,
        items: Vec<OrderItem>,
        payment_method: PaymentMethod,
        payment_amount: Money,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            customer_id: customer_id.into(),
            items,
            payment_method,
            payment_amount,
        }
    }

    /// Checks the command, reporting every problem found, one per line.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.customer_id.is_blank() {
            problems.push("Customer ID is required".to_string());
        }
        if self.items.is_empty() {
            problems.push("Order must contain at least one item".to_string());
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.sku.is_blank() {
                problems.push(format!("Item {}: SKU is required", index + 1));
            }
            if item.quantity == 0 {
                problems.push(format!(
                    "Item {}: quantity must be a positive integer",
                    index + 1
                ));
            }
        }
        if !self.payment_amount.is_positive() {
            problems.push("Payment amount must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(problems.join("\n")))
        }
    }

    /// Builds the PENDING order this command describes.
    pub fn into_order(self) -> Order {
        let now = Utc::now();
        Order {
            id: self.order_id,
            customer_id: self.customer_id,
            items: self.items,
            status: OrderStatus::Pending,
            payment_method: self.payment_method,
            payment_amount: self.payment_amount,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PlaceOrder {
        PlaceOrder::new(
            "cust123",
            vec![OrderItem::new("ITEM001", 2)],
            PaymentMethod::Visa,
            Money::from_cents(1000),
        )
    }

    #[test]
    fn test_valid_command() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_each_call_allocates_a_new_id() {
        assert_ne!(valid().order_id, valid().order_id);
    }

    #[test]
    fn test_into_order_keeps_id_and_is_pending() {
        let cmd = valid();
        let id = cmd.order_id;
        let order = cmd.into_order();

        assert_eq!(order.id, id);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn test_validation_joins_all_problems() {
        let cmd = PlaceOrder::new(
            "",
            vec![OrderItem::new("", 0)],
            PaymentMethod::Cash,
            Money::zero(),
        );

        let message = cmd.validate().unwrap_err().to_string();
        let lines: Vec<_> = message.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Customer ID is required",
                "Item 1: SKU is required",
                "Item 1: quantity must be a positive integer",
                "Payment amount must be positive",
            ]
        );
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut cmd = valid();
        cmd.items.clear();
        assert!(matches!(cmd.validate(), Err(DomainError::Validation(_))));
    }
}
