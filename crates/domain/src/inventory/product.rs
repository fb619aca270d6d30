use std::collections::BTreeMap;

use common::Sku;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::value_objects::Money;

/// A sellable product and its on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub sku: Sku,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    pub quantity: u32,
}

impl Product {
    pub fn new(
        sku: impl Into<Sku>,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            description: description.into(),
            price,
            quantity,
        }
    }
}

/// Input for adding a product to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: Sku,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub quantity: u32,
}

impl NewProduct {
    /// Checks the fields a product cannot exist without.
    ///
    /// All problems are reported at once, one per line.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.sku.is_blank() {
            problems.push("Product's SKU is required");
        }
        if self.name.trim().is_empty() {
            problems.push("Product's name is required");
        }
        if self.price.is_negative() {
            problems.push("Product's price must not be negative");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(problems.join("\n")))
        }
    }
}

impl From<NewProduct> for Product {
    fn from(input: NewProduct) -> Self {
        Self {
            sku: input.sku,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
        }
    }
}

/// Quantity of a product currently held by in-flight orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    pub locked_quantity: u32,
}

/// Persisted lock table, keyed by [`lock_key`].
pub type LockTable = BTreeMap<String, LockEntry>;

/// Returns the lock table key for `sku`.
pub fn lock_key(sku: &Sku) -> String {
    format!("inventory_lock:{sku}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_json_shape() {
        let product = Product::new("SKU-1", "Widget", "Blue", Money::from_cents(1999), 4);
        let json = serde_json::to_value(&product).unwrap();

        assert_eq!(json["sku"], "SKU-1");
        assert_eq!(json["price"], 1999);
        assert_eq!(json["quantity"], 4);
    }

    #[test]
    fn test_lock_entry_is_camel_case() {
        let mut table = LockTable::new();
        table.insert(lock_key(&Sku::new("A")), LockEntry { locked_quantity: 2 });

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["inventory_lock:A"]["lockedQuantity"], 2);
    }

    #[test]
    fn test_new_product_validation_collects_problems() {
        let input = NewProduct {
            sku: Sku::new(" "),
            name: String::new(),
            description: String::new(),
            price: Money::from_cents(-1),
            quantity: 0,
        };

        let err = input.validate().unwrap_err();
        assert_eq!(err.to_string().lines().count(), 3);
    }

    #[test]
    fn test_new_product_description_is_optional() {
        let input: NewProduct =
            serde_json::from_str(r#"{"sku":"A","name":"Widget","price":100,"quantity":5}"#)
                .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(Product::from(input).description, "");
    }
}
