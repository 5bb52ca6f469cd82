//! The commodity/quantity pair carried by both sales and purchase orders.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::validation::error_with_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LineItem {
    pub commodity_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Item keys are generated here, never by the database.
pub fn new_item_id() -> Uuid {
    Uuid::new_v4()
}

/// Checks the item list of a new order: at least one line, each quantity positive, and no
/// commodity listed twice.
pub fn validate_line_items(items: &[LineItem]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if items.is_empty() {
        errors.add(
            "items",
            error_with_message("items_empty", "An order needs at least one item".to_string()),
        );
    }

    let mut seen = HashSet::new();
    for (position, item) in items.iter().enumerate() {
        if item.quantity < 1 {
            errors.add(
                "items",
                error_with_message(
                    "quantity_too_small",
                    format!("Item {}: quantity must be at least 1", position + 1),
                ),
            );
        }
        if !seen.insert(item.commodity_id) {
            errors.add(
                "items",
                error_with_message(
                    "duplicate_commodity",
                    format!(
                        "Item {}: commodity {} is already on this order",
                        position + 1,
                        item.commodity_id
                    ),
                ),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(commodity_id: i32, quantity: i32) -> LineItem {
        LineItem {
            commodity_id,
            quantity,
        }
    }

    #[test]
    fn accepts_distinct_positive_items() {
        assert!(validate_line_items(&[item(1, 2), item(2, 1)]).is_ok());
    }

    #[test]
    fn rejects_empty_orders() {
        assert!(validate_line_items(&[]).is_err());
    }

    #[test]
    fn reports_every_problem() {
        let errors = validate_line_items(&[item(1, 0), item(1, 3)]).unwrap_err();
        let items = errors.field_errors()["items"];
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].code, "quantity_too_small");
        assert_eq!(items[1].code, "duplicate_commodity");
    }

    #[test]
    fn item_ids_are_unique() {
        assert_ne!(new_item_id(), new_item_id());
    }
}
