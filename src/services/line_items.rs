//! Pieces shared by sales and purchase orders. Both order kinds keep their items in their own
//! table and compose these helpers.

use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;

use crate::entities::{commodity, LineItem};
use crate::errors::{FieldErrors, ServiceError};

/// An order header together with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems<O, I> {
    #[serde(flatten)]
    pub order: O,
    pub items: Vec<I>,
}

/// Fails with a field error on `items` naming every commodity that does not exist.
pub async fn require_commodities<C: ConnectionTrait>(
    conn: &C,
    items: &[LineItem],
) -> Result<(), ServiceError> {
    let wanted: Vec<i32> = items.iter().map(|item| item.commodity_id).collect();
    let found: HashSet<i32> = commodity::Entity::find()
        .select_only()
        .column(commodity::Column::Id)
        .filter(commodity::Column::Id.is_in(wanted))
        .into_tuple::<i32>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    let missing: Vec<String> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !found.contains(&item.commodity_id))
        .map(|(position, item)| {
            format!(
                "Item {}: commodity {} does not exist",
                position + 1,
                item.commodity_id
            )
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::InvalidFields(FieldErrors::from([(
            "items".to_string(),
            missing,
        )])))
    }
}
