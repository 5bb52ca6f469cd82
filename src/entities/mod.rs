//! Store entities: breeds, cats, the commodity catalog, orders and appointments.
//!
//! Every model derives `Validate`; `before_save` re-checks the rules so rows written outside the
//! services (seed data, tests) are held to the same field limits.

use sea_orm::DbErr;
use validator::Validate;

pub mod appointment;
pub mod cat_breed;
pub mod cat_info;
pub mod cat_order;
pub mod commodity;
pub mod commodity_order;
pub mod line_item;
pub mod order_item;
pub mod purchase_order;
pub mod purchase_order_item;

pub use cat_info::CatState;
pub use commodity::CommodityType;
pub use line_item::LineItem;

/// Prefix of the `DbErr::Custom` message produced when a row fails validation on save.
pub const VALIDATION_FAILED: &str = "validation failed: ";

pub(crate) fn validate_before_save<M: Validate>(model: &M) -> Result<(), DbErr> {
    model
        .validate()
        .map_err(|errors| DbErr::Custom(format!("{VALIDATION_FAILED}{errors}")))
}
