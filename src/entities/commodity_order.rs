use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_before_save;

/// A customer's purchase of one or more commodities.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "commodity_order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub order_id: i32,

    #[validate(regex(
        path = "crate::validation::PHONE_NUMBER",
        message = "Customer phone must be exactly 11 digits"
    ))]
    pub customer_phone: String,

    pub transaction_time: DateTime,

    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    #[validate(custom = "crate::validation::validate_amount")]
    pub total_amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr> {
        let mut candidate = self.clone();
        if let ActiveValue::NotSet = candidate.order_id {
            candidate.order_id = Set(0);
        }
        validate_before_save(&candidate.try_into_model()?)?;
        Ok(self)
    }
}
