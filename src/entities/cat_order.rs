use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_before_save;

/// The sale of a single cat.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "cat_order")]
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
    pub amount: Decimal,

    pub cat_info_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cat_info::Entity",
        from = "Column::CatInfoId",
        to = "super::cat_info::Column::Id",
        on_delete = "Cascade"
    )]
    CatInfo,
}

impl Related<super::cat_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatInfo.def()
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
