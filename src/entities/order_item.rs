use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::line_item::{new_item_id, LineItem};
use super::validate_before_save;

/// A line of a commodity order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "order_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: Uuid,
    pub commodity_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub order_id: i32,
}

impl Model {
    pub fn line(&self) -> LineItem {
        LineItem {
            commodity_id: self.commodity_id,
            quantity: self.quantity,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::commodity_order::Entity",
        from = "Column::OrderId",
        to = "super::commodity_order::Column::OrderId",
        on_delete = "Cascade"
    )]
    CommodityOrder,
    #[sea_orm(
        belongs_to = "super::commodity::Entity",
        from = "Column::CommodityId",
        to = "super::commodity::Column::Id",
        on_delete = "Restrict"
    )]
    Commodity,
}

impl Related<super::commodity_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommodityOrder.def()
    }
}

impl Related<super::commodity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commodity.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if insert {
            if let ActiveValue::NotSet = active_model.item_id {
                active_model.item_id = Set(new_item_id());
            }
        }
        validate_before_save(&active_model.clone().try_into_model()?)?;
        Ok(active_model)
    }
}
