use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_before_save;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum CommodityType {
    #[sea_orm(num_value = 0)]
    CatFood,
    #[sea_orm(num_value = 1)]
    CatSnack,
    #[sea_orm(num_value = 2)]
    CatMedicine,
    #[sea_orm(num_value = 3)]
    CatToy,
}

impl CommodityType {
    pub fn label(self) -> &'static str {
        match self {
            CommodityType::CatFood => "猫粮",
            CommodityType::CatSnack => "猫零食",
            CommodityType::CatMedicine => "猫用药物",
            CommodityType::CatToy => "猫玩具",
        }
    }
}

impl std::fmt::Display for CommodityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "commodity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[validate(length(min = 1, max = 50, message = "Brand must be between 1 and 50 characters"))]
    pub brand: String,

    pub commodity_type: CommodityType,

    #[sea_orm(unique)]
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    #[validate(range(min = 0, message = "Quantity in stock cannot be negative"))]
    pub quantity_in_stock: i32,

    #[validate(length(min = 1, max = 10, message = "Unit must be between 1 and 10 characters"))]
    pub unit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    PurchaseOrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr> {
        let mut candidate = self.clone();
        if let ActiveValue::NotSet = candidate.id {
            candidate.id = Set(0);
        }
        validate_before_save(&candidate.try_into_model()?)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, CommodityType::CatFood, "猫粮")]
    #[case(1, CommodityType::CatSnack, "猫零食")]
    #[case(2, CommodityType::CatMedicine, "猫用药物")]
    #[case(3, CommodityType::CatToy, "猫玩具")]
    fn stored_codes_map_to_labels(
        #[case] raw: i32,
        #[case] kind: CommodityType,
        #[case] label: &str,
    ) {
        assert_eq!(kind.to_value(), raw);
        assert_eq!(CommodityType::try_from_value(&raw).unwrap(), kind);
        assert_eq!(kind.label(), label);
    }

    #[test]
    fn unknown_code_is_an_error() {
        assert!(CommodityType::try_from_value(&9).is_err());
    }

    #[test]
    fn negative_stock_is_rejected() {
        let model = Model {
            id: 1,
            brand: "皇家".to_string(),
            commodity_type: CommodityType::CatFood,
            name: "皇家室内成猫粮".to_string(),
            quantity_in_stock: -1,
            unit: "袋".to_string(),
        };
        let errors = model.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity_in_stock"));
    }
}
