use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_before_save;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "cat_breed")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 10,
        message = "Breed name must be between 1 and 10 characters"
    ))]
    pub breed_name: String,

    #[validate(length(max = 50, message = "Remark cannot exceed 50 characters"))]
    pub remark: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cat_info::Entity")]
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
        if let ActiveValue::NotSet = candidate.id {
            candidate.id = Set(0);
        }
        validate_before_save(&candidate.try_into_model()?)?;
        Ok(self)
    }
}
