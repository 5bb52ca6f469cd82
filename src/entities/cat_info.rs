use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set, TryIntoModel};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_before_save;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum CatState {
    #[sea_orm(num_value = 0)]
    ForSale,
    #[sea_orm(num_value = 1)]
    Sold,
}

impl CatState {
    pub fn label(self) -> &'static str {
        match self {
            CatState::ForSale => "待售",
            CatState::Sold => "已售",
        }
    }
}

impl std::fmt::Display for CatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "cat_info")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    #[validate(length(
        min = 2,
        max = 10,
        message = "Cat name must be between 2 and 10 characters"
    ))]
    pub name: String,

    /// `true` for a female cat.
    pub gender: bool,

    pub cat_breed_id: i32,

    #[validate(custom = "crate::validation::validate_birthday")]
    pub birthday: Date,

    pub cat_state: CatState,
}

impl Model {
    pub fn gender_label(&self) -> &'static str {
        crate::validation::display::gender_label(self.gender)
    }

    pub fn is_for_sale(&self) -> bool {
        self.cat_state == CatState::ForSale
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cat_breed::Entity",
        from = "Column::CatBreedId",
        to = "super::cat_breed::Column::Id",
        on_delete = "Cascade"
    )]
    CatBreed,
    #[sea_orm(has_many = "super::cat_order::Entity")]
    CatOrder,
}

impl Related<super::cat_breed::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatBreed.def()
    }
}

impl Related<super::cat_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatOrder.def()
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
    use chrono::{Duration, Local, NaiveDate};

    fn cat(birthday: NaiveDate) -> Model {
        Model {
            id: 1,
            name: "小白".to_string(),
            gender: true,
            cat_breed_id: 1,
            birthday,
            cat_state: CatState::ForSale,
        }
    }

    #[test]
    fn states_have_labels() {
        assert_eq!(CatState::ForSale.label(), "待售");
        assert_eq!(CatState::Sold.to_string(), "已售");
    }

    #[test]
    fn future_birthday_fails_validation() {
        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let errors = cat(tomorrow).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("birthday"));
    }

    #[test]
    fn name_length_counts_characters() {
        let mut model = cat(NaiveDate::from_ymd_opt(2022, 4, 12).unwrap());
        assert!(model.validate().is_ok());

        model.name = "白".to_string();
        assert!(model.validate().is_err());

        model.name = "一二三四五六七八九十".to_string();
        assert!(model.validate().is_ok());

        model.name.push('十');
        assert!(model.validate().is_err());
    }
}
