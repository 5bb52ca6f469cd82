use crate::{
    db::DbPool,
    entities::{cat_breed, cat_info, CatState},
    errors::ServiceError,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{invalid_field, not_found, Page};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CatInput {
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
    pub birthday: NaiveDate,
    pub cat_state: CatState,
}

/// A cat as shown in listings: the row plus its breed name and display labels.
#[derive(Debug, Clone, Serialize)]
pub struct CatView {
    #[serde(flatten)]
    pub cat: cat_info::Model,
    pub breed_name: Option<String>,
    pub gender_label: &'static str,
    pub state_label: &'static str,
}

impl CatView {
    fn new(cat: cat_info::Model, breed: Option<cat_breed::Model>) -> Self {
        Self {
            gender_label: cat.gender_label(),
            state_label: cat.cat_state.label(),
            breed_name: breed.map(|b| b.breed_name),
            cat,
        }
    }
}

/// Service for managing the cats on offer
#[derive(Clone)]
pub struct CatService {
    db_pool: Arc<DbPool>,
}

impl CatService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<CatView>, ServiceError> {
        let paginator = cat_info::Entity::find()
            .find_also_related(cat_breed::Entity)
            .order_by_asc(cat_info::Column::Id)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total }.map(|(cat, breed)| CatView::new(cat, breed)))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<CatView, ServiceError> {
        let (cat, breed) = cat_info::Entity::find_by_id(id)
            .find_also_related(cat_breed::Entity)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Cat", id))?;
        Ok(CatView::new(cat, breed))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CatInput) -> Result<cat_info::Model, ServiceError> {
        input.validate()?;
        self.require_breed(input.cat_breed_id).await?;
        let cat = cat_info::ActiveModel {
            name: Set(input.name),
            gender: Set(input.gender),
            cat_breed_id: Set(input.cat_breed_id),
            birthday: Set(input.birthday),
            cat_state: Set(input.cat_state),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(cat_id = cat.id, "cat created");
        Ok(cat)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: i32, input: CatInput) -> Result<cat_info::Model, ServiceError> {
        input.validate()?;
        let existing = cat_info::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Cat", id))?;
        self.require_breed(input.cat_breed_id).await?;

        let mut cat: cat_info::ActiveModel = existing.into();
        cat.name = Set(input.name);
        cat.gender = Set(input.gender);
        cat.cat_breed_id = Set(input.cat_breed_id);
        cat.birthday = Set(input.birthday);
        cat.cat_state = Set(input.cat_state);
        Ok(cat.update(&*self.db_pool).await?)
    }

    /// Deletes a cat and its sale records.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = cat_info::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found("Cat", id));
        }
        info!(cat_id = id, "cat deleted");
        Ok(())
    }

    async fn require_breed(&self, breed_id: i32) -> Result<(), ServiceError> {
        match cat_breed::Entity::find_by_id(breed_id)
            .one(&*self.db_pool)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(invalid_field(
                "cat_breed_id",
                format!("Breed {breed_id} does not exist"),
            )),
        }
    }
}
