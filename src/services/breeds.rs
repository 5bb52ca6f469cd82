use crate::{
    db::DbPool,
    entities::cat_breed,
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{not_found, Page};

/// Maximum number of rows returned by a breed name search.
pub const SEARCH_LIMIT: u64 = 10;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BreedInput {
    #[validate(length(
        min = 1,
        max = 10,
        message = "Breed name must be between 1 and 10 characters"
    ))]
    pub breed_name: String,
    #[validate(length(max = 50, message = "Remark cannot exceed 50 characters"))]
    pub remark: Option<String>,
}

/// Service for managing cat breeds
#[derive(Clone)]
pub struct BreedService {
    db_pool: Arc<DbPool>,
}

impl BreedService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<cat_breed::Model>, ServiceError> {
        let paginator = cat_breed::Entity::find()
            .order_by_asc(cat_breed::Column::Id)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<cat_breed::Model, ServiceError> {
        cat_breed::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Breed", id))
    }

    /// Breeds whose name contains `query`, at most [`SEARCH_LIMIT`] rows.
    ///
    /// Dropping the returned future abandons the query.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<cat_breed::Model>, ServiceError> {
        let mut select = cat_breed::Entity::find();
        let query = query.trim();
        if !query.is_empty() {
            select = select.filter(cat_breed::Column::BreedName.contains(query));
        }
        Ok(select
            .order_by_asc(cat_breed::Column::Id)
            .limit(SEARCH_LIMIT)
            .all(&*self.db_pool)
            .await?)
    }

    /// Creates a breed. A duplicate name is refused by the unique index.
    #[instrument(skip(self))]
    pub async fn create(&self, input: BreedInput) -> Result<cat_breed::Model, ServiceError> {
        input.validate()?;
        let breed = cat_breed::ActiveModel {
            breed_name: Set(input.breed_name),
            remark: Set(input.remark),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(breed_id = breed.id, "breed created");
        Ok(breed)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: i32, input: BreedInput) -> Result<cat_breed::Model, ServiceError> {
        input.validate()?;
        let mut breed: cat_breed::ActiveModel = self.get(id).await?.into();
        breed.breed_name = Set(input.breed_name);
        breed.remark = Set(input.remark);
        Ok(breed.update(&*self.db_pool).await?)
    }

    /// Deletes a breed together with its cats.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = cat_breed::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found("Breed", id));
        }
        info!(breed_id = id, "breed deleted");
        Ok(())
    }
}
