use crate::{
    db::DbPool,
    entities::{cat_info, cat_order},
    errors::ServiceError,
};
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{invalid_field, not_found, Page};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CatOrderInput {
    #[validate(regex(
        path = "crate::validation::PHONE_NUMBER",
        message = "Customer phone must be exactly 11 digits"
    ))]
    pub customer_phone: String,
    /// Defaults to the current local time.
    pub transaction_time: Option<NaiveDateTime>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub amount: Decimal,
    pub cat_info_id: i32,
}

/// Service for cat sales
#[derive(Clone)]
pub struct CatOrderService {
    db_pool: Arc<DbPool>,
}

impl CatOrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<cat_order::Model>, ServiceError> {
        let paginator = cat_order::Entity::find()
            .order_by_desc(cat_order::Column::TransactionTime)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: i32) -> Result<cat_order::Model, ServiceError> {
        cat_order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Cat order", order_id))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CatOrderInput) -> Result<cat_order::Model, ServiceError> {
        input.validate()?;
        self.require_cat(input.cat_info_id).await?;
        let order = cat_order::ActiveModel {
            customer_phone: Set(input.customer_phone),
            transaction_time: Set(input
                .transaction_time
                .unwrap_or_else(|| Local::now().naive_local())),
            amount: Set(input.amount),
            cat_info_id: Set(input.cat_info_id),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(order_id = order.order_id, "cat order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        order_id: i32,
        input: CatOrderInput,
    ) -> Result<cat_order::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(order_id).await?;
        self.require_cat(input.cat_info_id).await?;

        let mut order: cat_order::ActiveModel = existing.into();
        order.customer_phone = Set(input.customer_phone);
        if let Some(time) = input.transaction_time {
            order.transaction_time = Set(time);
        }
        order.amount = Set(input.amount);
        order.cat_info_id = Set(input.cat_info_id);
        Ok(order.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, order_id: i32) -> Result<(), ServiceError> {
        let result = cat_order::Entity::delete_by_id(order_id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found("Cat order", order_id));
        }
        info!(order_id, "cat order deleted");
        Ok(())
    }

    async fn require_cat(&self, cat_id: i32) -> Result<(), ServiceError> {
        match cat_info::Entity::find_by_id(cat_id).one(&*self.db_pool).await? {
            Some(_) => Ok(()),
            None => Err(invalid_field(
                "cat_info_id",
                format!("Cat {cat_id} does not exist"),
            )),
        }
    }
}
