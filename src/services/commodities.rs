use crate::{
    db::DbPool,
    entities::{commodity, order_item, purchase_order_item, CommodityType},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::{not_found, Page};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommodityInput {
    #[validate(length(min = 1, max = 50, message = "Brand must be between 1 and 50 characters"))]
    pub brand: String,
    pub commodity_type: CommodityType,
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Quantity in stock cannot be negative"))]
    pub quantity_in_stock: i32,
    #[validate(length(min = 1, max = 10, message = "Unit must be between 1 and 10 characters"))]
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommodityView {
    #[serde(flatten)]
    pub commodity: commodity::Model,
    pub type_label: &'static str,
}

impl From<commodity::Model> for CommodityView {
    fn from(commodity: commodity::Model) -> Self {
        Self {
            type_label: commodity.commodity_type.label(),
            commodity,
        }
    }
}

/// Service for the commodity catalog
#[derive(Clone)]
pub struct CommodityService {
    db_pool: Arc<DbPool>,
}

impl CommodityService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        commodity_type: Option<CommodityType>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<CommodityView>, ServiceError> {
        let mut select = commodity::Entity::find();
        if let Some(kind) = commodity_type {
            select = select.filter(commodity::Column::CommodityType.eq(kind));
        }
        let paginator = select
            .order_by_asc(commodity::Column::Id)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total }.map(CommodityView::from))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<CommodityView, ServiceError> {
        Ok(self.find(id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CommodityInput) -> Result<commodity::Model, ServiceError> {
        input.validate()?;
        let commodity = commodity::ActiveModel {
            brand: Set(input.brand),
            commodity_type: Set(input.commodity_type),
            name: Set(input.name),
            quantity_in_stock: Set(input.quantity_in_stock),
            unit: Set(input.unit),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(commodity_id = commodity.id, "commodity created");
        Ok(commodity)
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: i32, input: CommodityInput) -> Result<commodity::Model, ServiceError> {
        input.validate()?;
        let mut commodity: commodity::ActiveModel = self.find(id).await?.into();
        commodity.brand = Set(input.brand);
        commodity.commodity_type = Set(input.commodity_type);
        commodity.name = Set(input.name);
        commodity.quantity_in_stock = Set(input.quantity_in_stock);
        commodity.unit = Set(input.unit);
        Ok(commodity.update(&*self.db_pool).await?)
    }

    /// Deletes a commodity that no sales or purchase order lists.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let commodity = self.find(id).await?;

        let sold = order_item::Entity::find()
            .filter(order_item::Column::CommodityId.eq(id))
            .count(&*self.db_pool)
            .await?;
        let purchased = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::CommodityId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if sold + purchased > 0 {
            warn!(commodity_id = id, sold, purchased, "commodity still referenced");
            return Err(ServiceError::Conflict(format!(
                "Commodity {} is listed on {} order item(s)",
                commodity.name,
                sold + purchased
            )));
        }

        commodity::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(commodity_id = id, "commodity deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<commodity::Model, ServiceError> {
        commodity::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Commodity", id))
    }
}
