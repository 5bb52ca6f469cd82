use crate::{
    db::DbPool,
    entities::{purchase_order, line_item::validate_line_items, purchase_order_item, LineItem},
    errors::ServiceError,
};
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::line_items::{require_commodities, OrderWithItems};
use super::{not_found, validate_all, Page};

pub type PurchaseOrderDetail = OrderWithItems<purchase_order::Model, purchase_order_item::Model>;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PurchaseOrderHeader {
    #[validate(regex(
        path = "crate::validation::PHONE_NUMBER",
        message = "Supplier phone must be exactly 11 digits"
    ))]
    pub supplier_phone: String,
    /// Defaults to the current local time.
    pub transaction_time: Option<NaiveDateTime>,
    #[validate(custom = "crate::validation::validate_amount")]
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseOrder {
    #[serde(flatten)]
    pub header: PurchaseOrderHeader,
    pub items: Vec<LineItem>,
}

/// Service for restocking orders placed with suppliers
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
}

impl PurchaseOrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<Page<purchase_order::Model>, ServiceError> {
        let paginator = purchase_order::Entity::find()
            .order_by_desc(purchase_order::Column::TransactionTime)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_id: i32) -> Result<PurchaseOrderDetail, ServiceError> {
        let order = self.find(order_id).await?;
        let items = order
            .find_related(purchase_order_item::Entity)
            .all(&*self.db_pool)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    /// Stores the order and its items in one transaction.
    #[instrument(skip(self))]
    pub async fn create(&self, input: NewPurchaseOrder) -> Result<PurchaseOrderDetail, ServiceError> {
        validate_all([input.header.validate(), validate_line_items(&input.items)])?;

        let txn = self.db_pool.begin().await?;
        require_commodities(&txn, &input.items).await?;

        let header = input.header;
        let order = purchase_order::ActiveModel {
            supplier_phone: Set(header.supplier_phone),
            transaction_time: Set(header
                .transaction_time
                .unwrap_or_else(|| Local::now().naive_local())),
            total_amount: Set(header.total_amount),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = purchase_order_item::ActiveModel {
                commodity_id: Set(line.commodity_id),
                quantity: Set(line.quantity),
                order_id: Set(order.order_id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;
        info!(order_id = order.order_id, items = items.len(), "purchase order created");
        Ok(OrderWithItems { order, items })
    }

    /// Changes the order header; items are fixed once the order exists.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        order_id: i32,
        header: PurchaseOrderHeader,
    ) -> Result<purchase_order::Model, ServiceError> {
        header.validate()?;
        let mut order: purchase_order::ActiveModel = self.find(order_id).await?.into();
        order.supplier_phone = Set(header.supplier_phone);
        if let Some(time) = header.transaction_time {
            order.transaction_time = Set(time);
        }
        order.total_amount = Set(header.total_amount);
        Ok(order.update(&*self.db_pool).await?)
    }

    /// Deletes the order; its items go with it, the commodities stay.
    #[instrument(skip(self))]
    pub async fn delete(&self, order_id: i32) -> Result<(), ServiceError> {
        let result = purchase_order::Entity::delete_by_id(order_id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found("Purchase order", order_id));
        }
        info!(order_id, "purchase order deleted");
        Ok(())
    }

    async fn find(&self, order_id: i32) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Purchase order", order_id))
    }
}
