use crate::{db::DbPool, entities::appointment, errors::ServiceError};
use chrono::NaiveDateTime;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{not_found, Page};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppointmentInput {
    #[validate(length(
        min = 1,
        max = 10,
        message = "Customer name must be between 1 and 10 characters"
    ))]
    pub customer_name: String,
    pub arrival_date_time: NaiveDateTime,
    #[validate(length(max = 50, message = "Remark cannot exceed 50 characters"))]
    pub remark: Option<String>,
}

/// Service for customer visit bookings
#[derive(Clone)]
pub struct AppointmentService {
    db_pool: Arc<DbPool>,
}

impl AppointmentService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Bookings by arrival time, earliest first.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<Page<appointment::Model>, ServiceError> {
        let paginator = appointment::Entity::find()
            .order_by_asc(appointment::Column::ArrivalDateTime)
            .order_by_asc(appointment::Column::Id)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<appointment::Model, ServiceError> {
        appointment::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| not_found("Appointment", id))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: AppointmentInput) -> Result<appointment::Model, ServiceError> {
        input.validate()?;
        let booking = appointment::ActiveModel {
            customer_name: Set(input.customer_name),
            arrival_date_time: Set(input.arrival_date_time),
            remark: Set(input.remark),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;
        info!(appointment_id = booking.id, "appointment booked");
        Ok(booking)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        input: AppointmentInput,
    ) -> Result<appointment::Model, ServiceError> {
        input.validate()?;
        let mut booking: appointment::ActiveModel = self.get(id).await?.into();
        booking.customer_name = Set(input.customer_name);
        booking.arrival_date_time = Set(input.arrival_date_time);
        booking.remark = Set(input.remark);
        Ok(booking.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = appointment::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found("Appointment", id));
        }
        info!(appointment_id = id, "appointment cancelled");
        Ok(())
    }
}
