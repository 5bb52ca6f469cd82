pub mod appointments;
pub mod breeds;
pub mod cat_orders;
pub mod cats;
pub mod common;
pub mod commodities;
pub mod commodity_orders;
pub mod health;
pub mod purchase_orders;
pub mod users;

use std::sync::Arc;

use crate::auth::IdentityStore;
use crate::db::DbPool;
use crate::services::{
    appointments::AppointmentService, breeds::BreedService, cat_orders::CatOrderService,
    cats::CatService, commodities::CommodityService, commodity_orders::CommodityOrderService,
    purchase_orders::PurchaseOrderService, users::UserService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub breeds: Arc<BreedService>,
    pub cats: Arc<CatService>,
    pub cat_orders: Arc<CatOrderService>,
    pub commodities: Arc<CommodityService>,
    pub commodity_orders: Arc<CommodityOrderService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub appointments: Arc<AppointmentService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, identity: IdentityStore) -> Self {
        Self {
            breeds: Arc::new(BreedService::new(db_pool.clone())),
            cats: Arc::new(CatService::new(db_pool.clone())),
            cat_orders: Arc::new(CatOrderService::new(db_pool.clone())),
            commodities: Arc::new(CommodityService::new(db_pool.clone())),
            commodity_orders: Arc::new(CommodityOrderService::new(db_pool.clone())),
            purchase_orders: Arc::new(PurchaseOrderService::new(db_pool.clone())),
            appointments: Arc::new(AppointmentService::new(db_pool)),
            users: Arc::new(UserService::new(identity)),
        }
    }
}
