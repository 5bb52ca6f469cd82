use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{entities::CommodityType, services::commodities::CommodityInput, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;

// Query strings cannot go through `serde(flatten)` with numeric fields, so the paging fields are
// repeated here.
#[derive(Debug, Deserialize)]
pub struct CommodityListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[serde(rename = "type")]
    pub commodity_type: Option<CommodityType>,
}

impl CommodityListQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .normalized()
    }
}

async fn list_commodities(
    State(state): State<AppState>,
    Query(query): Query<CommodityListQuery>,
) -> HandlerResult {
    let params = query.pagination();
    let page = state
        .services
        .commodities
        .list(query.commodity_type, params.page, params.per_page)
        .await?;
    Ok(paginated(page, params))
}

async fn get_commodity(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    Ok(success_response(state.services.commodities.get(id).await?))
}

async fn create_commodity(
    State(state): State<AppState>,
    Json(payload): Json<CommodityInput>,
) -> HandlerResult {
    Ok(created_response(
        state.services.commodities.create(payload).await?,
    ))
}

async fn update_commodity(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CommodityInput>,
) -> HandlerResult {
    Ok(success_response(
        state.services.commodities.update(id, payload).await?,
    ))
}

/// Refused with 409 while any order item lists the commodity.
async fn delete_commodity(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    state.services.commodities.delete(id).await?;
    Ok(no_content_response())
}

pub fn commodity_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_commodities).post(create_commodity))
        .route(
            "/:id",
            get(get_commodity)
                .put(update_commodity)
                .delete(delete_commodity),
        )
}
