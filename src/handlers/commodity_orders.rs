use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{
    services::commodity_orders::{CommodityOrderHeader, NewCommodityOrder},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};

async fn list_commodity_orders(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state
        .services
        .commodity_orders
        .list(params.page, params.per_page)
        .await?;
    Ok(paginated(page, params))
}

/// The order header with its items
async fn get_commodity_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> HandlerResult {
    Ok(success_response(
        state.services.commodity_orders.get(order_id).await?,
    ))
}

async fn create_commodity_order(
    State(state): State<AppState>,
    Json(payload): Json<NewCommodityOrder>,
) -> HandlerResult {
    Ok(created_response(
        state.services.commodity_orders.create(payload).await?,
    ))
}

async fn update_commodity_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(payload): Json<CommodityOrderHeader>,
) -> HandlerResult {
    Ok(success_response(
        state
            .services
            .commodity_orders
            .update(order_id, payload)
            .await?,
    ))
}

async fn delete_commodity_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> HandlerResult {
    state.services.commodity_orders.delete(order_id).await?;
    Ok(no_content_response())
}

pub fn commodity_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_commodity_orders).post(create_commodity_order))
        .route(
            "/:id",
            get(get_commodity_order)
                .put(update_commodity_order)
                .delete(delete_commodity_order),
        )
}
