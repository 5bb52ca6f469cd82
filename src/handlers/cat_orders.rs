use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{services::cat_orders::CatOrderInput, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use tracing::info;

async fn list_cat_orders(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state
        .services
        .cat_orders
        .list(params.page, params.per_page)
        .await?;
    Ok(paginated(page, params))
}

async fn get_cat_order(State(state): State<AppState>, Path(order_id): Path<i32>) -> HandlerResult {
    Ok(success_response(state.services.cat_orders.get(order_id).await?))
}

async fn create_cat_order(
    State(state): State<AppState>,
    Json(payload): Json<CatOrderInput>,
) -> HandlerResult {
    let order = state.services.cat_orders.create(payload).await?;
    info!(order_id = order.order_id, cat_id = order.cat_info_id, "cat sold");
    Ok(created_response(order))
}

async fn update_cat_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(payload): Json<CatOrderInput>,
) -> HandlerResult {
    Ok(success_response(
        state.services.cat_orders.update(order_id, payload).await?,
    ))
}

async fn delete_cat_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> HandlerResult {
    state.services.cat_orders.delete(order_id).await?;
    Ok(no_content_response())
}

pub fn cat_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cat_orders).post(create_cat_order))
        .route(
            "/:id",
            get(get_cat_order)
                .put(update_cat_order)
                .delete(delete_cat_order),
        )
}
