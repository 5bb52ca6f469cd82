use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{
    services::purchase_orders::{NewPurchaseOrder, PurchaseOrderHeader},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};

async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state
        .services
        .purchase_orders
        .list(params.page, params.per_page)
        .await?;
    Ok(paginated(page, params))
}

/// The purchase header with the items received
async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> HandlerResult {
    Ok(success_response(
        state.services.purchase_orders.get(order_id).await?,
    ))
}

async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<NewPurchaseOrder>,
) -> HandlerResult {
    Ok(created_response(
        state.services.purchase_orders.create(payload).await?,
    ))
}

async fn update_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(payload): Json<PurchaseOrderHeader>,
) -> HandlerResult {
    Ok(success_response(
        state
            .services
            .purchase_orders
            .update(order_id, payload)
            .await?,
    ))
}

async fn delete_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> HandlerResult {
    state.services.purchase_orders.delete(order_id).await?;
    Ok(no_content_response())
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route(
            "/:id",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
}
