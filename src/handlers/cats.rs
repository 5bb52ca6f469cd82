use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{services::cats::CatInput, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};

async fn list_cats(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state.services.cats.list(params.page, params.per_page).await?;
    Ok(paginated(page, params))
}

async fn get_cat(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    Ok(success_response(state.services.cats.get(id).await?))
}

async fn create_cat(State(state): State<AppState>, Json(payload): Json<CatInput>) -> HandlerResult {
    Ok(created_response(state.services.cats.create(payload).await?))
}

async fn update_cat(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CatInput>,
) -> HandlerResult {
    Ok(success_response(state.services.cats.update(id, payload).await?))
}

async fn delete_cat(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    state.services.cats.delete(id).await?;
    Ok(no_content_response())
}

pub fn cat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cats).post(create_cat))
        .route("/:id", get(get_cat).put(update_cat).delete(delete_cat))
}
