use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{services::breeds::BreedInput, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

async fn list_breeds(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state
        .services
        .breeds
        .list(params.page, params.per_page)
        .await?;
    Ok(paginated(page, params))
}

/// Type-ahead lookup for the breed picker
async fn search_breeds(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> HandlerResult {
    let breeds = state.services.breeds.search(&query.q).await?;
    Ok(success_response(breeds))
}

async fn get_breed(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    Ok(success_response(state.services.breeds.get(id).await?))
}

async fn create_breed(
    State(state): State<AppState>,
    Json(payload): Json<BreedInput>,
) -> HandlerResult {
    Ok(created_response(state.services.breeds.create(payload).await?))
}

async fn update_breed(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<BreedInput>,
) -> HandlerResult {
    Ok(success_response(
        state.services.breeds.update(id, payload).await?,
    ))
}

/// Deleting a breed removes its cats as well.
async fn delete_breed(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    state.services.breeds.delete(id).await?;
    Ok(no_content_response())
}

pub fn breed_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_breeds).post(create_breed))
        .route("/search", get(search_breeds))
        .route(
            "/:id",
            get(get_breed).put(update_breed).delete(delete_breed),
        )
}
