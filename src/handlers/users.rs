use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::users::{CreateUser, UpdateUser},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Extension, Router,
};
use tracing::info;
use uuid::Uuid;

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state.services.users.list(params.page, params.per_page).await?;
    Ok(paginated(page, params))
}

async fn get_user(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> HandlerResult {
    Ok(success_response(state.services.users.get(user_id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(payload): Json<CreateUser>,
) -> HandlerResult {
    let created = state.services.users.create(payload).await?;
    info!(by = %admin.user_name, user_name = %created.user.user_name, "account created");
    Ok(created_response(created))
}

async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> HandlerResult {
    Ok(success_response(
        state.services.users.update(user_id, payload).await?,
    ))
}

/// Admins cannot delete the account they are signed in with.
async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> HandlerResult {
    if admin.user_id == user_id {
        return Err(ServiceError::Conflict(
            "The signed-in account cannot delete itself".to_string(),
        ));
    }
    state.services.users.delete(user_id).await?;
    info!(by = %admin.user_name, %user_id, "account deleted");
    Ok(no_content_response())
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}
