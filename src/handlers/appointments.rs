use super::common::{
    created_response, no_content_response, paginated, success_response, HandlerResult,
    PaginationParams,
};
use crate::{services::appointments::AppointmentInput, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};

/// Upcoming visits first
async fn list_appointments(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> HandlerResult {
    let params = params.normalized();
    let page = state
        .services
        .appointments
        .list(params.page, params.per_page)
        .await?;
    Ok(paginated(page, params))
}

async fn get_appointment(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    Ok(success_response(state.services.appointments.get(id).await?))
}

async fn create_appointment(
    State(state): State<AppState>,
    Json(payload): Json<AppointmentInput>,
) -> HandlerResult {
    Ok(created_response(
        state.services.appointments.create(payload).await?,
    ))
}

async fn update_appointment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AppointmentInput>,
) -> HandlerResult {
    Ok(success_response(
        state.services.appointments.update(id, payload).await?,
    ))
}

async fn delete_appointment(State(state): State<AppState>, Path(id): Path<i32>) -> HandlerResult {
    state.services.appointments.delete(id).await?;
    Ok(no_content_response())
}

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route(
            "/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
}
