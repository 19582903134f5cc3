use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::{error::ApiError, response::success, AppState};
use crate::domain::entities::{CreateRoom, UpdateRoom};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route(
            "/rooms/:id",
            get(get_room).patch(update_room).delete(delete_room),
        )
}

async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    success(state.store.read().rooms())
}

async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().room(id)?))
}

async fn create_room(
    State(state): State<AppState>,
    Json(input): Json<CreateRoom>,
) -> Result<impl IntoResponse, ApiError> {
    let room = state.store.write().create_room(input)?;
    Ok((StatusCode::CREATED, success(room)))
}

async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateRoom>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_room(id, patch)?))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_room(id)?;
    Ok(StatusCode::NO_CONTENT)
}
