use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::{error::ApiError, response::success, AppState};
use crate::domain::entities::{
    CreateJunctionBox, CreateSocket, CreateSubPanel, MoveFuse, UpdateFuse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fuses/:id", get(get_fuse).patch(update_fuse).delete(delete_fuse))
        .route("/fuses/:id/move", patch(move_fuse))
        .route("/fuses/:id/load", get(get_load))
        .route("/fuses/:id/sockets", post(create_socket))
        .route("/fuses/:id/junction-boxes", post(create_junction_box))
        .route("/fuses/:id/sub-panel", post(create_sub_panel))
}

/// Fuse with its full load branch (sockets, junction boxes, hardwired
/// devices, sub-panel).
async fn get_fuse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().fuse_view(id)?))
}

async fn update_fuse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateFuse>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_fuse(id, patch)?))
}

async fn delete_fuse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_fuse(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move into a row (capacity checked) or out to the unassigned pool.
async fn move_fuse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(target): Json<MoveFuse>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().move_fuse(id, target)?))
}

async fn get_load(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().fuse_load(id)?))
}

async fn create_socket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateSocket>,
) -> Result<impl IntoResponse, ApiError> {
    let socket = state.store.write().create_socket_on_fuse(id, input)?;
    Ok((StatusCode::CREATED, success(socket)))
}

async fn create_junction_box(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateJunctionBox>,
) -> Result<impl IntoResponse, ApiError> {
    let junction_box = state.store.write().create_junction_box(id, input)?;
    Ok((StatusCode::CREATED, success(junction_box)))
}

async fn create_sub_panel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateSubPanel>,
) -> Result<impl IntoResponse, ApiError> {
    let panel = state.store.write().create_sub_panel(id, input)?;
    Ok((StatusCode::CREATED, success(panel)))
}
