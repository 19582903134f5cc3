use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{error::ApiError, response::success, AppState};
use crate::domain::entities::{CreateDevice, UpdateSocket};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/sockets/:id",
            get(get_socket).patch(update_socket).delete(delete_socket),
        )
        .route("/sockets/:id/reorder", patch(reorder_socket))
        .route("/sockets/:id/devices", post(create_device))
}

async fn get_socket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().socket(id)?))
}

async fn update_socket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateSocket>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_socket(id, patch)?))
}

async fn delete_socket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_socket(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderSocket {
    sort_order: i32,
}

async fn reorder_socket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReorderSocket>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(
        state.store.write().reorder_socket(id, body.sort_order)?,
    ))
}

/// Plug a device into this socket; any parent ids in the body are
/// overridden by the path.
async fn create_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateDevice>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateDevice {
        socket_id: Some(id),
        fuse_id: None,
        junction_box_id: None,
        ..input
    };
    let device = state.store.write().create_device(input)?;
    Ok((StatusCode::CREATED, success(device)))
}
