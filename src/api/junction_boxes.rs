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
use crate::domain::entities::{CreateDevice, CreateSocket, UpdateJunctionBox};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/junction-boxes/:id",
            get(get_junction_box)
                .patch(update_junction_box)
                .delete(delete_junction_box),
        )
        .route("/junction-boxes/:id/reorder", patch(reorder_junction_box))
        .route("/junction-boxes/:id/sockets", post(create_socket))
        .route("/junction-boxes/:id/devices", post(create_device))
}

async fn get_junction_box(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().junction_box(id)?))
}

async fn update_junction_box(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateJunctionBox>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_junction_box(id, patch)?))
}

async fn delete_junction_box(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_junction_box(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderJunctionBox {
    sort_order: i32,
}

async fn reorder_junction_box(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReorderJunctionBox>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(
        state.store.write().reorder_junction_box(id, body.sort_order)?,
    ))
}

async fn create_socket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateSocket>,
) -> Result<impl IntoResponse, ApiError> {
    let socket = state.store.write().create_socket_on_junction_box(id, input)?;
    Ok((StatusCode::CREATED, success(socket)))
}

/// Devices wired into a junction box are hardwired by definition.
async fn create_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateDevice>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateDevice {
        socket_id: None,
        fuse_id: None,
        junction_box_id: Some(id),
        is_hardwired: true,
        ..input
    };
    let device = state.store.write().create_device(input)?;
    Ok((StatusCode::CREATED, success(device)))
}
