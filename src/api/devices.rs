use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{error::ApiError, response::success, AppState};
use crate::domain::entities::{CreateDevice, MoveDevice, UpdateDevice};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/devices", get(list_devices).post(create_device))
        .route(
            "/devices/:id",
            get(get_device).patch(update_device).delete(delete_device),
        )
        .route("/devices/:id/move", patch(move_device))
}

#[derive(Debug, Deserialize)]
struct DeviceListQuery {
    /// Only devices with no structural parent.
    #[serde(default)]
    unassigned: bool,
}

async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<DeviceListQuery>,
) -> impl IntoResponse {
    let store = state.store.read();
    if query.unassigned {
        success(store.unassigned_devices())
    } else {
        success(store.devices())
    }
}

async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().device(id)?))
}

async fn create_device(
    State(state): State<AppState>,
    Json(input): Json<CreateDevice>,
) -> Result<impl IntoResponse, ApiError> {
    let device = state.store.write().create_device(input)?;
    Ok((StatusCode::CREATED, success(device)))
}

async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateDevice>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_device(id, patch)?))
}

/// Re-parent the device. An empty body (all references absent) is the
/// explicit unassign.
async fn move_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(target): Json<MoveDevice>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().move_device(id, target)?))
}

async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_device(id)?;
    Ok(StatusCode::NO_CONTENT)
}
