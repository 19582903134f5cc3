use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::{error::ApiError, response::success, AppState};
use crate::domain::entities::{CreateFuse, CreatePanel, CreateRow, UpdatePanel};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/panels", get(list_panels).post(create_panel))
        .route(
            "/panels/:id",
            get(get_panel).patch(update_panel).delete(delete_panel),
        )
        .route("/panels/:id/hierarchy", get(get_hierarchy))
        .route("/panels/:id/rows", post(create_row))
        .route("/panels/:id/fuses", post(create_fuse))
}

async fn list_panels(State(state): State<AppState>) -> impl IntoResponse {
    success(state.store.read().panels())
}

/// Full ordered tree: rows with their fuses, each fuse with its branch,
/// plus the panel's unassigned fuses.
async fn get_panel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().panel_view(id)?))
}

async fn create_panel(
    State(state): State<AppState>,
    Json(input): Json<CreatePanel>,
) -> Result<impl IntoResponse, ApiError> {
    let panel = state.store.write().create_panel(input)?;
    Ok((StatusCode::CREATED, success(panel)))
}

async fn update_panel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdatePanel>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_panel(id, patch)?))
}

async fn delete_panel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_panel(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ancestor chain of the panel, root first.
async fn get_hierarchy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.read().panel_hierarchy(id)?))
}

async fn create_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateRow>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state.store.write().create_row(id, input)?;
    Ok((StatusCode::CREATED, success(row)))
}

async fn create_fuse(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateFuse>,
) -> Result<impl IntoResponse, ApiError> {
    let fuse = state.store.write().create_fuse(id, input)?;
    Ok((StatusCode::CREATED, success(fuse)))
}
