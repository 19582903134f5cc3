use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::patch,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{error::ApiError, response::success, AppState};
use crate::domain::entities::UpdateRow;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rows/:id", patch(update_row).delete(delete_row))
        .route("/rows/:id/reorder", patch(reorder_row))
}

async fn update_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateRow>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().update_row(id, patch)?))
}

async fn delete_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.write().delete_row(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ReorderRow {
    position: i32,
}

async fn reorder_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReorderRow>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success(state.store.write().reorder_row(id, body.position)?))
}
