use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::api::{error::ApiError, response::success, AppState};
use crate::transfer::{self, ExportDocument};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/export", get(export))
        .route("/import", post(import))
}

/// Whole installation as a downloadable JSON document.
async fn export(State(state): State<AppState>) -> impl IntoResponse {
    let document = transfer::export(&state.store.read());
    let filename = format!(
        "fusemapper-export-{}.json",
        Utc::now().format("%Y-%m-%d")
    );
    (
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={filename}"),
        )],
        Json(document),
    )
}

/// Best-effort import: per-record failures land in the result's `errors`
/// and never abort the rest of the document.
async fn import(
    State(state): State<AppState>,
    Json(document): Json<ExportDocument>,
) -> Result<impl IntoResponse, ApiError> {
    let result = transfer::import(&mut state.store.write(), document);
    Ok(success(result))
}
