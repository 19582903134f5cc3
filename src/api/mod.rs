pub mod devices;
pub mod error;
pub mod fuses;
pub mod junction_boxes;
pub mod panels;
pub mod response;
pub mod rooms;
pub mod rows;
pub mod sockets;
pub mod transfer;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::domain::presets;
use crate::store::PanelStore;

/// Shared handler state. The store is a single in-memory arena; writers
/// take the lock for the duration of one mutation.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<PanelStore>>,
}

impl AppState {
    pub fn new(store: PanelStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }
}

pub fn router(state: AppState, cfg: &Config) -> Router {
    let api = Router::new()
        .merge(rooms::router())
        .merge(panels::router())
        .merge(rows::router())
        .merge(fuses::router())
        .merge(sockets::router())
        .merge(junction_boxes::router())
        .merge(devices::router())
        .merge(transfer::router())
        .route("/presets", get(get_presets))
        .with_state(state);

    let mut router = Router::new()
        .nest("/api", api)
        .route("/healthz", get(healthz));

    if cfg.server.enable_cors {
        use tower_http::cors::{Any, CorsLayer};
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(10 * 1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

/// Static equipment tables consumed by the documentation UI.
pub async fn get_presets() -> impl IntoResponse {
    Json(serde_json::json!({
        "fuseTypes": presets::FUSE_TYPES,
        "curveTypes": presets::CURVE_TYPES,
        "commonAmperages": presets::COMMON_AMPERAGES,
        "spdVoltageRatings": presets::SPD_VOLTAGE_RATINGS,
        "spdSurgeCurrentRatings": presets::SPD_SURGE_CURRENT_RATINGS,
        "spdClasses": presets::SPD_CLASSES,
        "devicePresets": presets::DEVICE_PRESETS,
        "subPanelFeedOptions": presets::SUB_PANEL_FEED_OPTIONS,
    }))
}
