//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway serves one preview page per request, the same session as JSON
//! for native viewers, and the client-side script bundle as static files.
//! Every route shares `AppState` and the same CORS and tracing layers.

pub mod preview;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full gateway router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let assets = ServeDir::new(&state.config.asset_dir);

    Router::new()
        .route("/", get(preview::preview_page))
        .route("/api/session", get(preview::session_json))
        .route("/healthz", get(healthz))
        .nest_service("/js", assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
