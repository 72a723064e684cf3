pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ingestion::validator::MAX_FILE_BYTES;
use crate::jobs::handlers;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/cv/upload",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/cv/process", post(handlers::handle_process))
        .route("/api/v1/cv/analysis", get(handlers::handle_get_analysis))
        .route("/api/v1/cv/sweep", post(handlers::handle_sweep))
        .with_state(state)
}
