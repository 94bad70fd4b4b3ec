//! HTTP surface: JSON handlers and the router that mounts them.

pub mod documents;
pub mod query;
pub mod system;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router. The browser UI is served from another
/// origin, so CORS is permissive.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/stats", get(system::stats))
        .route("/upload", post(documents::upload))
        .route("/documents", get(documents::list_documents))
        .route("/documents/{filename}", delete(documents::delete_document))
        .route("/query", post(query::query))
        .route("/batch-query", post(query::batch_query))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
