use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::models::{ConfigSummary, HealthResponse, StatsResponse, VectorStoreStats};
use crate::state::AppState;

/// GET / - Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Document Q&A API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

/// GET /health - "healthy" once a persisted index exists, "degraded" before
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let vector_store_exists = state.config.index_path().exists();
    let (status, message) = if vector_store_exists {
        ("healthy", "API is running. Vector store is available.")
    } else {
        (
            "degraded",
            "API is running. Vector store not found - upload documents to enable Q&A.",
        )
    };

    Json(HealthResponse {
        status: status.to_string(),
        message: message.to_string(),
        vector_store_exists,
    })
}

/// GET /stats - Index size and the effective retrieval settings
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = &state.store;
    let config = &state.config;
    let status = if store.is_empty() {
        "not_initialized"
    } else {
        "ready"
    };

    Json(StatsResponse {
        vector_store_stats: VectorStoreStats {
            status: status.to_string(),
            total_vectors: store.len(),
            total_documents: store.document_count(),
            dimension: store.dimension(),
            metric: store.metric().to_string(),
            path: store.location(),
        },
        config: ConfigSummary {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            top_k: config.top_k,
            embedding_model: config.llm.embedding_model.clone(),
            llm_model: config.llm.chat_model.clone(),
        },
    })
}
