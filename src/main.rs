use std::path::Path;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use doc_qa::api;
use doc_qa::config::{self, Config};
use doc_qa::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = config::load_env_file(Path::new(".env"));
    let config = Config::from_env().context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Some(path) = env_file {
        tracing::info!("Loaded environment from {}", path.display());
    }
    tracing::info!("Vector store: {}", config.vector_store_path.display());
    tracing::info!("Raw documents: {}", config.raw_docs_path.display());
    tracing::info!(
        "LLM provider: {} ({}), embeddings: {}, chat: {}",
        config.llm.provider,
        config.llm.base_url,
        config.llm.embedding_model,
        config.llm.chat_model
    );

    let bind_addr = config.bind_addr.clone();
    let ingest_dir = config.ingest_dir.clone();
    let state = AppState::new(config).context("Failed to initialise application state")?;

    if let Some(dir) = ingest_dir {
        tracing::info!("Ingesting documents from {}", dir.display());
        let report = state
            .ingestion
            .ingest_directory(&dir)
            .await
            .with_context(|| format!("Failed to ingest {}", dir.display()))?;
        for failure in &report.failed {
            tracing::warn!("Skipped {}: {}", failure.document, failure.error);
        }
    }

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
