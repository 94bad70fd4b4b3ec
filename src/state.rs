use std::sync::Arc;
use std::time::Duration;

use crate::chunking::Chunker;
use crate::config::Config;
use crate::llm::{CompletionModel, Embedder, HttpCompletion, HttpEmbedder};
use crate::rag::{Generator, IngestionPipeline, RagPipeline, Retriever};
use crate::store::{FlatIndex, VectorStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn VectorStore>,
    pub ingestion: IngestionPipeline,
    pub rag: RagPipeline,
}

impl AppState {
    /// Create data directories, restore the persisted index and wire the
    /// HTTP model clients.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.vector_store_path)?;
        std::fs::create_dir_all(&config.raw_docs_path)?;

        let store = FlatIndex::open_or_create(&config.vector_store_path, config.metric)?;
        tracing::info!(
            "Vector store at {} holds {} vectors",
            config.vector_store_path.display(),
            store.len()
        );

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        let embedder = Arc::new(HttpEmbedder::new(http_client.clone(), config.llm.clone()));
        let completion = Arc::new(HttpCompletion::new(http_client, config.llm.clone()));

        Self::with_components(config, Arc::new(store), embedder, completion)
    }

    /// Assemble state around caller-supplied store and model clients.
    pub fn with_components(
        config: Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionModel>,
    ) -> anyhow::Result<Self> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let ingestion = IngestionPipeline::new(chunker, embedder.clone(), store.clone());
        let rag = RagPipeline::new(
            Retriever::new(embedder, store.clone(), config.top_k),
            Generator::new(completion),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            ingestion,
            rag,
        })
    }
}
