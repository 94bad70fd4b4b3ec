//! Ingestion and question-answering pipelines.

pub mod generator;
pub mod ingest;
pub mod pipeline;
pub mod retriever;

pub use generator::Generator;
pub use ingest::IngestionPipeline;
pub use pipeline::RagPipeline;
pub use retriever::Retriever;

use crate::document::DocumentError;
use crate::store::StoreError;

/// Most questions a single batch request may carry.
pub const MAX_BATCH_QUESTIONS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("no documents have been ingested yet; upload a document first")]
    NoDocuments,

    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("batch must contain between 1 and {MAX_BATCH_QUESTIONS} questions, got {0}")]
    BatchSize(usize),

    #[error("document produced no chunks")]
    NoChunks,

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("embedding request failed: {0:#}")]
    Embedding(#[source] anyhow::Error),

    #[error("completion request failed: {0:#}")]
    Generation(#[source] anyhow::Error),

    #[error(transparent)]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for RagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Empty => RagError::NoDocuments,
            other => RagError::Store(other),
        }
    }
}
