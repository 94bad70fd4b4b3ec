use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::RagError;
use crate::chunking::Chunker;
use crate::document::{self, sanitize_filename, DocumentKind};
use crate::llm::Embedder;
use crate::models::{Chunk, DirectoryReport, IngestFailure, IngestReport, VectorRecord};
use crate::store::VectorStore;

/// Upload → text → chunks → embeddings → persisted index.
#[derive(Clone)]
pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// Ingest one uploaded file. `source` should already be sanitised. Each
    /// call creates an independent chunk set, even for identical content.
    pub async fn ingest(&self, source: &str, bytes: Vec<u8>) -> Result<IngestReport, RagError> {
        let kind = DocumentKind::from_filename(source)?;
        tracing::info!("Starting ingestion of {source} ({} bytes)", bytes.len());

        let raw = document::extract_text(kind, bytes).await?;
        let text = document::clean_text(&raw);
        let total_characters = text.chars().count();
        tracing::info!("Extracted {total_characters} characters from {source}");

        let document_id = Uuid::new_v4();
        let chunks = self.chunk(&text, source, document_id);
        if chunks.is_empty() {
            return Err(RagError::NoChunks);
        }
        tracing::info!(
            "Created {} chunks (size={}, overlap={})",
            chunks.len(),
            self.chunker.size(),
            self.chunker.overlap()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(RagError::Embedding)?;

        let chunks_created = chunks.len();
        let records = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorRecord { chunk, embedding })
            .collect();

        self.store.add(records)?;
        if let Err(e) = self.store.persist() {
            tracing::error!("Persisting {source} failed, rolling back document {document_id}: {e}");
            if let Err(undo) = self.store.remove_document(document_id) {
                tracing::error!("Rollback of document {document_id} failed: {undo}");
            }
            return Err(e.into());
        }

        tracing::info!("Ingested {source}: {chunks_created} chunks, document {document_id}");
        Ok(IngestReport {
            document: source.to_string(),
            document_id,
            chunks_created,
            total_characters,
        })
    }

    /// Ingest every `.pdf`, `.txt` and `.md` file directly inside `dir`, in
    /// name order. Files whose source is already indexed are skipped; a
    /// failing file is recorded and the sweep moves on.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<DirectoryReport, RagError> {
        tracing::info!("Ingesting documents from directory: {}", dir.display());

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || DocumentKind::from_filename(&name).is_err() {
                tracing::debug!("Skipping {name}: not a supported document");
                continue;
            }
            files.push((name, entry.path()));
        }
        files.sort();

        let mut report = DirectoryReport::default();
        if files.is_empty() {
            tracing::warn!("No supported documents found in {}", dir.display());
            return Ok(report);
        }

        let indexed = self.store.source_counts();
        for (name, path) in files {
            let source = sanitize_filename(&name);
            if indexed.contains_key(&source) {
                tracing::info!("Skipping {source}: already indexed");
                report.skipped.push(source);
                continue;
            }

            let result = match tokio::fs::read(&path).await {
                Ok(bytes) => self.ingest(&source, bytes).await,
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(ingested) => report.ingested.push(ingested),
                Err(e) => {
                    tracing::error!("Ingestion failed for {}: {e}", path.display());
                    report.failed.push(IngestFailure {
                        document: source,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Directory ingestion complete: {}/{} successful, {} skipped",
            report.ingested.len(),
            report.ingested.len() + report.failed.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn chunk(&self, text: &str, source: &str, document_id: Uuid) -> Vec<Chunk> {
        self.chunker
            .chunks(text)
            .filter(|span| !span.text.trim().is_empty())
            .enumerate()
            .map(|(index, span)| Chunk {
                id: Uuid::new_v4(),
                document_id,
                source: source.to_string(),
                index,
                start: span.start,
                text: span.text.to_string(),
            })
            .collect()
    }
}
