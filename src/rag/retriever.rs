use std::sync::Arc;

use super::RagError;
use crate::llm::Embedder;
use crate::models::ScoredChunk;
use crate::store::VectorStore;

/// Embeds a question and looks up its nearest chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top-K chunks for `question`, closest first. `top_k` overrides the
    /// configured count for this call.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        // Checked up front so an empty index never costs an embedding call
        if self.store.is_empty() {
            return Err(RagError::NoDocuments);
        }

        let k = top_k.unwrap_or(self.top_k);
        tracing::info!("Retrieving top {k} chunks for: {}", preview(question));

        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(RagError::Embedding)?;
        let hits = self.store.search(&query_embedding, k)?;

        tracing::info!("Retrieved {} chunks", hits.len());
        for (i, hit) in hits.iter().enumerate() {
            tracing::debug!(
                "Hit {}: {} (chunk {}, distance {:.4})",
                i + 1,
                hit.chunk.source,
                hit.chunk.index,
                hit.distance
            );
        }
        Ok(hits)
    }
}

pub(crate) fn preview(text: &str) -> String {
    crate::llm::prompts::truncate_to_char_boundary(text, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seeded_store, KeywordEmbedder};

    #[tokio::test]
    async fn test_retrieve_ranks_matching_chunk_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path()).await;
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), store, 2);

        let hits = retriever
            .retrieve("what about the pelican?", None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].chunk.text.contains("pelican"));
    }

    #[tokio::test]
    async fn test_retrieve_top_k_override() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path()).await;
        let retriever = Retriever::new(Arc::new(KeywordEmbedder), store, 1);

        let hits = retriever.retrieve("anything", Some(10)).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            crate::store::FlatIndex::open_or_create(dir.path(), crate::store::Metric::L2)
                .unwrap(),
        );
        let retriever = Retriever::new(Arc::new(crate::testing::FailingEmbedder), store, 4);

        // The failing embedder proves no upstream call was made
        assert!(matches!(
            retriever.retrieve("hello", None).await,
            Err(RagError::NoDocuments)
        ));
    }
}
