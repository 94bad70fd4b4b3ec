use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded span of document text, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: Uuid,
    /// Identifies one ingestion of one file; re-uploading yields a new id.
    pub document_id: Uuid,
    /// Sanitised filename the chunk came from
    pub source: String,
    /// Position of the chunk within its document
    pub index: usize,
    /// Character offset of the chunk in the cleaned document text
    pub start: usize,
    pub text: String,
}

/// An embedding together with the chunk it was computed from.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A retrieved chunk with its distance to the query and a derived similarity.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub available: bool,
    pub confidence: Confidence,
    pub sources: Vec<ScoredChunk>,
}

/// Outcome of ingesting one uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document: String,
    pub document_id: Uuid,
    pub chunks_created: usize,
    pub total_characters: usize,
}

/// A file a directory sweep could not ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub document: String,
    pub error: String,
}

/// Outcome of ingesting a whole directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryReport {
    pub ingested: Vec<IngestReport>,
    /// Sources already present in the index
    pub skipped: Vec<String>,
    pub failed: Vec<IngestFailure>,
}

// ─── HTTP request / response types ───────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default = "default_true")]
    pub return_sources: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
    pub answer_available: bool,
    pub confidence: Confidence,
    pub num_sources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
}

/// Source reference returned alongside an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Preview of the chunk text
    pub content: String,
    pub source: String,
    pub chunk_id: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub filename: String,
    pub details: UploadDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDetails {
    pub document_id: Uuid,
    pub chunks_created: usize,
    pub total_characters: usize,
    pub file_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub vector_store_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub vector_store_stats: VectorStoreStats,
    pub config: ConfigSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreStats {
    pub status: String,
    pub total_vectors: usize,
    pub total_documents: usize,
    pub dimension: Option<usize>,
    pub metric: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_model: String,
    pub llm_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Chunks currently indexed for this file
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentList {
    pub total_documents: usize,
    pub documents: Vec<DocumentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub message: String,
    pub chunks_removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_serializes_to_snake_case() {
        assert_eq!(serde_json::to_value(Confidence::High).unwrap(), "high");
        assert_eq!(serde_json::to_value(Confidence::Low).unwrap(), "low");
    }

    #[test]
    fn test_query_request_defaults_return_sources() {
        let req: QueryRequest = serde_json::from_str(r#"{"question":"why?"}"#).unwrap();
        assert!(req.return_sources);

        let req: QueryRequest =
            serde_json::from_str(r#"{"question":"why?","return_sources":false}"#).unwrap();
        assert!(!req.return_sources);
    }

    #[test]
    fn test_query_response_omits_absent_sources() {
        let resp = QueryResponse {
            question: "q".into(),
            answer: "a".into(),
            answer_available: true,
            confidence: Confidence::High,
            num_sources: 2,
            sources: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("sources").is_none());
        assert_eq!(json["confidence"], "high");
    }
}
