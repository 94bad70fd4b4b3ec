//! Vector store capability and its flat on-disk backend.

pub mod flat;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{ScoredChunk, VectorRecord};

pub use flat::FlatIndex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing has been ingested yet.
    #[error("vector store is empty: no documents have been ingested")]
    Empty,

    #[error("embedding dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot add an empty embedding")]
    EmptyEmbedding,

    #[error("vector store at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("vector store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector store serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Distance metric, fixed for the lifetime of an index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// `1 - cosine similarity`
    Cosine,
}

impl Metric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }

    /// Map a distance to a similarity in `[0, 1]` where higher is closer.
    /// Cosine distance spans `[0, 2]`, so opposite vectors score 0.
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            Metric::L2 => 1.0 / (1.0 + distance),
            Metric::Cosine => ((2.0 - distance) / 2.0).clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::L2 => f.write_str("l2"),
            Metric::Cosine => f.write_str("cosine"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Metric::L2),
            "cosine" => Ok(Metric::Cosine),
            other => Err(format!("unknown distance metric {other:?}, expected l2 or cosine")),
        }
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Storage for embeddings and their chunk metadata.
///
/// Implementations keep vectors and metadata in lockstep: every vector has
/// exactly one metadata entry, in memory and on disk.
pub trait VectorStore: Send + Sync {
    /// Append records. All embeddings must share the index dimension.
    fn add(&self, records: Vec<VectorRecord>) -> Result<(), StoreError>;

    /// The `k` nearest records, closest first. Returns fewer than `k` when the
    /// index holds fewer, and [`StoreError::Empty`] when it holds none.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Write vectors and metadata to disk together.
    fn persist(&self) -> Result<(), StoreError>;

    /// Replace in-memory state with what is on disk.
    fn restore(&self) -> Result<(), StoreError>;

    /// Drop every record ingested from `source`, returning how many went.
    fn remove_source(&self, source: &str) -> Result<usize, StoreError>;

    /// Drop every record from one ingestion. Used to undo an `add` whose
    /// `persist` failed.
    fn remove_document(&self, document_id: Uuid) -> Result<usize, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dimension(&self) -> Option<usize>;

    fn metric(&self) -> Metric;

    /// Chunk counts grouped by source filename.
    fn source_counts(&self) -> HashMap<String, usize>;

    /// Number of distinct ingestions held.
    fn document_count(&self) -> usize;

    /// Human-readable location, for stats.
    fn location(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_distance() {
        assert_eq!(Metric::L2.distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(Metric::L2.distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_cosine_distance() {
        let d = Metric::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-6);
        let d = Metric::Cosine.distance(&[1.0, 1.0], &[2.0, 2.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_similarity_is_monotonic() {
        for metric in [Metric::L2, Metric::Cosine] {
            assert!(metric.similarity(0.1) > metric.similarity(0.5));
        }
        assert_eq!(Metric::L2.similarity(0.0), 1.0);
    }

    #[test]
    fn test_cosine_similarity_stays_in_unit_range() {
        let metric = Metric::Cosine;
        let opposite = metric.distance(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((opposite - 2.0).abs() < 1e-6);
        assert!(metric.similarity(opposite).abs() < 1e-6);

        let same = metric.distance(&[2.0, 3.0], &[4.0, 6.0]);
        assert!((metric.similarity(same) - 1.0).abs() < 1e-6);

        let orthogonal = metric.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((metric.similarity(orthogonal) - 0.5).abs() < 1e-6);

        for d in [0.0, 0.3, 1.0, 1.7, 2.0] {
            let s = metric.similarity(d);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn test_metric_parse_and_display() {
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::L2);
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert!("manhattan".parse::<Metric>().is_err());
        assert_eq!(Metric::Cosine.to_string(), "cosine");
    }
}
