use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{Metric, StoreError, VectorStore};
use crate::models::{Chunk, ScoredChunk, VectorRecord};

const INDEX_FILE: &str = "index.json";
const METADATA_FILE: &str = "metadata.json";

/// On-disk layout of the vector file. Row `i` of `vectors` belongs to entry
/// `i` of the metadata file.
#[derive(Deserialize)]
struct IndexFile {
    metric: Metric,
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    metric: Metric,
    dimension: Option<usize>,
    vectors: &'a [Vec<f32>],
}

struct Inner {
    metric: Metric,
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

/// Exact nearest-neighbour index: every query scans all vectors.
pub struct FlatIndex {
    inner: RwLock<Inner>,
    /// Held while the two files are written or read back, so each pair on
    /// disk comes from one snapshot.
    disk: Mutex<()>,
    dir: PathBuf,
}

impl FlatIndex {
    /// Open the index stored in `dir`, or start an empty one using `metric`.
    /// An existing index keeps the metric it was created with.
    pub fn open_or_create(dir: &Path, metric: Metric) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let index = Self {
            inner: RwLock::new(Inner {
                metric,
                dimension: None,
                vectors: Vec::new(),
                chunks: Vec::new(),
            }),
            disk: Mutex::new(()),
            dir: dir.to_path_buf(),
        };
        index.restore()?;

        let stored = index.metric();
        if stored != metric {
            tracing::warn!(
                "Existing index at {} uses the {stored} metric; ignoring configured {metric}",
                dir.display()
            );
        }
        Ok(index)
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupt {
            path: self.dir.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Write through a uniquely named temp file in `dir` and rename it over
/// `path`, so readers never see a partial file.
fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl VectorStore for FlatIndex {
    fn add(&self, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        // Validate the whole batch before touching state so a bad record
        // never leaves vectors and metadata out of step.
        let mut dimension = inner.dimension;
        for record in &records {
            let actual = record.embedding.len();
            if actual == 0 {
                return Err(StoreError::EmptyEmbedding);
            }
            match dimension {
                Some(expected) if expected != actual => {
                    return Err(StoreError::DimensionMismatch { expected, actual });
                }
                _ => dimension = Some(actual),
            }
        }

        inner.dimension = dimension;
        for record in records {
            inner.vectors.push(record.embedding);
            inner.chunks.push(record.chunk);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let inner = self.inner.read();
        if inner.vectors.is_empty() {
            return Err(StoreError::Empty);
        }
        if let Some(expected) = inner.dimension {
            if expected != query.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        let metric = inner.metric;
        let mut scored: Vec<(f32, usize)> = inner
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (metric.distance(query, v), i))
            .collect();

        // Ascending distance; ties keep insertion order
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| ScoredChunk {
                chunk: inner.chunks[i].clone(),
                distance,
                score: metric.similarity(distance),
            })
            .collect())
    }

    fn persist(&self) -> Result<(), StoreError> {
        let _disk = self.disk.lock();

        // Snapshot taken after the disk lock, so the last writer always
        // writes the newest state
        let (index, metadata, count) = {
            let inner = self.inner.read();
            let index = serde_json::to_vec(&IndexFileRef {
                metric: inner.metric,
                dimension: inner.dimension,
                vectors: &inner.vectors,
            })?;
            let metadata = serde_json::to_vec(&inner.chunks)?;
            (index, metadata, inner.vectors.len())
        };

        std::fs::create_dir_all(&self.dir)?;
        write_atomic(&self.dir, &self.index_path(), &index)?;
        write_atomic(&self.dir, &self.metadata_path(), &metadata)?;

        tracing::debug!("Persisted {count} vectors to {}", self.dir.display());
        Ok(())
    }

    fn restore(&self) -> Result<(), StoreError> {
        let _disk = self.disk.lock();
        let index_path = self.index_path();
        let metadata_path = self.metadata_path();

        match (index_path.exists(), metadata_path.exists()) {
            (false, false) => {
                let mut inner = self.inner.write();
                inner.dimension = None;
                inner.vectors.clear();
                inner.chunks.clear();
                return Ok(());
            }
            (true, false) => return Err(self.corrupt("metadata file is missing")),
            (false, true) => return Err(self.corrupt("index file is missing")),
            (true, true) => {}
        }

        let index: IndexFile = serde_json::from_slice(&std::fs::read(&index_path)?)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&std::fs::read(&metadata_path)?)?;

        if index.vectors.len() != chunks.len() {
            return Err(self.corrupt(format!(
                "{} vectors but {} metadata entries",
                index.vectors.len(),
                chunks.len()
            )));
        }
        if let Some(dim) = index.dimension {
            if index.vectors.iter().any(|v| v.len() != dim) {
                return Err(self.corrupt(format!("vector with dimension other than {dim}")));
            }
        } else if !index.vectors.is_empty() {
            return Err(self.corrupt("vectors present but no dimension recorded"));
        }

        tracing::info!(
            "Loaded {} vectors ({} metric) from {}",
            index.vectors.len(),
            index.metric,
            self.dir.display()
        );

        let mut inner = self.inner.write();
        inner.metric = index.metric;
        inner.dimension = index.dimension;
        inner.vectors = index.vectors;
        inner.chunks = chunks;
        Ok(())
    }

    fn remove_source(&self, source: &str) -> Result<usize, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.chunks.len();

        let Inner {
            vectors, chunks, ..
        } = &mut *inner;
        let keep: Vec<bool> = chunks.iter().map(|c| c.source != source).collect();
        let mut flags = keep.iter();
        vectors.retain(|_| *flags.next().unwrap_or(&true));
        let mut flags = keep.iter();
        chunks.retain(|_| *flags.next().unwrap_or(&true));

        Ok(before - inner.chunks.len())
    }

    fn remove_document(&self, document_id: Uuid) -> Result<usize, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.chunks.len();

        let Inner {
            vectors, chunks, ..
        } = &mut *inner;
        let keep: Vec<bool> = chunks.iter().map(|c| c.document_id != document_id).collect();
        let mut flags = keep.iter();
        vectors.retain(|_| *flags.next().unwrap_or(&true));
        let mut flags = keep.iter();
        chunks.retain(|_| *flags.next().unwrap_or(&true));

        Ok(before - inner.chunks.len())
    }

    fn len(&self) -> usize {
        self.inner.read().vectors.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    fn metric(&self) -> Metric {
        self.inner.read().metric
    }

    fn source_counts(&self) -> HashMap<String, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for c in inner.chunks.iter() {
            *counts.entry(c.source.clone()).or_insert(0) += 1;
        }
        counts
    }

    fn document_count(&self) -> usize {
        let inner = self.inner.read();
        inner
            .chunks
            .iter()
            .map(|c| c.document_id)
            .collect::<HashSet<_>>()
            .len()
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(source: &str, index: usize, text: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            chunk: Chunk {
                id: Uuid::new_v4(),
                document_id: Uuid::nil(),
                source: source.to_string(),
                index,
                start: 0,
                text: text.to_string(),
            },
            embedding,
        }
    }

    fn three_chunk_index(dir: &Path, metric: Metric) -> FlatIndex {
        let index = FlatIndex::open_or_create(dir, metric).unwrap();
        index
            .add(vec![
                record("a.pdf", 0, "server setup", vec![0.1, 0.2, 0.9]),
                record("a.pdf", 1, "database connection", vec![0.9, 0.1, 0.1]),
                record("b.pdf", 0, "http handler", vec![0.2, 0.8, 0.3]),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_search_before_ingestion_is_empty_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = FlatIndex::open_or_create(dir.path(), Metric::L2).unwrap();
        assert!(index.is_empty());
        assert!(matches!(index.search(&[1.0, 0.0], 3), Err(StoreError::Empty)));
    }

    #[test]
    fn test_search_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        for metric in [Metric::L2, Metric::Cosine] {
            let index = three_chunk_index(&dir.path().join(metric.to_string()), metric);
            let hits = index.search(&[0.95, 0.05, 0.05], 3).unwrap();
            assert_eq!(hits[0].chunk.text, "database connection");
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
            assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let dir = tempfile::tempdir().unwrap();
        let index = three_chunk_index(dir.path(), Metric::L2);
        assert_eq!(index.search(&[0.0, 0.0, 1.0], 4).unwrap().len(), 3);
        assert_eq!(index.search(&[0.0, 0.0, 1.0], 2).unwrap().len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let index = three_chunk_index(dir.path(), Metric::L2);

        let err = index
            .add(vec![
                record("c.pdf", 0, "ok", vec![1.0, 1.0, 1.0]),
                record("c.pdf", 1, "bad", vec![1.0, 1.0]),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(index.len(), 3);

        assert!(matches!(
            index.search(&[1.0], 1),
            Err(StoreError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.add(vec![record("c.pdf", 0, "empty", vec![])]),
            Err(StoreError::EmptyEmbedding)
        ));
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let query = [0.3, 0.6, 0.4];

        let before = {
            let index = three_chunk_index(dir.path(), Metric::Cosine);
            index.persist().unwrap();
            index.search(&query, 3).unwrap()
        };

        // Configured metric is ignored for an existing index
        let reopened = FlatIndex::open_or_create(dir.path(), Metric::L2).unwrap();
        assert_eq!(reopened.metric(), Metric::Cosine);
        assert_eq!(reopened.dimension(), Some(3));
        let after = reopened.search(&query, 3).unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.chunk, a.chunk);
            assert_eq!(b.distance, a.distance);
        }
    }

    #[test]
    fn test_restore_discards_unpersisted_records() {
        let dir = tempfile::tempdir().unwrap();
        let index = three_chunk_index(dir.path(), Metric::L2);
        index.persist().unwrap();
        index
            .add(vec![record("c.pdf", 0, "late", vec![0.0, 0.0, 0.0])])
            .unwrap();
        assert_eq!(index.len(), 4);
        index.restore().unwrap();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_desynced_files_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        three_chunk_index(dir.path(), Metric::L2).persist().unwrap();

        // Drop one metadata entry behind the index's back
        let meta_path = dir.path().join(METADATA_FILE);
        let mut chunks: Vec<Chunk> =
            serde_json::from_slice(&std::fs::read(&meta_path).unwrap()).unwrap();
        chunks.pop();
        std::fs::write(&meta_path, serde_json::to_vec(&chunks).unwrap()).unwrap();

        let err = FlatIndex::open_or_create(dir.path(), Metric::L2)
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        std::fs::remove_file(&meta_path).unwrap();
        assert!(matches!(
            FlatIndex::open_or_create(dir.path(), Metric::L2),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_remove_source_keeps_vectors_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let index = three_chunk_index(dir.path(), Metric::L2);

        assert_eq!(index.remove_source("a.pdf").unwrap(), 2);
        assert_eq!(index.len(), 1);
        let hits = index.search(&[0.2, 0.8, 0.3], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "b.pdf");
        assert_eq!(hits[0].distance, 0.0);

        assert_eq!(index.remove_source("missing.pdf").unwrap(), 0);
    }

    #[test]
    fn test_source_and_document_counts() {
        let dir = tempfile::tempdir().unwrap();
        let index = three_chunk_index(dir.path(), Metric::L2);
        let counts = index.source_counts();
        assert_eq!(counts.get("a.pdf"), Some(&2));
        assert_eq!(counts.get("b.pdf"), Some(&1));
        // All test records share the nil document id
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn test_remove_document_drops_one_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let index = three_chunk_index(dir.path(), Metric::L2);
        let mut late = record("a.pdf", 0, "again", vec![0.5, 0.5, 0.5]);
        let id = Uuid::new_v4();
        late.chunk.document_id = id;
        index.add(vec![late]).unwrap();

        assert_eq!(index.remove_document(id).unwrap(), 1);
        assert_eq!(index.len(), 3);
        assert_eq!(index.source_counts().get("a.pdf"), Some(&2));
        assert_eq!(index.remove_document(id).unwrap(), 0);
    }

    #[test]
    fn test_concurrent_persists_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(three_chunk_index(dir.path(), Metric::L2));
        let bulk: Vec<VectorRecord> = (0..500)
            .map(|i| record("bulk.pdf", i, "bulk", vec![i as f32, 1.0, 0.0]))
            .collect();
        index.add(bulk).unwrap();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let index = index.clone();
                scope.spawn(move || {
                    for round in 0..20 {
                        if round % 5 == 0 {
                            index
                                .add(vec![record("t.pdf", t, "extra", vec![0.0, 0.0, 1.0])])
                                .unwrap();
                        }
                        index.persist().unwrap();
                    }
                });
            }
        });

        let reopened = FlatIndex::open_or_create(dir.path(), Metric::L2).unwrap();
        assert_eq!(reopened.len(), index.len());
        assert_eq!(reopened.len(), 3 + 500 + 8 * 4);

        // No temp files left behind
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {names:?}");
    }
}
