//! In-process stand-ins for the hosted model endpoints, shared by unit tests.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::llm::{CompletionModel, Embedder};
use crate::models::{Chunk, VectorRecord};
use crate::store::{FlatIndex, Metric, VectorStore};

const VOCABULARY: &[&str] = &["pelican", "launch", "budget", "million", "holiday", "days"];

/// Embeds text as keyword counts over a tiny vocabulary, plus a constant
/// component so no vector is all zeros.
pub struct KeywordEmbedder;

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect();
    v.push(1.0);
    v
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding endpoint unreachable")
    }
}

/// Always replies with the same text and records every prompt it receives.
pub struct StaticCompletion {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl StaticCompletion {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionModel for StaticCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub struct FailingCompletion;

#[async_trait]
impl CompletionModel for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("completion endpoint returned 503")
    }
}

/// A three-chunk index from one source, `seed.txt`.
pub async fn seeded_store(dir: &Path) -> Arc<dyn VectorStore> {
    let store = FlatIndex::open_or_create(dir, Metric::L2).unwrap();
    let document_id = Uuid::new_v4();
    let texts = [
        "The pelican launch code is 42.",
        "The budget for next year is ten million.",
        "Holidays are 25 days per year.",
    ];
    let records = texts
        .iter()
        .enumerate()
        .map(|(index, text)| VectorRecord {
            chunk: Chunk {
                id: Uuid::new_v4(),
                document_id,
                source: "seed.txt".to_string(),
                index,
                start: 0,
                text: text.to_string(),
            },
            embedding: keyword_vector(text),
        })
        .collect();
    store.add(records).unwrap();
    Arc::new(store)
}
