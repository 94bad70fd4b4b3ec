use std::sync::Arc;

use super::retriever::preview;
use super::RagError;
use crate::llm::prompts::render_rag_prompt;
use crate::llm::CompletionModel;
use crate::models::Confidence;

/// Phrases that mean the model found no answer in the context. Matched
/// case-insensitively against the whitespace-normalised reply.
const NOT_AVAILABLE_PHRASES: &[&str] = &[
    "answer not available in the document",
    "not found in the context",
    "information is not available",
    "cannot be answered from the context",
    "not mentioned in the context",
    "no relevant information",
];

/// Replies this short carry too little to count as confident.
const MIN_CONFIDENT_LEN: usize = 10;

/// A model reply plus the verdict on whether it actually answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub answer: String,
    pub available: bool,
    pub confidence: Confidence,
}

/// Decide whether `reply` answers the question or reports that the context
/// had nothing relevant.
pub fn assess_answer(reply: &str) -> Assessment {
    let answer = reply.trim().to_string();
    let normalised = answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let available =
        !normalised.is_empty() && !NOT_AVAILABLE_PHRASES.iter().any(|p| normalised.contains(p));
    let confidence = if available && answer.chars().count() > MIN_CONFIDENT_LEN {
        Confidence::High
    } else {
        Confidence::Low
    };

    Assessment {
        answer,
        available,
        confidence,
    }
}

/// Turns a question and its formatted context into an assessed answer.
#[derive(Clone)]
pub struct Generator {
    model: Arc<dyn CompletionModel>,
}

impl Generator {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// One completion request with the RAG template; no retries.
    pub async fn generate(&self, question: &str, context: &str) -> Result<Assessment, RagError> {
        tracing::info!("Generating answer for: {}", preview(question));

        let prompt = render_rag_prompt(context, question);
        let reply = self
            .model
            .complete(&prompt)
            .await
            .map_err(RagError::Generation)?;

        let assessment = assess_answer(&reply);
        tracing::info!(
            "Generated answer (available: {}): {}",
            assessment.available,
            preview(&assessment.answer)
        );
        Ok(assessment)
    }
}
