use super::{Generator, RagError, Retriever, MAX_BATCH_QUESTIONS};
use crate::llm::prompts::{format_context, NOT_AVAILABLE_ANSWER};
use crate::models::{Answer, Confidence};

/// Question → retrieved context → generated, assessed answer.
#[derive(Clone)]
pub struct RagPipeline {
    retriever: Retriever,
    generator: Generator,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Generator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    pub async fn query(&self, question: &str) -> Result<Answer, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let hits = self.retriever.retrieve(question, None).await?;
        if hits.is_empty() {
            tracing::warn!("No chunks retrieved");
            return Ok(Answer {
                text: NOT_AVAILABLE_ANSWER.to_string(),
                available: false,
                confidence: Confidence::Low,
                sources: Vec::new(),
            });
        }

        let context = format_context(&hits);
        let assessment = self.generator.generate(question, &context).await?;

        Ok(Answer {
            text: assessment.answer,
            available: assessment.available,
            confidence: assessment.confidence,
            sources: hits,
        })
    }

    /// Answer up to [`MAX_BATCH_QUESTIONS`] questions one after another.
    pub async fn batch_query(&self, questions: &[String]) -> Result<Vec<Answer>, RagError> {
        if questions.is_empty() || questions.len() > MAX_BATCH_QUESTIONS {
            return Err(RagError::BatchSize(questions.len()));
        }

        tracing::info!("Processing batch of {} questions", questions.len());
        let mut answers = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            tracing::debug!("Batch question {}/{}", i + 1, questions.len());
            answers.push(self.query(question).await?);
        }
        Ok(answers)
    }
}
