use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::llm::prompts::truncate_to_char_boundary;
use crate::models::{Answer, QueryRequest, QueryResponse, SourceRef};
use crate::state::AppState;

/// Characters of chunk text echoed back per source.
const SOURCE_PREVIEW_CHARS: usize = 200;

/// POST /query - Answer one question from the indexed documents
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(req) = payload.map_err(json_error)?;
    let answer = state.rag.query(&req.question).await?;
    Ok(Json(to_response(req.question, answer, req.return_sources)))
}

/// POST /batch-query - Answer up to ten questions, in order
pub async fn batch_query(
    State(state): State<AppState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<Json<Vec<QueryResponse>>, AppError> {
    let Json(questions) = payload.map_err(json_error)?;
    let answers = state.rag.batch_query(&questions).await?;
    Ok(Json(
        questions
            .into_iter()
            .zip(answers)
            .map(|(question, answer)| to_response(question, answer, true))
            .collect(),
    ))
}

fn to_response(question: String, answer: Answer, return_sources: bool) -> QueryResponse {
    let sources = return_sources.then(|| {
        answer
            .sources
            .iter()
            .map(|hit| SourceRef {
                content: preview(&hit.chunk.text),
                source: hit.chunk.source.clone(),
                chunk_id: hit.chunk.index,
                score: hit.score,
            })
            .collect()
    });

    QueryResponse {
        question,
        answer: answer.text,
        answer_available: answer.available,
        confidence: answer.confidence,
        num_sources: answer.sources.len(),
        sources,
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= SOURCE_PREVIEW_CHARS {
        text.to_string()
    } else {
        format!("{}...", truncate_to_char_boundary(text, SOURCE_PREVIEW_CHARS))
    }
}

fn json_error(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}
