//! # doc-qa
//!
//! A question-answering web service over uploaded documents. PDFs (and plain
//! text) are split into overlapping chunks, embedded through a hosted
//! embedding endpoint, and kept in a persisted flat vector index. Questions
//! are answered by retrieving the nearest chunks and asking a chat model to
//! answer strictly from them.
//!
//! ## Architecture
//!
//! ```text
//!   POST /upload                         POST /query
//!        │                                    │
//!        ▼                                    ▼
//!  ┌─────────────┐                    ┌──────────────┐
//!  │  document   │ text extraction    │  Retriever   │ embed question
//!  └──────┬──────┘                    └──────┬───────┘
//!         ▼                                  │ top-K nearest
//!  ┌─────────────┐                           ▼
//!  │  Chunker    │ size / overlap     ┌──────────────┐
//!  └──────┬──────┘                    │ VectorStore  │◄────────┐
//!         ▼                           └──────┬───────┘         │
//!  ┌─────────────┐                           ▼                 │
//!  │  Embedder   │───────────────────►┌──────────────┐         │
//!  └──────┬──────┘   add + persist    │  Generator   │ RAG     │
//!         └──────────────────────────►└──────┬───────┘ prompt  │
//!                                            ▼                 │
//!                                     answer + sources   index.json
//!                                                        metadata.json
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, storage, chunking and LLM settings
//! - [`models`] - Shared data types: `Chunk`, `ScoredChunk`, `Answer`, request/response types
//! - [`document`] - Upload validation, PDF/text extraction and filename sanitising
//! - [`chunking`] - Fixed-size overlapping character windows
//! - [`store`] - `VectorStore` capability and the persisted flat index
//! - [`llm`] - Embedding and chat-completion clients, RAG prompt construction
//! - [`rag`] - Retriever, generator, ingestion and query pipelines
//! - [`api`] - Axum HTTP handlers and router
//! - [`error`] - HTTP error type
//! - [`state`] - Shared application state

pub mod api;
pub mod chunking;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod models;
pub mod rag;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
