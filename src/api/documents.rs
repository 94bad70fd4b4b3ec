use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use crate::document::{sanitize_filename, DocumentKind};
use crate::error::AppError;
use crate::models::{DeleteResponse, DocumentInfo, DocumentList, UploadDetails, UploadResponse};
use crate::rag::RagError;
use crate::state::AppState;

/// POST /upload - Ingest the multipart `file` field, then keep the original.
/// A rejected upload never touches a previously stored file of the same name.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".to_string()))?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, bytes));
        break;
    }

    let (original_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided in field 'file'".to_string()))?;

    let filename = sanitize_filename(&original_name);
    DocumentKind::from_filename(&filename).map_err(RagError::from)?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    let file_size_bytes = bytes.len();
    let report = state
        .ingestion
        .ingest(&filename, bytes.to_vec())
        .await
        .inspect_err(|e| tracing::error!("Ingestion of {filename} failed: {e}"))?;

    let file_path = state.config.raw_docs_path.join(&filename);
    let saved = save_original(state.config.raw_docs_path.clone(), file_path.clone(), bytes).await;
    if let Err(e) = saved {
        tracing::error!("Saving {} failed, removing its vectors: {e}", file_path.display());
        state.store.remove_document(report.document_id)?;
        state.store.persist()?;
        return Err(e);
    }
    tracing::info!("Uploaded file saved: {}", file_path.display());

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        message: format!(
            "Document ingested successfully: {} chunks created",
            report.chunks_created
        ),
        filename,
        details: UploadDetails {
            document_id: report.document_id,
            chunks_created: report.chunks_created,
            total_characters: report.total_characters,
            file_size_bytes,
        },
    }))
}

/// GET /documents - Uploaded files merged with their indexed chunk counts
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentList>, AppError> {
    let mut counts = state.store.source_counts();
    let mut documents: BTreeMap<String, DocumentInfo> = BTreeMap::new();

    let mut entries = tokio::fs::read_dir(&state.config.raw_docs_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        // Uploads being staged; stored names never start with a dot
        if filename.starts_with('.') {
            continue;
        }
        let uploaded_at = metadata.modified().ok().map(DateTime::<Utc>::from);
        let chunks = counts.remove(&filename).unwrap_or(0);
        documents.insert(
            filename.clone(),
            DocumentInfo {
                filename,
                size_bytes: metadata.len(),
                uploaded_at,
                chunks,
            },
        );
    }

    // Indexed sources whose original is no longer on disk
    for (filename, chunks) in counts {
        documents.insert(
            filename.clone(),
            DocumentInfo {
                filename,
                size_bytes: 0,
                uploaded_at: None,
                chunks,
            },
        );
    }

    let documents: Vec<DocumentInfo> = documents.into_values().collect();
    Ok(Json(DocumentList {
        total_documents: documents.len(),
        documents,
    }))
}

/// DELETE /documents/{filename} - Remove the stored file and its vectors
pub async fn delete_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let filename = sanitize_filename(&filename);
    let file_path = state.config.raw_docs_path.join(&filename);

    let on_disk = tokio::fs::try_exists(&file_path).await.unwrap_or(false);
    let indexed = state.store.source_counts().contains_key(&filename);
    if !on_disk && !indexed {
        return Err(AppError::NotFound(format!("Document not found: {filename}")));
    }

    let chunks_removed = state.store.remove_source(&filename)?;
    if chunks_removed > 0 {
        if let Err(e) = state.store.persist() {
            tracing::error!("Persisting removal of {filename} failed, reloading index: {e}");
            if let Err(reload) = state.store.restore() {
                tracing::error!("Reloading index failed: {reload}");
            }
            return Err(e.into());
        }
    }
    if on_disk {
        tokio::fs::remove_file(&file_path).await?;
    }
    tracing::info!("Deleted document {filename} ({chunks_removed} chunks removed)");

    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        message: format!("Document deleted: {filename}"),
        chunks_removed,
    }))
}

/// Write `bytes` to `path` through a temp file in `dir`.
async fn save_original(dir: PathBuf, path: PathBuf, bytes: Bytes) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Internal(format!("saving upload failed: {e}")))??;
    Ok(())
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}
