//! Uploaded-file validation and text extraction.

use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported file type for {filename:?}: only PDF, .txt and .md files are accepted")]
    UnsupportedType { filename: String },

    #[error("uploaded file is empty")]
    EmptyFile,

    #[error("file does not look like a PDF")]
    NotPdf,

    #[error("text file is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to extract text: {0}")]
    Extraction(String),

    #[error("no extractable text found (the document may be image-based or encrypted)")]
    NoText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Result<Self, DocumentError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("txt") | Some("md") => Ok(Self::Text),
            _ => Err(DocumentError::UnsupportedType {
                filename: filename.to_string(),
            }),
        }
    }
}

/// Extract raw text from an uploaded file.
pub async fn extract_text(kind: DocumentKind, bytes: Vec<u8>) -> Result<String, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::EmptyFile);
    }

    let text = match kind {
        DocumentKind::Pdf => {
            if !bytes.starts_with(PDF_MAGIC) {
                return Err(DocumentError::NotPdf);
            }
            // pdf-extract is CPU-bound and panics on some malformed files;
            // a panic surfaces here as a JoinError.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| DocumentError::Extraction(format!("extractor crashed: {e}")))?
                .map_err(|e| DocumentError::Extraction(e.to_string()))?
        }
        DocumentKind::Text => String::from_utf8(bytes).map_err(|_| DocumentError::InvalidUtf8)?,
    };

    if text.trim().is_empty() {
        return Err(DocumentError::NoText);
    }
    Ok(text)
}

/// Normalise extracted text for embedding: drop stand-alone page numbers and
/// collapse every whitespace run to one space.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .filter(|line| !is_page_number(line))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lines like `12`, `- 12 -` or `-12-`.
fn is_page_number(line: &str) -> bool {
    let core = line.trim().trim_matches('-').trim();
    !core.is_empty() && core.chars().all(|c| c.is_ascii_digit())
}

/// Make an uploaded filename safe to use as a path component.
pub fn sanitize_filename(filename: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let replaced: String = filename
        .chars()
        .map(|c| {
            if INVALID.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "unnamed_document".to_string()
    } else {
        trimmed.to_string()
    }
}
