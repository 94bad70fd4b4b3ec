//! Clients for the two hosted model boundaries, plus prompt construction.

pub mod completion;
pub mod embeddings;
pub mod prompts;

pub use completion::{CompletionModel, HttpCompletion};
pub use embeddings::{Embedder, HttpEmbedder};

/// Build an OpenAI-compatible endpoint URL. Accepts base URLs with or without
/// a version segment (`https://host`, `https://host/v1`) or with the full
/// resource path already present.
pub(crate) fn endpoint(base_url: &str, resource: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(&format!("/{resource}")) {
        return base.to_string();
    }
    if has_version_suffix(base) {
        return format!("{base}/{resource}");
    }
    format!("{base}/v1/{resource}")
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}
