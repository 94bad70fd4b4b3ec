use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::store::Metric;

/// Errors raised while loading or validating configuration. All of them are
/// fatal at start-up.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size}), and size must be non-zero")]
    InvalidChunking { size: usize, overlap: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Directory holding the persisted vector index and its metadata
    pub vector_store_path: PathBuf,
    /// Directory where uploaded originals are kept
    pub raw_docs_path: PathBuf,
    /// Directory swept for documents at start-up
    pub ingest_dir: Option<PathBuf>,
    /// Chunk window length in characters
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Distance metric used when a new index is created
    pub metric: Metric,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Embedding and completion provider configuration
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" (any OpenAI-compatible endpoint) or "ollama"
    pub provider: String,
    /// Base URL for the provider API
    pub base_url: String,
    /// API key (required for OpenAI-compatible providers)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model name for embeddings
    pub embedding_model: String,
    /// Model name for answer generation
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            vector_store_path: PathBuf::from("./data/vector_store"),
            raw_docs_path: PathBuf::from("./data/raw_docs"),
            ingest_dir: None,
            chunk_size: 1200,
            chunk_overlap: 300,
            top_k: 4,
            metric: Metric::L2,
            max_upload_bytes: 50 * 1024 * 1024,
            log_level: "info".to_string(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://integrate.api.nvidia.com/v1".to_string(),
            api_key: None,
            embedding_model: "nvidia/nv-embed-v1".to_string(),
            chat_model: "meta/llama-3.1-8b-instruct".to_string(),
            temperature: 0.0,
            max_tokens: 512,
        }
    }
}

impl Config {
    /// Load configuration from the process environment. Call
    /// [`load_env_file`] first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source, then validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("DOC_QA_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(dir) = lookup("DOC_QA_VECTOR_STORE_PATH") {
            config.vector_store_path = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOC_QA_RAW_DOCS_PATH") {
            config.raw_docs_path = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOC_QA_INGEST_DIR").filter(|d| !d.trim().is_empty()) {
            config.ingest_dir = Some(PathBuf::from(dir));
        }
        if let Some(v) = parse_var(&lookup, "DOC_QA_CHUNK_SIZE")? {
            config.chunk_size = v;
        }
        if let Some(v) = parse_var(&lookup, "DOC_QA_CHUNK_OVERLAP")? {
            config.chunk_overlap = v;
        }
        if let Some(v) = parse_var(&lookup, "DOC_QA_TOP_K")? {
            config.top_k = v;
        }
        if let Some(v) = parse_var(&lookup, "DOC_QA_DISTANCE_METRIC")? {
            config.metric = v;
        }
        if let Some(mb) = parse_var::<usize, _>(&lookup, "DOC_QA_MAX_UPLOAD_MB")? {
            config.max_upload_bytes = mb.saturating_mul(1024 * 1024);
        }
        if let Some(level) = lookup("DOC_QA_LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }

        if let Some(provider) = lookup("LLM_PROVIDER") {
            config.llm.provider = provider.to_lowercase();
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("LLM_API_KEY").filter(|k| !k.trim().is_empty()) {
            config.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Some(v) = parse_var(&lookup, "LLM_TEMPERATURE")? {
            config.llm.temperature = v;
        }
        if let Some(v) = parse_var(&lookup, "LLM_MAX_TOKENS")? {
            config.llm.max_tokens = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidChunking {
                size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        if self.top_k == 0 {
            return Err(invalid("DOC_QA_TOP_K", "0", "must be at least 1"));
        }
        if self.max_upload_bytes == 0 {
            return Err(invalid("DOC_QA_MAX_UPLOAD_MB", "0", "must be at least 1"));
        }
        match self.llm.provider.as_str() {
            "openai" => {
                if self.llm.api_key.is_none() {
                    return Err(ConfigError::Missing { var: "LLM_API_KEY" });
                }
            }
            "ollama" => {}
            other => {
                return Err(invalid(
                    "LLM_PROVIDER",
                    other,
                    "expected \"openai\" or \"ollama\"",
                ))
            }
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid(
                "LLM_TEMPERATURE",
                &self.llm.temperature.to_string(),
                "must be between 0.0 and 2.0",
            ));
        }
        Ok(())
    }

    pub fn index_path(&self) -> PathBuf {
        self.vector_store_path.join("index.json")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.vector_store_path.join("metadata.json")
    }
}

/// Load variables from the env file at `path` into the process environment.
/// Variables already set are left alone. Returns the path when a file was read.
pub fn load_env_file(path: &Path) -> Option<PathBuf> {
    dotenvy::from_path(path).ok().map(|()| path.to_path_buf())
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(var, &raw, &e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_api_key() {
        let config = load(&[("LLM_API_KEY", "secret")]).unwrap();
        assert_eq!(config.chunk_size, 1200);
        assert_eq!(config.chunk_overlap, 300);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.metric, Metric::L2);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::Missing { var: "LLM_API_KEY" }
        );
        assert!(load(&[("LLM_API_KEY", "   ")]).is_err());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = load(&[
            ("LLM_PROVIDER", "Ollama"),
            ("LLM_BASE_URL", "http://localhost:11434/"),
        ])
        .unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = load(&[("LLM_PROVIDER", "bard"), ("LLM_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "LLM_PROVIDER", .. }));
    }

    #[test]
    fn test_numeric_overrides() {
        let config = load(&[
            ("LLM_API_KEY", "k"),
            ("DOC_QA_CHUNK_SIZE", "500"),
            ("DOC_QA_CHUNK_OVERLAP", "50"),
            ("DOC_QA_TOP_K", "8"),
            ("DOC_QA_MAX_UPLOAD_MB", "2"),
            ("DOC_QA_DISTANCE_METRIC", "cosine"),
        ])
        .unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 8);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.metric, Metric::Cosine);
    }

    #[test]
    fn test_unparsable_number_is_an_error() {
        let err = load(&[("LLM_API_KEY", "k"), ("DOC_QA_TOP_K", "four")]).unwrap_err();
        match err {
            ConfigError::Invalid { var, value, .. } => {
                assert_eq!(var, "DOC_QA_TOP_K");
                assert_eq!(value, "four");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overlap_not_smaller_than_size() {
        let err = load(&[
            ("LLM_API_KEY", "k"),
            ("DOC_QA_CHUNK_SIZE", "100"),
            ("DOC_QA_CHUNK_OVERLAP", "100"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidChunking {
                size: 100,
                overlap: 100
            }
        );
    }

    #[test]
    fn test_zero_top_k_rejected() {
        assert!(load(&[("LLM_API_KEY", "k"), ("DOC_QA_TOP_K", "0")]).is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = load(&[("LLM_API_KEY", "super-secret")]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }

    #[test]
    fn test_store_paths() {
        let config = load(&[
            ("LLM_API_KEY", "k"),
            ("DOC_QA_VECTOR_STORE_PATH", "/tmp/vs"),
        ])
        .unwrap();
        assert_eq!(config.index_path(), PathBuf::from("/tmp/vs/index.json"));
        assert_eq!(config.metadata_path(), PathBuf::from("/tmp/vs/metadata.json"));
        assert_eq!(config.ingest_dir, None);

        let config = load(&[("LLM_API_KEY", "k"), ("DOC_QA_INGEST_DIR", "/srv/docs")]).unwrap();
        assert_eq!(config.ingest_dir, Some(PathBuf::from("/srv/docs")));
    }

    #[test]
    fn test_load_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "DOC_QA_ENV_FILE_MARKER=from-file\n").unwrap();

        assert_eq!(load_env_file(&path), Some(path.clone()));
        assert_eq!(
            std::env::var("DOC_QA_ENV_FILE_MARKER").as_deref(),
            Ok("from-file")
        );
        assert_eq!(load_env_file(&dir.path().join("missing.env")), None);
    }
}
