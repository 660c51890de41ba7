//! Runtime configuration for the language model and the embedding model.
//!
//! Values are resolved once at startup (explicit flag, then environment
//! variable, then default) and passed by value to the components that need
//! them.

use std::{fmt, time::Duration};

pub const OLLAMA_URL_ENV_VAR: &str = "DOCCHAT_OLLAMA_URL";
pub const LLM_MODEL_ENV_VAR: &str = "DOCCHAT_LLM_MODEL";
pub const EMBEDDING_MODEL_ENV_VAR: &str = "DOCCHAT_EMBEDDING_MODEL";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "llama3.1";
pub const DEFAULT_COLBERT_MODEL: &str = "lightonai/GTE-ModernColBERT-v1";
/// Ollama's packaging of `sentence-transformers/all-MiniLM-L6-v2`.
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "all-minilm";

/// Small context window so the model fits in modest system memory.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 1024;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(360);

/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 50;

fn resolve(explicit: Option<&str>, env_var: &str, default: &str) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| default.to_string())
}

/// Settings for the answering model served by Ollama.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub context_window: u32,
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl LlmConfig {
    /// Resolve the model and server URL from explicit values, the
    /// `DOCCHAT_LLM_MODEL` / `DOCCHAT_OLLAMA_URL` environment variables, or
    /// the defaults.
    pub fn resolve(model: Option<&str>, base_url: Option<&str>) -> Self {
        Self {
            base_url: resolve(base_url, OLLAMA_URL_ENV_VAR, DEFAULT_OLLAMA_URL),
            model: resolve(model, LLM_MODEL_ENV_VAR, DEFAULT_LLM_MODEL),
            ..Self::default()
        }
    }
}

/// Which implementation produces embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmbeddingBackend {
    /// Local ColBERT model loaded in-process.
    #[default]
    Colbert,
    /// Embedding model served by Ollama.
    Ollama,
}

impl EmbeddingBackend {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Colbert => DEFAULT_COLBERT_MODEL,
            Self::Ollama => DEFAULT_OLLAMA_EMBEDDING_MODEL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Colbert => "colbert",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: String,
    /// Only used by the Ollama backend.
    pub base_url: String,
    pub request_timeout: Duration,
}

impl EmbeddingConfig {
    pub fn resolve(
        backend: EmbeddingBackend,
        model: Option<&str>,
        base_url: Option<&str>,
    ) -> Self {
        Self {
            backend,
            model: resolve(
                model,
                EMBEDDING_MODEL_ENV_VAR,
                backend.default_model(),
            ),
            base_url: resolve(base_url, OLLAMA_URL_ENV_VAR, DEFAULT_OLLAMA_URL),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
