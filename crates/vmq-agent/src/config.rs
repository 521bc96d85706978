//! Agent configuration, loadable from TOML with environment overrides.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use vmq_retrieval::{Embedder, OllamaEmbedder, OllamaEmbedderConfig, TfIdfEmbedder};

use crate::backend::BackendConfig;
use crate::llm::OllamaConfig;

/// Top-level configuration for the query agent. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    /// Local Ollama chat model settings.
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// VM management backend.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Document corpus and embedding settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Which embedder indexes the corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// In-process TF-IDF, no network.
    #[default]
    Local,
    /// Ollama `/api/embed`.
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Directory holding `.txt` / `.md` documents.
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,
    /// Documents retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub embedder: EmbedderKind,
    /// Ollama embedding model (only used with `embedder = "ollama"`).
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
}

fn default_documents_dir() -> String {
    "documents".into()
}
fn default_top_k() -> usize {
    3
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            top_k: default_top_k(),
            embedder: EmbedderKind::default(),
            embedding_model: default_embedding_model(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl RetrievalConfig {
    /// Build the configured embedder. Ollama embeddings share the chat host.
    pub fn build_embedder(&self, ollama_host: &str) -> Arc<dyn Embedder> {
        match self.embedder {
            EmbedderKind::Local => Arc::new(TfIdfEmbedder::new()),
            EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(OllamaEmbedderConfig {
                host: ollama_host.to_string(),
                model: self.embedding_model.clone(),
                timeout_secs: self.embedding_timeout_secs,
            })),
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists (defaults otherwise), then apply
    /// environment overrides.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) if Path::new(p).exists() => Self::from_file(p)?,
            Some(p) => {
                tracing::warn!(path = p, "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BACKEND_API_URL") {
            self.backend.base_url = url;
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(dir) = get("VMQ_DOCUMENTS_DIR") {
            self.retrieval.documents_dir = dir;
        }
        if let Some(raw) = get("VMQ_TOP_K") {
            match raw.trim().parse() {
                Ok(top_k) => self.retrieval.top_k = top_k,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid VMQ_TOP_K"),
            }
        }
    }
}
