//! Text → vector embedding.
//!
//! Two backends share the `Embedder` trait:
//! - **Ollama** (`/api/embed`): model-quality vectors from the local runtime.
//! - **TF-IDF**: offline, learned from the corpus at index build time.

pub mod ollama;
pub mod tfidf;

use async_trait::async_trait;

use crate::error::{RetrievalError, RetrievalResult};

pub use ollama::{OllamaEmbedder, OllamaEmbedderConfig};
pub use tfidf::TfIdfEmbedder;

/// Converts text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Called once per index build with the full corpus, before any
    /// document is embedded. Embedders that learn from the corpus
    /// (TF-IDF) override this; model-backed ones ignore it.
    async fn fit(&self, _corpus: &[String]) -> RetrievalResult<()> {
        Ok(())
    }

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> RetrievalResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("embedder returned no vector".into()))
    }

    /// Name of this embedder (for logging).
    fn name(&self) -> &str;
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}
