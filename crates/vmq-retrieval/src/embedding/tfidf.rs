//! Offline TF-IDF embedder.
//!
//! Learns a vocabulary from the corpus passed to `fit` and produces one
//! column per vocabulary token. Queries are projected onto the same
//! vocabulary, so every vector in a corpus has the same dimension.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use super::Embedder;
use crate::error::{RetrievalError, RetrievalResult};

/// Maximum vocabulary size (number of unique tokens tracked).
const MAX_VOCAB_SIZE: usize = 8192;

#[derive(Debug, Clone)]
struct Vocabulary {
    token_to_idx: HashMap<String, usize>,
    /// Inverse document frequency per column.
    idf: Vec<f32>,
}

/// TF-IDF embedder with a corpus-learned vocabulary.
#[derive(Debug, Default)]
pub struct TfIdfEmbedder {
    vocab: RwLock<Option<Vocabulary>>,
}

impl TfIdfEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vocabulary columns, 0 before the first `fit`.
    pub fn dimension(&self) -> usize {
        self.vocab
            .read()
            .map(|guard| guard.as_ref().map_or(0, |v| v.idf.len()))
            .unwrap_or(0)
    }
}

#[async_trait]
impl Embedder for TfIdfEmbedder {
    async fn fit(&self, corpus: &[String]) -> RetrievalResult<()> {
        let vocab = build_vocab(corpus);
        tracing::debug!(vocab_size = vocab.idf.len(), "tf-idf vocabulary built");
        let mut guard = self
            .vocab
            .write()
            .map_err(|_| RetrievalError::Embedding("vocabulary lock poisoned".into()))?;
        *guard = Some(vocab);
        Ok(())
    }

    async fn embed_batch(&self, texts: &[String]) -> RetrievalResult<Vec<Vec<f32>>> {
        let guard = self
            .vocab
            .read()
            .map_err(|_| RetrievalError::Embedding("vocabulary lock poisoned".into()))?;
        let vocab = guard.as_ref().ok_or_else(|| {
            RetrievalError::Embedding("tf-idf vocabulary not built; fit a corpus first".into())
        })?;
        Ok(texts.iter().map(|t| tfidf_vector(t, vocab)).collect())
    }

    fn name(&self) -> &str {
        "tfidf"
    }
}

/// Lowercase, split on non-alphanumerics, drop single-character tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(String::from)
        .collect()
}

fn build_vocab(corpus: &[String]) -> Vocabulary {
    let num_docs = corpus.len().max(1);

    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    for doc in corpus {
        let unique: HashSet<String> = tokenize(doc).into_iter().collect();
        for tok in unique {
            *doc_freq.entry(tok).or_insert(0) += 1;
        }
    }

    // Most frequent first; alphabetical within a frequency so column order
    // is deterministic.
    let mut entries: Vec<(String, usize)> = doc_freq.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(MAX_VOCAB_SIZE);

    let mut token_to_idx = HashMap::with_capacity(entries.len());
    let mut idf = Vec::with_capacity(entries.len());
    for (idx, (token, freq)) in entries.into_iter().enumerate() {
        token_to_idx.insert(token, idx);
        idf.push(((num_docs as f32) / (freq as f32)).ln() + 1.0);
    }

    Vocabulary { token_to_idx, idf }
}

fn tfidf_vector(text: &str, vocab: &Vocabulary) -> Vec<f32> {
    let mut vector = vec![0.0f32; vocab.idf.len()];
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return vector;
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for tok in &tokens {
        if let Some(&idx) = vocab.token_to_idx.get(tok) {
            *counts.entry(idx).or_insert(0) += 1;
        }
    }

    let total = tokens.len() as f32;
    for (idx, count) in counts {
        vector[idx] = (count as f32 / total) * vocab.idf[idx];
    }
    vector
}
