//! In-memory embedding index with cosine-similarity ranking.

use vmq_protocol::Document;

use crate::embedding::cosine_similarity;
use crate::error::{RetrievalError, RetrievalResult};

/// Ordered (document, vector) pairs for one corpus.
///
/// Read-only after construction; `documents.len() == vectors.len()` and every
/// vector has the same dimension.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl EmbeddingIndex {
    pub fn new(documents: Vec<Document>, vectors: Vec<Vec<f32>>) -> RetrievalResult<Self> {
        if documents.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }
        if documents.len() != vectors.len() {
            return Err(RetrievalError::Embedding(format!(
                "{} documents but {} vectors",
                documents.len(),
                vectors.len()
            )));
        }

        let dimension = vectors[0].len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(Self {
            documents,
            vectors,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Rank every document against `query` and return the best `top_k`.
    ///
    /// Scores are non-increasing; equal scores keep corpus order.
    pub fn search(&self, query: &[f32], top_k: usize) -> RetrievalResult<Vec<(&Document, f32)>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v)))
            .collect();

        // sort_by is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| (&self.documents[i], score))
            .collect())
    }
}
