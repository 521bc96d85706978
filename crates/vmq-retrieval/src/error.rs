//! Retrieval error types.

use thiserror::Error;

/// Errors that can occur while loading, embedding, or searching the corpus.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Index build was requested with no documents loaded.
    #[error("corpus is empty: load at least one document before building the index")]
    EmptyCorpus,

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("source not found: {0}")]
    NotFound(String),
}

/// Convenience alias for retrieval results.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
