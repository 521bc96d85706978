//! Retrieval side of the VM query agent.
//!
//! Loads a document corpus through a `DocumentSource`, embeds it with a
//! pluggable `Embedder` (Ollama or local TF-IDF), and answers top-k
//! cosine-similarity lookups through a lazily built `EmbeddingIndex`.

pub mod embedding;
pub mod error;
pub mod index;
pub mod mock;
pub mod retriever;
pub mod source;

// Re-export key types for convenience
pub use embedding::{Embedder, OllamaEmbedder, OllamaEmbedderConfig, TfIdfEmbedder, cosine_similarity};
pub use error::{RetrievalError, RetrievalResult};
pub use index::EmbeddingIndex;
pub use mock::MockDocumentSource;
pub use retriever::Retriever;
pub use source::{DirectoryDocumentSource, DocumentSource};
