//! Lazy index construction and top-k lookup.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use vmq_protocol::Document;

use crate::embedding::Embedder;
use crate::error::{RetrievalError, RetrievalResult};
use crate::index::EmbeddingIndex;
use crate::source::DocumentSource;

struct CorpusState {
    documents: Vec<Document>,
    index: Option<EmbeddingIndex>,
}

/// Owns the corpus and its embedding index.
///
/// The index is built on the first lookup (or an explicit `rebuild`) and is
/// read-only afterwards. Concurrent first lookups build it exactly once:
/// the build runs under the write lock and re-checks before embedding.
/// Query embedding happens under the read lock so a rebuild can't swap the
/// vocabulary out from under an in-flight search.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    state: RwLock<CorpusState>,
    builds: AtomicUsize,
}

impl Retriever {
    pub fn new(documents: Vec<Document>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: RwLock::new(CorpusState {
                documents,
                index: None,
            }),
            builds: AtomicUsize::new(0),
        }
    }

    /// Load the corpus from a source. The index is still built lazily.
    pub async fn from_source(
        source: &dyn DocumentSource,
        embedder: Arc<dyn Embedder>,
    ) -> RetrievalResult<Self> {
        let documents = source.load().await?;
        Ok(Self::new(documents, embedder))
    }

    /// Number of documents in the corpus (built or not).
    pub async fn corpus_len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_built(&self) -> bool {
        self.state.read().await.index.is_some()
    }

    /// How many times the index has been built.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Build the index if it doesn't exist yet.
    pub async fn ensure_built(&self) -> RetrievalResult<()> {
        if self.state.read().await.index.is_some() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        if state.index.is_some() {
            return Ok(());
        }
        let index = self.build(&state.documents).await?;
        state.index = Some(index);
        Ok(())
    }

    /// Force a fresh build over the current corpus. Returns the indexed
    /// document count.
    pub async fn rebuild(&self) -> RetrievalResult<usize> {
        let mut state = self.state.write().await;
        let index = self.build(&state.documents).await?;
        let len = index.len();
        state.index = Some(index);
        Ok(len)
    }

    /// Swap in a new corpus. The old index is dropped; the next lookup
    /// (or `rebuild`) embeds the new documents.
    pub async fn replace_corpus(&self, documents: Vec<Document>) {
        let mut state = self.state.write().await;
        tracing::info!(count = documents.len(), "corpus replaced");
        state.documents = documents;
        state.index = None;
    }

    /// Top-k documents for `query`, best first.
    ///
    /// Returns `min(top_k, corpus size)` documents. `top_k == 0` returns an
    /// empty list without touching the index.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<Document>> {
        Ok(self
            .search(query, top_k)
            .await?
            .into_iter()
            .map(|(doc, _)| doc)
            .collect())
    }

    /// Like `retrieve`, but keeps the similarity scores.
    pub async fn search(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<(Document, f32)>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        loop {
            {
                let state = self.state.read().await;
                if let Some(index) = &state.index {
                    let query_vector = self.embedder.embed(query).await?;
                    let hits = index.search(&query_vector, top_k)?;
                    tracing::debug!(
                        top_k,
                        returned = hits.len(),
                        best = hits.first().map(|(_, s)| *s),
                        "retrieval complete"
                    );
                    return Ok(hits.into_iter().map(|(d, s)| (d.clone(), s)).collect());
                }
            }
            // Not built yet (or a corpus swap dropped it); build and retry.
            self.ensure_built().await?;
        }
    }

    async fn build(&self, documents: &[Document]) -> RetrievalResult<EmbeddingIndex> {
        if documents.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        self.embedder.fit(&texts).await?;
        let vectors = self.embedder.embed_batch(&texts).await?;
        let index = EmbeddingIndex::new(documents.to_vec(), vectors)?;

        self.builds.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            embedder = self.embedder.name(),
            documents = index.len(),
            dimension = index.dimension(),
            "embedding index built"
        );
        Ok(index)
    }
}
