//! Shared application state for the Axum server.

use std::sync::Arc;

use vmq_agent::engine::{EngineOptions, QueryEngine};
use vmq_agent::mock::{MockBackend, ScriptedModel};
use vmq_retrieval::{MockDocumentSource, Retriever, TfIdfEmbedder};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
}

impl AppState {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine }
    }

    /// Offline state for development and tests: a scripted model that never
    /// classifies an operation, an in-memory backend, and the sample corpus.
    pub fn with_sample_data() -> Self {
        let source = Arc::new(MockDocumentSource::with_platform_sample());
        let retriever = Retriever::new(source.documents(), Arc::new(TfIdfEmbedder::new()));
        let engine = QueryEngine::new(
            Arc::new(ScriptedModel::answering("Sample answer.")),
            Arc::new(MockBackend::new()),
            Arc::new(retriever),
            EngineOptions::default(),
        )
        .with_source(source);
        Self::new(Arc::new(engine))
    }
}
