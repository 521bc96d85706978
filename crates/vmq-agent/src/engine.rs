//! Query engine: routes each question to the VM backend or the corpus.
//!
//! ```text
//! question → IntentRouter ─┬─ operation → OperationDispatcher → format_operation
//!                          └─ none      → Retriever → AnswerSynthesizer
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use vmq_protocol::QueryResponse;
use vmq_retrieval::{
    DirectoryDocumentSource, DocumentSource, RetrievalError, RetrievalResult, Retriever,
};

use crate::backend::{BackendClient, HttpBackend};
use crate::config::AgentConfig;
use crate::dispatcher::OperationDispatcher;
use crate::formatter::{format_answer, format_operation};
use crate::llm::{ChatModel, OllamaClient};
use crate::router::IntentRouter;
use crate::synthesizer::AnswerSynthesizer;

/// Tunables that aren't owned by a collaborator.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub classify_timeout: Duration,
    pub synthesis_timeout: Duration,
    /// Documents retrieved when the caller doesn't say.
    pub top_k: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            classify_timeout: Duration::from_secs(60),
            synthesis_timeout: Duration::from_secs(60),
            top_k: 3,
        }
    }
}

pub struct QueryEngine {
    router: IntentRouter,
    dispatcher: OperationDispatcher,
    retriever: Arc<Retriever>,
    synthesizer: AnswerSynthesizer,
    source: Option<Arc<dyn DocumentSource>>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        model: Arc<dyn ChatModel>,
        backend: Arc<dyn BackendClient>,
        retriever: Arc<Retriever>,
        options: EngineOptions,
    ) -> Self {
        Self {
            router: IntentRouter::new(model.clone(), options.classify_timeout),
            dispatcher: OperationDispatcher::new(backend),
            retriever,
            synthesizer: AnswerSynthesizer::new(model, options.synthesis_timeout),
            source: None,
            top_k: options.top_k,
        }
    }

    /// Remember where the corpus came from so `reload_corpus` can re-read it.
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Wire the production collaborators from config.
    ///
    /// A missing documents directory leaves the corpus empty; questions
    /// are then answered free-form. The Ollama model check only warns.
    pub async fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        let ollama = OllamaClient::new(config.ollama.clone());
        match ollama.has_model().await {
            Ok(true) => tracing::info!(model = %config.ollama.model, "ollama model available"),
            Ok(false) => tracing::warn!(
                model = %config.ollama.model,
                "ollama model not found; pull it with `ollama pull {}`",
                config.ollama.model
            ),
            Err(e) => tracing::warn!(host = %config.ollama.host, error = %e, "ollama not reachable"),
        }

        let backend = HttpBackend::new(&config.backend);
        let embedder = config.retrieval.build_embedder(&config.ollama.host);
        let source: Arc<dyn DocumentSource> =
            Arc::new(DirectoryDocumentSource::new(&config.retrieval.documents_dir));

        let documents = match source.load().await {
            Ok(docs) => docs,
            Err(RetrievalError::NotFound(dir)) => {
                tracing::warn!(dir = %dir, "documents directory not found, corpus is empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            documents = documents.len(),
            source = %source.describe(),
            embedder = embedder.name(),
            "corpus loaded"
        );

        let options = EngineOptions {
            classify_timeout: config.ollama.classify_timeout(),
            synthesis_timeout: config.ollama.synthesis_timeout(),
            top_k: config.retrieval.top_k,
        };
        Ok(Self::new(
            Arc::new(ollama),
            Arc::new(backend),
            Arc::new(Retriever::new(documents, embedder)),
            options,
        )
        .with_source(source))
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn default_top_k(&self) -> usize {
        self.top_k
    }

    pub fn backend_url(&self) -> &str {
        self.dispatcher.backend_url()
    }

    /// Answer one question with the default `top_k` and no cancellation.
    pub async fn query(&self, question: &str) -> QueryResponse {
        self.query_with(question, self.top_k, &CancellationToken::new())
            .await
    }

    /// Answer one question. Never fails; every failure is rendered into
    /// the answer text (and `api_result` on the operation path).
    pub async fn query_with(
        &self,
        question: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> QueryResponse {
        let start = Instant::now();
        let descriptor = self.router.classify(question, cancel).await;

        if descriptor.is_operation() {
            tracing::info!(
                operation = %descriptor.operation,
                params = ?descriptor.params,
                "routing to VM backend"
            );
            let result = self.dispatcher.dispatch(&descriptor).await;
            let answer = format_operation(&result, &descriptor);
            return QueryResponse::operation(answer, result, elapsed_ms(start));
        }

        let context = match self.retriever.retrieve(question, top_k).await {
            Ok(docs) if !docs.is_empty() => Some(docs),
            Ok(_) => None,
            Err(RetrievalError::EmptyCorpus) => {
                tracing::debug!("corpus is empty, answering free-form");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed, answering free-form");
                None
            }
        };
        tracing::info!(
            context_docs = context.as_ref().map_or(0, Vec::len),
            "answering from corpus"
        );

        let answer = self
            .synthesizer
            .synthesize(question, context.as_deref(), cancel)
            .await;
        QueryResponse::answer(format_answer(&answer), context, elapsed_ms(start))
    }

    /// Re-read the corpus (when a source is attached) and rebuild the index.
    /// Returns the number of indexed documents; an empty corpus yields 0.
    pub async fn reload_corpus(&self) -> RetrievalResult<usize> {
        if let Some(source) = &self.source {
            let documents = match source.load().await {
                Ok(docs) => docs,
                Err(RetrievalError::NotFound(_)) => Vec::new(),
                Err(e) => return Err(e),
            };
            self.retriever.replace_corpus(documents).await;
        }

        match self.retriever.rebuild().await {
            Ok(n) => Ok(n),
            Err(RetrievalError::EmptyCorpus) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
