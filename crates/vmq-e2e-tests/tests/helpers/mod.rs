//! Shared test harness for E2E integration tests.
//!
//! Runs the real engine and HTTP router against two wiremock servers, one
//! standing in for Ollama and one for the VM backend, with the corpus read
//! from a temporary documents directory.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Respond, ResponseTemplate};

use vmq_agent::backend::BackendConfig;
use vmq_agent::config::{AgentConfig, RetrievalConfig};
use vmq_agent::engine::QueryEngine;
use vmq_agent::llm::OllamaConfig;
use vmq_server::routes::build_router;
use vmq_server::state::AppState;

/// Build an Ollama chat response body.
pub fn ollama_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "llama2",
        "message": {
            "role": "assistant",
            "content": content
        },
        "done": true
    })
}

/// Matches chat requests that carry a system message (classification).
pub struct IsClassification(pub bool);

impl Match for IsClassification {
    fn matches(&self, request: &wiremock::Request) -> bool {
        let Ok(body) = request.body_json::<serde_json::Value>() else {
            return false;
        };
        let has_system = body["messages"]
            .as_array()
            .is_some_and(|m| m.iter().any(|msg| msg["role"] == "system"));
        has_system == self.0
    }
}

/// Answers `/api/embed` with one letter-histogram vector per input text.
pub struct LetterEmbeddings;

impl Respond for LetterEmbeddings {
    fn respond(&self, request: &wiremock::Request) -> ResponseTemplate {
        let body: serde_json::Value = request.body_json().unwrap_or_default();
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|t| letter_histogram(t.as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": embeddings }))
    }
}

fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
        v[(c - b'a') as usize] += 1.0;
    }
    v
}

/// End-to-end harness: mock Ollama + mock VM backend + on-disk corpus.
pub struct TestHarness {
    pub ollama: MockServer,
    pub backend: MockServer,
    pub docs: TempDir,
    pub config: AgentConfig,
}

impl TestHarness {
    /// Start both mock servers and write `documents` (file name, text)
    /// into a fresh documents directory.
    pub async fn start(documents: &[(&str, &str)]) -> Self {
        let ollama = MockServer::start().await;
        let backend = MockServer::start().await;
        let docs = tempfile::tempdir().unwrap();
        for (name, text) in documents {
            std::fs::write(docs.path().join(name), text).unwrap();
        }

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama2:latest"}]
            })))
            .mount(&ollama)
            .await;

        let config = AgentConfig {
            ollama: OllamaConfig {
                host: ollama.uri(),
                model: "llama2".into(),
                classify_timeout_secs: 5,
                synthesis_timeout_secs: 5,
            },
            backend: BackendConfig {
                base_url: backend.uri(),
                timeout_secs: 5,
            },
            retrieval: RetrievalConfig {
                documents_dir: docs.path().to_string_lossy().into_owned(),
                ..RetrievalConfig::default()
            },
        };

        Self {
            ollama,
            backend,
            docs,
            config,
        }
    }

    /// Harness with the two-document sky/cats corpus.
    pub async fn with_sky_corpus() -> Self {
        Self::start(&[
            ("01-sky.txt", "The sky is blue."),
            ("02-cats.txt", "Cats are mammals."),
        ])
        .await
    }

    /// Build the engine from the harness config.
    pub async fn engine(&self) -> QueryEngine {
        QueryEngine::from_config(&self.config).await.unwrap()
    }

    /// Build the HTTP router over a fresh engine.
    pub async fn router(&self) -> (Router, AppState) {
        let state = AppState::new(Arc::new(self.engine().await));
        (build_router(state.clone()), state)
    }

    /// Make the classifier reply with `reply`.
    pub async fn classifier_replies(&self, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(IsClassification(true))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_response(reply)))
            .mount(&self.ollama)
            .await;
    }

    /// Make answer synthesis reply with `reply`.
    pub async fn model_answers(&self, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(IsClassification(false))
            .respond_with(ResponseTemplate::new(200).set_body_json(ollama_response(reply)))
            .mount(&self.ollama)
            .await;
    }

    /// Every `/api/chat` request body the mock Ollama received.
    pub async fn chat_requests(&self) -> Vec<serde_json::Value> {
        self.ollama
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/api/chat")
            .filter_map(|r| r.body_json().ok())
            .collect()
    }

    /// Number of requests the mock backend received for `method path`.
    pub async fn backend_requests(&self, method: &str, path: &str) -> usize {
        self.backend
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == method && r.url.path() == path)
            .count()
    }

    /// Add a document to the corpus directory.
    pub fn write_doc(&self, name: &str, text: &str) {
        std::fs::write(self.docs_path().join(name), text).unwrap();
    }

    pub fn docs_path(&self) -> &Path {
        self.docs.path()
    }
}

/// POST a JSON body through the router. Returns (status, JSON body).
pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

/// GET through the router. Returns (status, JSON body).
pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}
