//! API route definitions and router builder.

pub mod health;
pub mod index;
pub mod query;

use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/query", post(query::query))
        .route("/index/rebuild", post(index::rebuild_index));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use vmq_agent::engine::{EngineOptions, QueryEngine};
    use vmq_agent::mock::{MockBackend, ScriptedModel};
    use vmq_protocol::corpus_from_texts;
    use vmq_retrieval::{Retriever, TfIdfEmbedder};

    fn app() -> Router {
        build_router(AppState::with_sample_data())
    }

    fn app_with(model: ScriptedModel, backend: MockBackend) -> Router {
        let retriever = Retriever::new(
            corpus_from_texts(["The sky is blue.", "Cats are mammals."]),
            Arc::new(TfIdfEmbedder::new()),
        );
        let engine = QueryEngine::new(
            Arc::new(model),
            Arc::new(backend),
            Arc::new(retriever),
            EngineOptions::default(),
        );
        build_router(AppState::new(Arc::new(engine)))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
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
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["documents"], 4);
        assert_eq!(json["index_built"], false);
    }

    #[tokio::test]
    async fn query_answers_from_corpus() {
        let (status, json) = post_json(
            app_with(ScriptedModel::answering("Blue."), MockBackend::new()),
            "/api/v1/query",
            serde_json::json!({"question": "what color is the sky", "top_k": 1}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "Blue.");
        assert_eq!(json["is_api_operation"], false);
        assert_eq!(json["context"][0]["text"], "The sky is blue.");
        assert_eq!(json["context"].as_array().unwrap().len(), 1);
        assert!(json.get("api_result").is_none());
        assert!(json["query_id"].is_string());
    }

    #[tokio::test]
    async fn query_runs_operations() {
        let model = ScriptedModel::new(r#"{"operation": "list-vms", "params": {}}"#, "");
        let backend = MockBackend::with_vms(vec![serde_json::json!({"id": "vm-1", "name": "alpha"})]);
        let (status, json) = post_json(
            app_with(model, backend),
            "/api/v1/query",
            serde_json::json!({"question": "list all VMs"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["is_api_operation"], true);
        assert_eq!(json["api_result"]["success"], true);
        assert_eq!(json["api_result"]["data"]["vms"][0]["id"], "vm-1");
        assert!(json["answer"].as_str().unwrap().starts_with("Found 1 VM(s):"));
    }

    #[tokio::test]
    async fn empty_question_is_bad_request() {
        let (status, json) = post_json(
            app(),
            "/api/v1/query",
            serde_json::json!({"question": "   "}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn missing_question_is_rejected() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"top_k": 2}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn rebuild_reports_document_count() {
        let state = AppState::with_sample_data();
        let (status, json) = post_json(
            build_router(state.clone()),
            "/api/v1/index/rebuild",
            serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["documents"], 4);
        assert!(state.engine.retriever().is_built().await);
    }
}
