// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP API tests
//!
//! Requests go through the full router with `oneshot`; backends are the
//! in-memory index, the hashed embedder and a canned generator.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use school_assistant::api::{build_router, AppState};
use school_assistant::chat::SessionStore;
use school_assistant::embeddings::{EmbeddingProvider, HashedEmbedder};
use school_assistant::generation::{GenerationError, GenerationService, TextGenerator};
use school_assistant::ingestion::{IngestionJob, IngestionSettings};
use school_assistant::knowledge::KnowledgeBase;
use school_assistant::rag::{PipelineSettings, RagPipeline};
use school_assistant::vector::{
    InMemoryIndex, IndexError, IndexedVector, NamespaceStats, SearchHit, VectorIndex,
};

mock! {
    Index {}

    #[async_trait]
    impl VectorIndex for Index {
        async fn search(
            &self,
            namespace: &str,
            vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<SearchHit>, IndexError>;
        async fn upsert_batch(
            &self,
            namespace: &str,
            records: &[IndexedVector],
        ) -> Result<usize, IndexError>;
        async fn namespace_stats(
            &self,
            namespace: &str,
        ) -> Result<Option<NamespaceStats>, IndexError>;
        async fn delete_all(&self, namespace: &str) -> Result<(), IndexError>;
        fn name(&self) -> &'static str;
    }
}

struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok("Відповідь помічника".to_string())
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

fn ingestion_settings() -> IngestionSettings {
    let mut settings = IngestionSettings::default();
    settings.embed_delay = std::time::Duration::ZERO;
    settings.batch.pause = std::time::Duration::ZERO;
    settings
}

/// Fully wired app: generation plus retrieval over an (initially empty) local index
fn configured_app() -> Router {
    configured_app_with_sessions(SessionStore::default())
}

fn configured_app_with_sessions(sessions: SessionStore) -> Router {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashedEmbedder::new(64, 5000).unwrap());
    let index: Arc<dyn VectorIndex> = Arc::new(InMemoryIndex::new());

    let pipeline = RagPipeline::new(
        GenerationService::new(Arc::new(CannedGenerator)),
        PipelineSettings::default(),
    )
    .with_retrieval(embedder.clone(), index.clone());
    let ingestion = IngestionJob::new(
        KnowledgeBase::builtin(),
        Some(embedder),
        Some(index),
        ingestion_settings(),
    );

    build_router(AppState::with_sessions(
        Arc::new(pipeline),
        Arc::new(ingestion),
        sessions,
    ))
}

/// App with no credentials at all
fn unconfigured_app() -> Router {
    let pipeline =
        RagPipeline::new(GenerationService::unconfigured(), PipelineSettings::default());
    let ingestion = IngestionJob::new(KnowledgeBase::builtin(), None, None, ingestion_settings());
    build_router(AppState::new(Arc::new(pipeline), Arc::new(ingestion)))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_reports_configuration() {
    let (status, body) = send(&configured_app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].as_str().unwrap().contains("School Assistant"));
    assert!(body.get("issues").is_none());

    let (status, body) = send(&unconfigured_app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["issues"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_chat_session_keeps_history() {
    let app = configured_app();

    let (status, first) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"message": "Що таке функція?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["answer"], "Відповідь помічника");
    assert_eq!(first["history"].as_array().unwrap().len(), 2);
    assert_eq!(first["history"][0]["sender"], "user");
    assert_eq!(first["history"][1]["sender"], "bot");

    let session_id = first["sessionId"].as_str().unwrap().to_string();
    let (status, second) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"sessionId": &session_id, "message": "А графік?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["sessionId"], session_id.as_str());
    assert_eq!(second["history"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_chat_uses_context_after_ingest() {
    let app = configured_app();

    let (status, ingest) = send(&app, Method::POST, "/v1/ingest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ingest["uploaded"], 12);
    assert!(ingest["summary"].as_str().unwrap().contains("Створено 12 векторів"));

    let (status, reply) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"message": "Приклад лінійного рівняння"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["context"].as_array().unwrap().len(), 3);
    assert_eq!(reply["contextPreview"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let (status, body) = send(
        &configured_app(),
        Method::POST,
        "/v1/chat",
        Some(json!({"message": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_chat_without_generation_key_is_unavailable() {
    let (status, body) = send(
        &unconfigured_app(),
        Method::POST,
        "/v1/chat",
        Some(json!({"message": "Що таке функція?"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "service_unavailable");
    assert!(body["message"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn test_index_stats() {
    let (status, _) = send(&unconfigured_app(), Method::GET, "/v1/index/stats", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let app = configured_app();
    let (status, body) = send(&app, Method::GET, "/v1/index/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vectorCount"], 0);
    assert_eq!(body["namespace"], "INFO");

    send(&app, Method::POST, "/v1/ingest", None).await;
    let (_, body) = send(&app, Method::GET, "/v1/index/stats", None).await;
    assert_eq!(body["vectorCount"], 12);
}

#[tokio::test]
async fn test_index_stats_queries_index_once() {
    let mut index = MockIndex::new();
    index
        .expect_namespace_stats()
        .times(1)
        .returning(|namespace| {
            Ok(Some(NamespaceStats {
                namespace: namespace.to_string(),
                vector_count: 5,
            }))
        });
    index.expect_name().return_const("mock");

    let pipeline =
        RagPipeline::new(GenerationService::unconfigured(), PipelineSettings::default());
    let ingestion = IngestionJob::new(
        KnowledgeBase::builtin(),
        None,
        Some(Arc::new(index)),
        ingestion_settings(),
    );
    let app = build_router(AppState::new(Arc::new(pipeline), Arc::new(ingestion)));

    let (status, body) = send(&app, Method::GET, "/v1/index/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vectorCount"], 5);
    assert_eq!(body["summary"], "📊 Namespace \"INFO\": 5 векторів");
}

#[tokio::test]
async fn test_ending_a_session_drops_its_history() {
    let app = configured_app();

    let (_, first) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"sessionId": "lesson-1", "message": "Що таке функція?"})),
    )
    .await;
    assert_eq!(first["history"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, Method::DELETE, "/v1/chat/lesson-1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::DELETE, "/v1/chat/lesson-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");

    // Same id starts over
    let (_, again) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"sessionId": "lesson-1", "message": "А графік?"})),
    )
    .await;
    assert_eq!(again["history"].as_array().unwrap().len(), 2);
    assert_eq!(again["history"][0]["text"], "А графік?");
}

#[tokio::test]
async fn test_idle_session_expires() {
    let app = configured_app_with_sessions(SessionStore::new(Duration::from_millis(100), 10));

    let (_, first) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"sessionId": "short", "message": "Що таке функція?"})),
    )
    .await;
    assert_eq!(first["history"].as_array().unwrap().len(), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;

    let (_, again) = send(
        &app,
        Method::POST,
        "/v1/chat",
        Some(json!({"sessionId": "short", "message": "А графік?"})),
    )
    .await;
    assert_eq!(again["sessionId"], "short");
    assert_eq!(again["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ingest_without_credentials_reports_not_configured() {
    let (status, body) = send(&unconfigured_app(), Method::POST, "/v1/ingest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["status"], "not_configured");
    assert!(body["summary"].as_str().unwrap().starts_with("❌"));
}

#[tokio::test]
async fn test_chat_route_rejects_get() {
    let (status, _) = send(&configured_app(), Method::GET, "/v1/chat", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
