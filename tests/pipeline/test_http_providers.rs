// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Real HTTP clients against stub servers

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;

use crate::common::{fast_retry, StubServer};
use school_assistant::embeddings::{
    EmbeddingError, EmbeddingProvider, GeminiEmbedder, OpenAiEmbedder,
};
use school_assistant::generation::{GeminiGenerator, GenerationService, FALLBACK_ANSWER};
use school_assistant::school_info::{SchoolInfoClient, SchoolInfoSource};
use school_assistant::vector::{IndexError, IndexedVector, Metadata, PineconeIndex, VectorIndex};

fn generator(base_url: &str) -> GeminiGenerator {
    GeminiGenerator::new(
        "test-key".to_string(),
        base_url,
        "gemini-2.0-flash",
        0.7,
        1024,
        fast_retry(),
    )
    .unwrap()
}

fn gemini_embedder(base_url: &str, max_chars: usize) -> GeminiEmbedder {
    GeminiEmbedder::new(
        "test-key".to_string(),
        base_url.to_string(),
        "text-embedding-004".to_string(),
        max_chars,
        fast_retry(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_generation_http_500_returns_fallback() {
    let stub = StubServer::fixed(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"boom"}"#).await;
    let service = GenerationService::new(Arc::new(generator(&stub.base_url)));

    let response = service
        .query_with_context("prompt", vec!["context".to_string()])
        .await;

    assert_eq!(response.text, FALLBACK_ANSWER);
    assert!(response.context.is_empty());
    assert!(response.error.is_some());
    // One retry after the first failure
    assert_eq!(stub.requests().len(), 2);
}

#[tokio::test]
async fn test_generation_success_reads_first_candidate() {
    let stub = StubServer::fixed(
        StatusCode::OK,
        r#"{"candidates":[{"content":{"parts":[{"text":"x = 2"}],"role":"model"}}]}"#,
    )
    .await;
    let service = GenerationService::new(Arc::new(generator(&stub.base_url)));

    let response = service.query("Розв'яжи 2x + 3 = 7").await;
    assert_eq!(response.text, "x = 2");
    assert!(!response.is_fallback());

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.path, "/models/gemini-2.0-flash:generateContent");
    assert_eq!(request.query.as_deref(), Some("key=test-key"));
    assert_eq!(request.body["contents"][0]["parts"][0]["text"], "Розв'яжи 2x + 3 = 7");
    assert_eq!(request.body["generationConfig"]["maxOutputTokens"], 1024);
    assert!(request.body["generationConfig"]["temperature"].is_number());
}

#[tokio::test]
async fn test_generation_unexpected_shape_is_not_retried() {
    let stub = StubServer::fixed(StatusCode::OK, r#"{"candidates":[]}"#).await;
    let service = GenerationService::new(Arc::new(generator(&stub.base_url)));

    let response = service.query("prompt").await;
    assert_eq!(response.text, FALLBACK_ANSWER);
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn test_embedding_input_is_truncated_before_submission() {
    let stub = StubServer::fixed(StatusCode::OK, r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#).await;
    let embedder = gemini_embedder(&stub.base_url, 50);

    let long_text = "ї".repeat(200);
    let vector = embedder.embed(&long_text).await.unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);

    let requests = stub.requests();
    assert_eq!(requests[0].path, "/models/text-embedding-004:embedContent");
    assert_eq!(requests[0].body["model"], "models/text-embedding-004");
    let sent = requests[0].body["content"]["parts"][0]["text"].as_str().unwrap();
    assert_eq!(sent.chars().count(), 50);
}

#[tokio::test]
async fn test_short_embedding_input_is_sent_unchanged() {
    let stub = StubServer::fixed(StatusCode::OK, r#"{"embedding":{"values":[1.0]}}"#).await;
    let embedder = gemini_embedder(&stub.base_url, 5000);

    embedder.embed("Площа кола").await.unwrap();
    assert_eq!(stub.requests()[0].body["content"]["parts"][0]["text"], "Площа кола");
}

#[tokio::test]
async fn test_embedding_errors_are_distinguishable() {
    let stub = StubServer::fixed(StatusCode::BAD_REQUEST, r#"{"error":"bad"}"#).await;
    let result = gemini_embedder(&stub.base_url, 5000).embed("text").await;
    assert!(matches!(result, Err(EmbeddingError::Provider { status: 400, .. })));
    assert_eq!(stub.requests().len(), 1);

    let stub = StubServer::fixed(StatusCode::OK, r#"{"unexpected":true}"#).await;
    let result = gemini_embedder(&stub.base_url, 5000).embed("text").await;
    assert!(matches!(result, Err(EmbeddingError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_openai_embedder_wire_format() {
    let stub = StubServer::fixed(
        StatusCode::OK,
        r#"{"data":[{"embedding":[0.5,0.5],"index":0}],"model":"text-embedding-3-small"}"#,
    )
    .await;
    let embedder = OpenAiEmbedder::new(
        "sk-test".to_string(),
        stub.base_url.clone(),
        "text-embedding-3-small".to_string(),
        Some(2),
        10,
        fast_retry(),
    )
    .unwrap();

    let vector = embedder.embed("абвгдежзийклмн").await.unwrap();
    assert_eq!(vector, vec![0.5, 0.5]);

    let request = &stub.requests()[0];
    assert_eq!(request.path, "/embeddings");
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer sk-test"));
    assert_eq!(request.body["input"][0].as_str().unwrap().chars().count(), 10);
    assert_eq!(request.body["dimensions"], 2);
}

#[tokio::test]
async fn test_pinecone_query_and_stats() {
    let stub = StubServer::start(|request| match request.path.as_str() {
        "/query" => (
            StatusCode::OK,
            json!({
                "matches": [
                    {"id": "example-mathematics-2", "score": 0.91,
                     "metadata": {"text": "Приклад лінійного рівняння: 2x + 3 = 7", "type": "example"}},
                    {"id": "book-12", "score": 0.35}
                ],
                "namespace": "INFO"
            })
            .to_string(),
        ),
        "/describe_index_stats" => (
            StatusCode::OK,
            json!({"namespaces": {"INFO": {"vectorCount": 12}}, "dimension": 768}).to_string(),
        ),
        _ => (StatusCode::NOT_FOUND, "{}".to_string()),
    })
    .await;
    let index = PineconeIndex::new("pc-key", &stub.base_url, fast_retry()).unwrap();

    let hits = index.search("INFO", &[0.1, 0.2], 3).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].text, "Приклад лінійного рівняння: 2x + 3 = 7");
    assert_eq!(hits[1].text, "");

    let stats = index.namespace_stats("INFO").await.unwrap().unwrap();
    assert_eq!(stats.vector_count, 12);
    assert!(index.namespace_stats("OTHER").await.unwrap().is_none());

    let query = &stub.requests_to("/query")[0];
    assert_eq!(query.header("api-key").as_deref(), Some("pc-key"));
    assert_eq!(query.body["topK"], 3);
    assert_eq!(query.body["includeMetadata"], true);
    assert_eq!(query.body["namespace"], "INFO");
}

#[tokio::test]
async fn test_pinecone_upsert_and_errors() {
    let stub = StubServer::start(|request| match request.path.as_str() {
        "/vectors/upsert" => {
            let count = request.body["vectors"].as_array().map_or(0, |v| v.len());
            (StatusCode::OK, json!({ "upsertedCount": count }).to_string())
        }
        "/vectors/delete" => (StatusCode::OK, String::new()),
        _ => (StatusCode::UNAUTHORIZED, r#"{"message":"bad key"}"#.to_string()),
    })
    .await;
    let index = PineconeIndex::new("pc-key", &stub.base_url, fast_retry()).unwrap();

    let mut metadata = Metadata::new();
    metadata.insert("text".to_string(), json!("Площа кола"));
    let records = vec![IndexedVector {
        id: "formula-mathematics-5".to_string(),
        values: vec![0.1, 0.2],
        metadata,
    }];
    assert_eq!(index.upsert_batch("INFO", &records).await.unwrap(), 1);
    index.delete_all("INFO").await.unwrap();

    let upsert = &stub.requests_to("/vectors/upsert")[0];
    assert_eq!(upsert.body["namespace"], "INFO");
    assert_eq!(upsert.body["vectors"][0]["id"], "formula-mathematics-5");
    assert_eq!(upsert.body["vectors"][0]["metadata"]["text"], "Площа кола");
    assert_eq!(stub.requests_to("/vectors/delete")[0].body["deleteAll"], true);

    let result = index.search("INFO", &[0.1], 3).await;
    assert!(matches!(result, Err(IndexError::Request { status: 401, .. })));
}

#[tokio::test]
async fn test_school_info_sends_bearer_and_query() {
    let stub =
        StubServer::fixed(StatusCode::OK, r#"{"schoolInfo":"Уроки починаються о 8:30"}"#).await;
    let client = SchoolInfoClient::new(
        &format!("{}/functions/v1/query-school", stub.base_url),
        Some("anon-token".to_string()),
        &fast_retry(),
    )
    .unwrap();

    assert_eq!(client.lookup("Коли уроки?").await, "Уроки починаються о 8:30");

    let request = &stub.requests()[0];
    assert_eq!(request.path, "/functions/v1/query-school");
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer anon-token"));
    assert_eq!(request.body["query"], "Коли уроки?");
}

#[tokio::test]
async fn test_school_info_failure_is_empty() {
    let stub = StubServer::fixed(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"Internal server error"}"#,
    )
    .await;
    let client = SchoolInfoClient::new(&stub.base_url, None, &fast_retry()).unwrap();
    assert_eq!(client.lookup("Коли уроки?").await, "");
}
