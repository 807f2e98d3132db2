// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Ingestion runs against a stub Pinecone server and mocked indexes

use async_trait::async_trait;
use axum::http::StatusCode;
use mockall::mock;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::test_knowledge_conversion::small_knowledge_base;
use crate::common::{fast_retry, StubServer};
use school_assistant::embeddings::{EmbeddingError, EmbeddingProvider, HashedEmbedder};
use school_assistant::ingestion::{IngestionJob, IngestionOutcome, IngestionSettings};
use school_assistant::knowledge::KnowledgeBase;
use school_assistant::vector::{
    BatchOptions, IndexError, IndexedVector, InMemoryIndex, NamespaceStats, PineconeIndex,
    SearchHit, VectorIndex,
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

fn settings(batch_size: usize) -> IngestionSettings {
    IngestionSettings {
        namespace: "INFO".to_string(),
        batch: BatchOptions {
            batch_size,
            pause: Duration::ZERO,
        },
        embed_delay: Duration::ZERO,
    }
}

fn hashed() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashedEmbedder::new(16, 5000).unwrap())
}

#[tokio::test]
async fn test_pinecone_upserts_in_bounded_batches() {
    let stub = StubServer::start(|request| match request.path.as_str() {
        "/vectors/upsert" => {
            let count = request.body["vectors"].as_array().map_or(0, |v| v.len());
            (StatusCode::OK, json!({ "upsertedCount": count }).to_string())
        }
        _ => (StatusCode::NOT_FOUND, "{}".to_string()),
    })
    .await;
    let index = PineconeIndex::new("pc-key", &stub.base_url, fast_retry()).unwrap();
    let job = IngestionJob::new(
        small_knowledge_base(),
        Some(hashed()),
        Some(Arc::new(index)),
        settings(5),
    );

    let report = job.run().await;
    assert!(report.is_success());
    assert_eq!(report.converted, 12);
    assert_eq!(report.uploaded, 12);
    assert!(report.summary().contains("Pinecone"));

    let upserts = stub.requests_to("/vectors/upsert");
    let sizes: Vec<usize> = upserts
        .iter()
        .map(|r| r.body["vectors"].as_array().map_or(0, |v| v.len()))
        .collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    assert!(upserts.iter().all(|r| r.body["namespace"] == "INFO"));
    assert_eq!(upserts[2].body["vectors"][1]["id"], "book-11");
    assert_eq!(upserts[0].body["vectors"][0]["metadata"]["source"], "knowledge_base");
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_the_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut index = MockIndex::new();
    index.expect_upsert_batch().times(3).returning(move |_, records| {
        if seen.fetch_add(1, Ordering::SeqCst) == 1 {
            Err(IndexError::Request {
                status: 500,
                message: "Internal".to_string(),
            })
        } else {
            Ok(records.len())
        }
    });
    index.expect_name().return_const("mock");

    let job = IngestionJob::new(
        small_knowledge_base(),
        Some(hashed()),
        Some(Arc::new(index)),
        settings(5),
    );
    let report = job.run().await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.outcome, IngestionOutcome::Completed);
    assert_eq!(report.uploaded, 7);
    assert_eq!(report.failed_batches, 1);
    assert!(!report.is_success());
    assert!(report.summary().contains("Не завантажено пакетів: 1"));
}

#[tokio::test]
async fn test_all_embeddings_failing_uploads_nothing() {
    struct Refusing;

    #[async_trait]
    impl EmbeddingProvider for Refusing {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Provider {
                status: 429,
                message: "quota".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "refusing"
        }

        fn max_input_chars(&self) -> usize {
            5000
        }
    }

    let mut index = MockIndex::new();
    index.expect_upsert_batch().times(0);
    index.expect_name().return_const("mock");

    let job = IngestionJob::new(
        small_knowledge_base(),
        Some(Arc::new(Refusing)),
        Some(Arc::new(index)),
        settings(5),
    );
    let report = job.run().await;

    assert_eq!(report.outcome, IngestionOutcome::NothingEmbedded);
    assert_eq!(report.skipped, 12);
    assert_eq!(report.summary(), "❌ Не вдалося створити жодного вектора");
}

#[tokio::test]
async fn test_missing_embedder_sends_nothing() {
    let mut index = MockIndex::new();
    index.expect_upsert_batch().times(0);

    let job = IngestionJob::new(
        KnowledgeBase::builtin(),
        None,
        Some(Arc::new(index)),
        settings(50),
    );
    let report = job.run().await;

    assert!(matches!(report.outcome, IngestionOutcome::NotConfigured(_)));
    assert!(report.summary().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    struct Slow;

    #[async_trait]
    impl EmbeddingProvider for Slow {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![1.0, text.len() as f32])
        }

        fn name(&self) -> &'static str {
            "slow"
        }

        fn max_input_chars(&self) -> usize {
            5000
        }
    }

    let index = Arc::new(InMemoryIndex::new());
    let job = Arc::new(IngestionJob::new(
        small_knowledge_base(),
        Some(Arc::new(Slow)),
        Some(index.clone()),
        settings(5),
    ));

    let first = {
        let job = job.clone();
        tokio::spawn(async move { job.run().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(job.is_busy());

    let second = job.run().await;
    assert_eq!(second.outcome, IngestionOutcome::Busy);

    let first = first.await.unwrap();
    assert!(first.is_success());
    assert!(!job.is_busy());
    assert_eq!(index.count("INFO").await, 12);
}

#[tokio::test]
async fn test_pinecone_stats_and_clear_messages() {
    let stub = StubServer::start(|request| match request.path.as_str() {
        "/describe_index_stats" => (
            StatusCode::OK,
            json!({"namespaces": {"INFO": {"vectorCount": 12}}}).to_string(),
        ),
        "/vectors/delete" => (StatusCode::OK, "{}".to_string()),
        _ => (StatusCode::NOT_FOUND, "{}".to_string()),
    })
    .await;
    let index = PineconeIndex::new("pc-key", &stub.base_url, fast_retry()).unwrap();
    let job = IngestionJob::new(
        KnowledgeBase::builtin(),
        Some(hashed()),
        Some(Arc::new(index)),
        settings(50),
    );

    assert_eq!(job.namespace_stats().await, "📊 Namespace \"INFO\": 12 векторів");
    assert_eq!(job.clear_namespace().await, "✅ Namespace \"INFO\" очищено");

    let delete = &stub.requests_to("/vectors/delete")[0];
    assert_eq!(delete.body["deleteAll"], true);
    assert_eq!(delete.body["namespace"], "INFO");
}
