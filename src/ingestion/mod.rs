// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Knowledge base ingestion
//!
//! convert -> embed each record (paced) -> upsert in batches
//!
//! Failures never escape a run. Records whose embedding failed are
//! skipped, failed batches are counted, and the run ends with a
//! human-readable summary.

pub mod pacer;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::embeddings::{build_embedder, EmbeddingProvider};
use crate::knowledge::{convert, KnowledgeBase};
use crate::rag::RagError;
use crate::utils::RetryPolicy;
use crate::vector::{
    upsert_in_batches, BatchOptions, IndexedVector, NamespaceStats, PineconeIndex, VectorIndex,
};

pub use pacer::Pacer;

/// How an ingestion run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum IngestionOutcome {
    Completed,
    /// Credentials missing; nothing was sent
    NotConfigured(String),
    /// Every embedding failed, so nothing was uploaded
    NothingEmbedded,
    /// Another run was in progress
    Busy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub outcome: IngestionOutcome,
    pub namespace: String,
    /// Records produced by the converter
    pub converted: usize,
    pub embedded: usize,
    /// Records dropped because their embedding failed
    pub skipped: usize,
    pub uploaded: usize,
    pub failed_batches: usize,
    #[serde(skip)]
    backend: &'static str,
}

impl IngestionReport {
    fn empty(outcome: IngestionOutcome, namespace: &str) -> Self {
        Self {
            outcome,
            namespace: namespace.to_string(),
            converted: 0,
            embedded: 0,
            skipped: 0,
            uploaded: 0,
            failed_batches: 0,
            backend: "",
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == IngestionOutcome::Completed && self.failed_batches == 0
    }

    /// Human-readable summary of the run
    pub fn summary(&self) -> String {
        match &self.outcome {
            IngestionOutcome::NotConfigured(what) => format!("❌ Відсутній {}", what),
            IngestionOutcome::NothingEmbedded => {
                "❌ Не вдалося створити жодного вектора".to_string()
            }
            IngestionOutcome::Busy => "⏳ Завантаження вже виконується".to_string(),
            IngestionOutcome::Completed => {
                let target = match self.backend {
                    "pinecone" => "Pinecone".to_string(),
                    "memory" => "локальному індексі".to_string(),
                    other => other.to_string(),
                };
                let mut summary = format!(
                    "✅ Завантаження завершено! Створено {} векторів у {} (namespace: {})",
                    self.uploaded, target, self.namespace
                );
                if self.skipped > 0 {
                    summary.push_str(&format!("\n⚠️ Пропущено записів: {}", self.skipped));
                }
                if self.failed_batches > 0 {
                    summary.push_str(&format!(
                        "\n⚠️ Не завантажено пакетів: {} (повторний запуск перезапише записи за id)",
                        self.failed_batches
                    ));
                }
                summary
            }
        }
    }
}

/// Ingestion pacing and batching
#[derive(Debug, Clone)]
pub struct IngestionSettings {
    pub namespace: String,
    pub batch: BatchOptions,
    pub embed_delay: Duration,
}

impl IngestionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            namespace: config.index.namespace.clone(),
            batch: BatchOptions {
                batch_size: config.ingestion.batch_size,
                pause: Duration::from_millis(config.ingestion.batch_delay_ms),
            },
            embed_delay: Duration::from_millis(config.ingestion.embed_delay_ms),
        }
    }
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct IngestionJob {
    knowledge: KnowledgeBase,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    settings: IngestionSettings,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl IngestionJob {
    pub fn new(
        knowledge: KnowledgeBase,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        index: Option<Arc<dyn VectorIndex>>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            knowledge,
            embedder,
            index,
            settings,
            busy: AtomicBool::new(false),
        }
    }

    /// Job wired to the configured embedder and Pinecone index
    pub fn from_config(config: &AppConfig, knowledge: KnowledgeBase) -> Self {
        let embedder = if config.embedding_enabled() {
            build_embedder(config)
                .map_err(|e| warn!("[{}] {}", e.error_code(), e))
                .ok()
        } else {
            None
        };
        let index: Option<Arc<dyn VectorIndex>> = if config.index_enabled() {
            PineconeIndex::from_config(&config.index, RetryPolicy::from_config(&config.http))
                .map_err(|e| warn!("[{}] {}", e.error_code(), e))
                .ok()
                .map(|index| Arc::new(index) as Arc<dyn VectorIndex>)
        } else {
            None
        };
        Self::new(knowledge, embedder, index, IngestionSettings::from_config(config))
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Convert, embed and upload the whole knowledge base
    pub async fn run(&self) -> IngestionReport {
        let namespace = self.settings.namespace.as_str();

        let Some(embedder) = &self.embedder else {
            return IngestionReport::empty(
                IngestionOutcome::NotConfigured("ключ для ембедингів (GEMINI_API_KEY)".to_string()),
                namespace,
            );
        };
        let Some(index) = &self.index else {
            return IngestionReport::empty(
                IngestionOutcome::NotConfigured(
                    "доступ до векторної бази (PINECONE_API_KEY, PINECONE_INDEX_HOST)".to_string(),
                ),
                namespace,
            );
        };

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return IngestionReport::empty(IngestionOutcome::Busy, namespace);
        }
        let _guard = BusyGuard(&self.busy);

        let records = convert(&self.knowledge);
        info!(
            "Ingesting {} records into {} namespace {} using {}",
            records.len(),
            index.name(),
            namespace,
            embedder.name()
        );

        let pacer = Pacer::new(self.settings.embed_delay);
        let mut vectors = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for (i, record) in records.iter().enumerate() {
            pacer.wait().await;
            match embedder.embed(&record.text).await {
                Ok(values) => {
                    let mut metadata = record.metadata.clone();
                    metadata.insert("source".to_string(), json!("knowledge_base"));
                    metadata.insert("created_at".to_string(), json!(Utc::now().to_rfc3339()));
                    let length = record.text.chars().count();
                    metadata.insert("content_length".to_string(), json!(length));
                    vectors.push(IndexedVector {
                        id: record.id.clone(),
                        values,
                        metadata,
                    });
                    info!("Embedded {}/{}: {}", i + 1, records.len(), record.label());
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        "[{}] skipping {} ({}): {}",
                        e.error_code(),
                        record.id,
                        record.label(),
                        e
                    );
                }
            }
        }

        let mut report = IngestionReport {
            outcome: IngestionOutcome::Completed,
            namespace: namespace.to_string(),
            converted: records.len(),
            embedded: vectors.len(),
            skipped,
            uploaded: 0,
            failed_batches: 0,
            backend: index.name(),
        };

        if vectors.is_empty() {
            error!("No vectors produced, nothing to upload");
            report.outcome = IngestionOutcome::NothingEmbedded;
            return report;
        }

        let upsert =
            upsert_in_batches(index.as_ref(), namespace, &vectors, &self.settings.batch).await;
        report.uploaded = upsert.written;
        report.failed_batches = upsert.failures.len();

        info!("{}", report.summary());
        report
    }

    /// Current statistics for the namespace
    pub async fn stats(&self) -> Result<Option<NamespaceStats>, RagError> {
        let index = self.require_index()?;
        Ok(index.namespace_stats(&self.settings.namespace).await?)
    }

    /// Human-readable namespace statistics; never fails
    pub async fn namespace_stats(&self) -> String {
        self.describe_stats(&self.stats().await)
    }

    /// Summary line for a result already returned by [`Self::stats`]
    pub fn describe_stats(&self, stats: &Result<Option<NamespaceStats>, RagError>) -> String {
        let namespace = &self.settings.namespace;
        match stats {
            Ok(Some(stats)) if stats.vector_count > 0 => format!(
                "📊 Namespace \"{}\": {} векторів",
                namespace, stats.vector_count
            ),
            Ok(_) => format!("📊 Namespace \"{}\" порожній або не існує", namespace),
            Err(e) => {
                warn!("[{}] {}", e.error_code(), e);
                format!("❌ Не вдалося отримати статистику: {}", e)
            }
        }
    }

    /// Delete every vector in the namespace; never fails
    pub async fn clear_namespace(&self) -> String {
        let namespace = &self.settings.namespace;
        let result = match self.require_index() {
            Ok(index) => index.delete_all(namespace).await.map_err(RagError::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("Cleared namespace {}", namespace);
                format!("✅ Namespace \"{}\" очищено", namespace)
            }
            Err(e) => {
                warn!("[{}] {}", e.error_code(), e);
                format!("❌ Не вдалося очистити namespace \"{}\": {}", namespace, e)
            }
        }
    }

    fn require_index(&self) -> Result<&Arc<dyn VectorIndex>, RagError> {
        self.index.as_ref().ok_or_else(|| {
            RagError::Configuration("missing Pinecone API key or index host".to_string())
        })
    }
}
