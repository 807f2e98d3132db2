// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector index access
//!
//! - [`VectorIndex`] isolates index-specific wire details
//! - [`upsert_in_batches`] implements the best-effort bulk write
//! - Zero hits is a valid outcome, never an error

pub mod memory;
pub mod pinecone;
pub mod types;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info};

pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;
pub use types::{IndexError, IndexedVector, Metadata, NamespaceStats, SearchHit};

/// Trait for namespaced vector stores
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest-neighbour search, ordered by descending score
    ///
    /// An empty namespace or an empty query vector yields an empty result.
    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError>;

    /// Write one batch in a single request; replaces existing ids
    async fn upsert_batch(
        &self,
        namespace: &str,
        records: &[IndexedVector],
    ) -> Result<usize, IndexError>;

    /// Statistics for `namespace`, `None` when it holds no vectors
    async fn namespace_stats(&self, namespace: &str) -> Result<Option<NamespaceStats>, IndexError>;

    /// Remove every vector in `namespace`
    async fn delete_all(&self, namespace: &str) -> Result<(), IndexError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Batching policy for bulk upserts
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Pause inserted between consecutive batches
    pub pause: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            pause: Duration::from_millis(500),
        }
    }
}

/// Outcome of a bulk upsert
#[derive(Debug, Default)]
pub struct UpsertReport {
    /// Records confirmed written
    pub written: usize,
    pub total_batches: usize,
    /// One `IndexError::Batch` per failed batch
    pub failures: Vec<IndexError>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Upsert `records` in bounded batches
///
/// A failed batch is recorded and the loop moves on to the next one.
/// Because upserts replace by id, re-running the whole operation is safe.
pub async fn upsert_in_batches(
    index: &dyn VectorIndex,
    namespace: &str,
    records: &[IndexedVector],
    options: &BatchOptions,
) -> UpsertReport {
    let batch_size = options.batch_size.max(1);
    let total_batches = (records.len() + batch_size - 1) / batch_size;
    let mut report = UpsertReport {
        total_batches,
        ..Default::default()
    };

    for (batch_index, batch) in records.chunks(batch_size).enumerate() {
        if batch_index > 0 && !options.pause.is_zero() {
            tokio::time::sleep(options.pause).await;
        }

        match index.upsert_batch(namespace, batch).await {
            Ok(written) => {
                report.written += written;
                info!(
                    "Uploaded batch {}/{} ({}/{})",
                    batch_index + 1,
                    total_batches,
                    report.written,
                    records.len()
                );
            }
            Err(e) => {
                let failure = IndexError::Batch {
                    batch_index: batch_index + 1,
                    attempted: batch.len(),
                    reason: e.to_string(),
                };
                error!("[{}] {}", failure.error_code(), failure);
                report.failures.push(failure);
            }
        }
    }

    report
}
