// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process vector index
//!
//! Namespaced brute-force cosine search with replace-by-id upserts.
//! Serves offline runs of the CLI and the test suite.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::types::{IndexError, IndexedVector, NamespaceStats, SearchHit};
use super::VectorIndex;

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    namespaces: RwLock<HashMap<String, HashMap<String, IndexedVector>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored vector by id
    pub async fn get(&self, namespace: &str, id: &str) -> Option<IndexedVector> {
        let namespaces = self.namespaces.read().await;
        namespaces.get(namespace).and_then(|ns| ns.get(id)).cloned()
    }

    /// Number of vectors in a namespace
    pub async fn count(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.read().await;
        namespaces.get(namespace).map_or(0, |ns| ns.len())
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if vector.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let namespaces = self.namespaces.read().await;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<SearchHit> = entries
            .values()
            .map(|entry| {
                SearchHit::from_match(
                    entry.id.clone(),
                    cosine_similarity(vector, &entry.values),
                    entry.metadata.clone(),
                )
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn upsert_batch(
        &self,
        namespace: &str,
        records: &[IndexedVector],
    ) -> Result<usize, IndexError> {
        // Validate the whole batch first so a bad record never leaves it half-written
        for record in records {
            if record.values.is_empty() {
                return Err(IndexError::InvalidRecord {
                    id: record.id.clone(),
                    reason: "empty vector".to_string(),
                });
            }
            if record.values.iter().any(|v| !v.is_finite()) {
                return Err(IndexError::InvalidRecord {
                    id: record.id.clone(),
                    reason: "vector contains NaN or Infinity".to_string(),
                });
            }
        }

        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            entries.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn namespace_stats(&self, namespace: &str) -> Result<Option<NamespaceStats>, IndexError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .filter(|ns| !ns.is_empty())
            .map(|ns| NamespaceStats {
                namespace: namespace.to_string(),
                vector_count: ns.len() as u64,
            }))
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), IndexError> {
        let mut namespaces = self.namespaces.write().await;
        namespaces.remove(namespace);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
