// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local feature-hashing embedder
//!
//! Produces deterministic vectors without any network call. Each word is
//! hashed into one of `dimension` buckets with a hash-derived sign, so
//! texts sharing vocabulary land close together under cosine similarity.
//! Useful for offline runs and tests; retrieval quality is far below a
//! trained model.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
use crate::utils::truncate_chars;

pub const DEFAULT_HASHED_DIMENSION: usize = 256;

pub struct HashedEmbedder {
    dimension: usize,
    max_input_chars: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize, max_input_chars: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::Configuration(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            max_input_chars,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, text: &str) -> EmbeddingVector {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(self.vectorize(truncate_chars(text, self.max_input_chars)))
    }

    fn name(&self) -> &'static str {
        "hashed"
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }
}
