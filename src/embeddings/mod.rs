// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding providers
//!
//! Every backend implements [`EmbeddingProvider`] and truncates its input
//! to the configured character limit before submission. A missing
//! credential is reported as [`EmbeddingError::Configuration`] so callers
//! can tell "feature disabled" apart from "feature broken".

pub mod gemini;
pub mod hashed;
pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, EmbeddingBackend, DEFAULT_GEMINI_BASE_URL};
use crate::utils::{RetryPolicy, RetryableError};

pub use gemini::GeminiEmbedder;
pub use hashed::HashedEmbedder;
pub use openai::OpenAiEmbedder;

/// Fixed-length vector produced by an embedding model
pub type EmbeddingVector = Vec<f32>;

/// Errors that can occur while embedding text
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Required credential or setting is absent
    #[error("Embedding provider not configured: {0}")]
    Configuration(String),

    /// Remote call failed (status 0 means the request never got a response)
    #[error("Embedding provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Response arrived but did not contain a usable vector
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    /// Request exceeded its time budget
    #[error("Embedding request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl EmbeddingError {
    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            EmbeddingError::Configuration(_) => "EMBEDDING_NOT_CONFIGURED",
            EmbeddingError::Provider { .. } => "EMBEDDING_PROVIDER_ERROR",
            EmbeddingError::MalformedResponse(_) => "EMBEDDING_MALFORMED_RESPONSE",
            EmbeddingError::Timeout { .. } => "EMBEDDING_TIMEOUT",
        }
    }

    /// Whether this error means the feature is switched off rather than broken
    pub fn is_configuration(&self) -> bool {
        matches!(self, EmbeddingError::Configuration(_))
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        EmbeddingError::Provider {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

impl RetryableError for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Provider { status, .. } => {
                *status == 0 || *status == 429 || *status >= 500
            }
            EmbeddingError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn timed_out(timeout_ms: u64) -> Self {
        EmbeddingError::Timeout { timeout_ms }
    }
}

/// Trait for text embedding backends
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    ///
    /// Text longer than [`EmbeddingProvider::max_input_chars`] is cut to
    /// exactly that many characters before it leaves the process.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Character limit applied to every input
    fn max_input_chars(&self) -> usize;
}

/// Construct the embedding backend selected by configuration
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let retry = RetryPolicy::from_config(&config.http);
    let max_chars = config.embedding.max_input_chars;

    match config.embedding.backend {
        EmbeddingBackend::Gemini => {
            let api_key = config
                .embedding_api_key()
                .ok_or_else(|| {
                    EmbeddingError::Configuration("missing Gemini API key".to_string())
                })?;
            let base_url = config
                .embedding
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string());
            let embedder = GeminiEmbedder::new(
                api_key.to_string(),
                base_url,
                config.embedding.model.clone(),
                max_chars,
                retry,
            )?;
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::OpenAi => {
            let api_key = config
                .embedding_api_key()
                .ok_or_else(|| {
                    EmbeddingError::Configuration("missing OpenAI API key".to_string())
                })?;
            let base_url = config
                .embedding
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_OPENAI_BASE_URL.to_string());
            let embedder = OpenAiEmbedder::new(
                api_key.to_string(),
                base_url,
                config.embedding.model.clone(),
                config.embedding.dimension,
                max_chars,
                retry,
            )?;
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::Hashed => {
            let dimension = config
                .embedding
                .dimension
                .unwrap_or(hashed::DEFAULT_HASHED_DIMENSION);
            Ok(Arc::new(HashedEmbedder::new(dimension, max_chars)?))
        }
    }
}
