// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gemini `embedContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
use crate::utils::{truncate_chars, RetryPolicy};

/// Embeddings client for the Gemini API (key passed as a query parameter)
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_input_chars: usize,
    retry: RetryPolicy,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder
    ///
    /// # Arguments
    /// * `api_key` - Gemini API key
    /// * `base_url` - API base, e.g. `https://generativelanguage.googleapis.com/v1beta`
    /// * `model` - Model id with or without the `models/` prefix
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        max_input_chars: usize,
        retry: RetryPolicy,
    ) -> Result<Self, EmbeddingError> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::Configuration(
                "missing Gemini API key".to_string(),
            ));
        }
        let model = if model.starts_with("models/") {
            model
        } else {
            format!("models/{}", model)
        };
        let client = Client::builder()
            .timeout(retry.attempt_timeout)
            .build()
            .map_err(|e| {
                EmbeddingError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;
        let endpoint = format!("{}/{}:embedContent", base_url.trim_end_matches('/'), model);

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.trim().to_string(),
            model,
            max_input_chars,
            retry,
        })
    }

    async fn embed_once(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let request = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(EmbeddingError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let values = body
            .embedding
            .map(|e| e.values)
            .ok_or_else(|| {
                EmbeddingError::MalformedResponse("missing embedding.values".to_string())
            })?;
        if values.is_empty() {
            return Err(EmbeddingError::MalformedResponse(
                "empty embedding vector".to_string(),
            ));
        }
        Ok(values)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let input = truncate_chars(text, self.max_input_chars);
        debug!(
            "Embedding {} chars with {} (original {})",
            input.chars().count(),
            self.model,
            text.chars().count()
        );
        self.retry
            .run("gemini embedContent", || self.embed_once(input))
            .await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}
