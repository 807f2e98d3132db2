// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Generative query service
//!
//! [`GenerationService::query`] never fails: any generator error becomes
//! the fallback answer with an empty context list.

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::utils::{RetryPolicy, RetryableError};

pub use gemini::GeminiGenerator;

/// Answer returned when the model could not be reached
pub const FALLBACK_ANSWER: &str =
    "Вибачте, зараз не вдається зв'язатися з базою знань. Будь ласка, спробуйте пізніше.";

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generative model not configured: {0}")]
    Configuration(String),

    #[error("Generative model error: {status} - {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed generative model response: {0}")]
    MalformedResponse(String),

    #[error("Generative model request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl GenerationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GenerationError::Configuration(_) => "GENERATION_NOT_CONFIGURED",
            GenerationError::Provider { .. } => "GENERATION_PROVIDER_ERROR",
            GenerationError::MalformedResponse(_) => "GENERATION_MALFORMED_RESPONSE",
            GenerationError::Timeout { .. } => "GENERATION_TIMEOUT",
        }
    }

    /// Banner text shown to the end user
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Configuration(_) => {
                "Будь ласка, вкажіть ключ Gemini API (GEMINI_API_KEY) у файлі .env".to_string()
            }
            _ => "Не вдалося отримати відповідь від ШІ. Будь ласка, спробуйте ще раз.".to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        GenerationError::Provider {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Provider { status, .. } => {
                *status == 0 || *status == 429 || *status >= 500
            }
            GenerationError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn timed_out(timeout_ms: u64) -> Self {
        GenerationError::Timeout { timeout_ms }
    }
}

/// Trait for text-generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Raw answer text for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn name(&self) -> &'static str;
}

/// Shaped model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    /// Context passages the answer was grounded on; empty on fallback
    pub context: Vec<String>,
    /// Set when `text` is the fallback answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResponse {
    pub fn fallback(error: Option<String>) -> Self {
        Self {
            text: FALLBACK_ANSWER.to_string(),
            context: Vec::new(),
            error,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

pub struct GenerationService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl GenerationService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Service without a backend; every query returns the fallback
    pub fn unconfigured() -> Self {
        Self { generator: None }
    }

    /// Gemini-backed service, or an unconfigured one when the key is absent
    pub fn from_config(config: &AppConfig) -> Self {
        if !config.generation_enabled() {
            return Self::unconfigured();
        }
        let retry = RetryPolicy::from_config(&config.http);
        match GeminiGenerator::from_config(&config.generation, retry) {
            Ok(generator) => Self::new(Arc::new(generator)),
            Err(e) => {
                warn!("[{}] {}", e.error_code(), e);
                Self::unconfigured()
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn query(&self, prompt: &str) -> GenerationResponse {
        self.query_with_context(prompt, Vec::new()).await
    }

    /// Run `prompt`, attaching `context` to a successful answer
    pub async fn query_with_context(
        &self,
        prompt: &str,
        context: Vec<String>,
    ) -> GenerationResponse {
        let Some(generator) = &self.generator else {
            let err = GenerationError::Configuration("missing Gemini API key".to_string());
            warn!("[{}] {}", err.error_code(), err);
            return GenerationResponse::fallback(Some(err.user_message()));
        };

        match generator.generate(prompt).await {
            Ok(text) => {
                info!(
                    "{} answered with {} chars ({} context passages)",
                    generator.name(),
                    text.chars().count(),
                    context.len()
                );
                GenerationResponse {
                    text,
                    context,
                    error: None,
                }
            }
            Err(e) => {
                warn!("[{}] falling back: {}", e.error_code(), e);
                GenerationResponse::fallback(Some(e.user_message()))
            }
        }
    }
}
