// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationError, TextGenerator};
use crate::config::GenerationConfig;
use crate::utils::RetryPolicy;

pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
    retry: RetryPolicy,
}

impl GeminiGenerator {
    /// Create a generator for `model` (e.g. `gemini-2.0-flash`)
    pub fn new(
        api_key: String,
        base_url: &str,
        model: &str,
        temperature: f32,
        max_output_tokens: u32,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "missing Gemini API key".to_string(),
            ));
        }
        let model = model.trim_start_matches("models/");
        let client = Client::builder()
            .timeout(retry.attempt_timeout)
            .build()
            .map_err(|e| {
                GenerationError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key: api_key.trim().to_string(),
            temperature,
            max_output_tokens,
            retry,
        })
    }

    pub fn from_config(
        config: &GenerationConfig,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GenerationError::Configuration("missing Gemini API key".to_string()))?;
        Self::new(
            api_key,
            &config.base_url,
            &config.model,
            config.temperature,
            config.max_output_tokens,
            retry,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(GenerationError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        body.first_text()
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("Sending {} char prompt to {}", prompt.chars().count(), self.endpoint);
        self.retry
            .run("gemini generateContent", || self.generate_once(prompt))
            .await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> Result<String, GenerationError> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::MalformedResponse(
                    "missing candidates[0].content.parts[0].text".to_string(),
                )
            })
    }
}
