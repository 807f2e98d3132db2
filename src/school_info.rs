// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! School-info lookup
//!
//! The hosted function receives `{query}` with bearer auth and answers
//! `{schoolInfo}`. Absence or failure of the service is never fatal: the
//! lookup yields an empty string.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SchoolInfoConfig;
use crate::utils::{RetryPolicy, RetryableError};

/// Source of free-text information about the school
#[async_trait]
pub trait SchoolInfoSource: Send + Sync {
    /// Information relevant to `query`, or `""` when unavailable
    async fn lookup(&self, query: &str) -> String;
}

pub struct SchoolInfoClient {
    client: Client,
    url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

/// Failed lookup; never leaves this module
#[derive(Debug)]
struct LookupError {
    status: u16,
    message: String,
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.status, self.message)
    }
}

impl RetryableError for LookupError {
    fn is_retryable(&self) -> bool {
        self.status == 0 || self.status == 429 || self.status >= 500
    }

    fn timed_out(timeout_ms: u64) -> Self {
        LookupError {
            status: 0,
            message: format!("timed out after {}ms", timeout_ms),
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

impl SchoolInfoClient {
    pub fn new(url: &str, token: Option<String>, retry: &RetryPolicy) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let client = match Client::builder().timeout(retry.attempt_timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("School info client disabled: {}", e);
                return None;
            }
        };
        Some(Self {
            client,
            url: url.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            retry: retry.clone(),
        })
    }

    /// `None` when no URL is configured
    pub fn from_config(config: &SchoolInfoConfig, retry: &RetryPolicy) -> Option<Self> {
        config
            .url
            .as_deref()
            .and_then(|url| Self::new(url, config.token.clone(), retry))
    }

    async fn fetch(&self, query: &str) -> Result<String, LookupError> {
        let mut request = self.client.post(&self.url).json(&LookupRequest { query });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LookupError {
                status: status.as_u16(),
                message,
            });
        }
        let body: LookupResponse = response.json().await?;
        Ok(body.school_info.unwrap_or_default())
    }
}

#[async_trait]
impl SchoolInfoSource for SchoolInfoClient {
    async fn lookup(&self, query: &str) -> String {
        match self.retry.run("school info lookup", || self.fetch(query)).await {
            Ok(info) => {
                debug!("School info: {} chars", info.chars().count());
                info
            }
            Err(e) => {
                warn!("School info lookup failed: {}", e);
                String::new()
            }
        }
    }
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    school_info: Option<String>,
}
