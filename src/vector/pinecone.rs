// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pinecone data-plane client
//!
//! Talks to the index host directly over REST. All Pinecone wire shapes
//! stay inside this module.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::types::{IndexError, IndexedVector, Metadata, NamespaceStats, SearchHit};
use super::VectorIndex;
use crate::config::IndexConfig;
use crate::utils::RetryPolicy;

const API_VERSION: &str = "2024-07";

/// REST client for one Pinecone index
pub struct PineconeIndex {
    client: Client,
    host: String,
    retry: RetryPolicy,
}

impl PineconeIndex {
    /// Create a client for the index at `host`
    ///
    /// # Arguments
    /// * `api_key` - Pinecone API key (sent as `Api-Key`)
    /// * `host` - Index data-plane host; `https://` is added when missing
    pub fn new(api_key: &str, host: &str, retry: RetryPolicy) -> Result<Self, IndexError> {
        if api_key.trim().is_empty() {
            return Err(IndexError::Configuration("missing Pinecone API key".to_string()));
        }
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(IndexError::Configuration("missing Pinecone index host".to_string()));
        }
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| IndexError::Configuration("invalid Pinecone API key".to_string()))?,
        );
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(retry.attempt_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| IndexError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host,
            retry,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &IndexConfig, retry: RetryPolicy) -> Result<Self, IndexError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| IndexError::Configuration("missing Pinecone API key".to_string()))?;
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| IndexError::Configuration("missing Pinecone index host".to_string()))?;
        if let Some(environment) = &config.environment {
            debug!("Pinecone index {} (environment {})", config.index_name, environment);
        }
        Self::new(api_key, host, retry)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, IndexError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.host, path);
        self.retry
            .run(path, || async {
                let response = self
                    .client
                    .post(&url)
                    .json(body)
                    .send()
                    .await
                    .map_err(IndexError::from_reqwest)?;
                parse_response(response).await
            })
            .await
    }
}

async fn parse_response<R: DeserializeOwned>(response: Response) -> Result<R, IndexError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(IndexError::Request {
            status: status.as_u16(),
            message,
        });
    }
    let text = response.text().await.map_err(IndexError::from_reqwest)?;
    // Delete returns an empty body
    let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
    serde_json::from_str(text).map_err(|e| IndexError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, IndexError> {
        if vector.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace,
        };
        let response: QueryResponse = self.post_json("/query", &request).await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| SearchHit::from_match(m.id, m.score, m.metadata.unwrap_or_default()))
            .collect())
    }

    async fn upsert_batch(
        &self,
        namespace: &str,
        records: &[IndexedVector],
    ) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }
        let request = UpsertRequest {
            vectors: records,
            namespace,
        };
        let response: UpsertResponse = self.post_json("/vectors/upsert", &request).await?;
        Ok(response.upserted_count.unwrap_or(records.len()))
    }

    async fn namespace_stats(&self, namespace: &str) -> Result<Option<NamespaceStats>, IndexError> {
        let response: DescribeStatsResponse = self
            .post_json("/describe_index_stats", &serde_json::json!({}))
            .await?;
        Ok(response
            .namespaces
            .get(namespace)
            .map(|summary| NamespaceStats {
                namespace: namespace.to_string(),
                vector_count: summary.vector_count,
            }))
    }

    async fn delete_all(&self, namespace: &str) -> Result<(), IndexError> {
        let request = DeleteRequest {
            delete_all: true,
            namespace,
        };
        let _: serde_json::Value = self.post_json("/vectors/delete", &request).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pinecone"
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexedVector],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DescribeStatsResponse {
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    delete_all: bool,
    namespace: &'a str,
}
