// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for vector index access

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::utils::RetryableError;

/// Metadata attached to an indexed vector (string keys, scalar or list values)
pub type Metadata = Map<String, Value>;

/// A vector ready to be written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Metadata,
}

/// A single nearest-neighbour match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Display text, taken from the `text` metadata field
    pub text: String,
    pub score: f32,
    pub metadata: Metadata,
}

impl SearchHit {
    pub fn from_match(id: String, score: f32, metadata: Metadata) -> Self {
        let text = metadata
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            text,
            score,
            metadata,
        }
    }
}

/// Per-namespace statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    pub namespace: String,
    pub vector_count: u64,
}

/// Errors that can occur while talking to the vector index
#[derive(Error, Debug)]
pub enum IndexError {
    /// Credential or host missing
    #[error("Vector index not configured: {0}")]
    Configuration(String),

    /// Request failed (status 0 means no response was received)
    #[error("Vector index request failed: {status} - {message}")]
    Request { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Malformed vector index response: {0}")]
    MalformedResponse(String),

    /// Records were rejected by the index
    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    /// One upsert batch failed; carries enough detail for a manual retry
    #[error("Upsert batch {batch_index} ({attempted} records) failed: {reason}")]
    Batch {
        batch_index: usize,
        attempted: usize,
        reason: String,
    },

    #[error("Vector index request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl IndexError {
    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            IndexError::Configuration(_) => "INDEX_NOT_CONFIGURED",
            IndexError::Request { .. } => "INDEX_REQUEST_FAILED",
            IndexError::MalformedResponse(_) => "INDEX_MALFORMED_RESPONSE",
            IndexError::InvalidRecord { .. } => "INDEX_INVALID_RECORD",
            IndexError::Batch { .. } => "INDEX_BATCH_FAILED",
            IndexError::Timeout { .. } => "INDEX_TIMEOUT",
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        IndexError::Request {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

impl RetryableError for IndexError {
    fn is_retryable(&self) -> bool {
        match self {
            IndexError::Request { status, .. } => *status == 0 || *status == 429 || *status >= 500,
            IndexError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn timed_out(timeout_ms: u64) -> Self {
        IndexError::Timeout { timeout_ms }
    }
}
