// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the school assistant

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "rag-pipeline",
    "gemini-generation",
    "gemini-embeddings",
    "openai-embeddings",
    "hashed-embeddings",
    "pinecone-index",
    "knowledge-ingestion",
    "school-info",
    "bounded-retry",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("School Assistant {} ({})", VERSION_NUMBER, BUILD_DATE)
}
