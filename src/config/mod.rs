// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration for the assistant
//!
//! Values come from three layers, later layers overriding earlier ones:
//! - compiled defaults (`AppConfig::default()`)
//! - an optional TOML file (`AppConfig::from_file`)
//! - environment variables (`AppConfig::apply_env`)
//!
//! Absence of the generative-model key disables sending entirely.
//! Absence of embedding or index keys only disables retrieval.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Default generative model endpoint base
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Embedding backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Gemini `embedContent` endpoint
    Gemini,
    /// Any OpenAI-compatible `/embeddings` endpoint
    OpenAi,
    /// Local deterministic hashing embedder (offline, no credentials)
    Hashed,
}

impl EmbeddingBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" | "open-ai" | "open_ai" => Some(Self::OpenAi),
            "hashed" | "hash" | "local" => Some(Self::Hashed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Hashed => "hashed",
        }
    }
}

/// Generative model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }
}

/// Embedding model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Falls back to the generation key for the Gemini backend
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    /// Requested dimension (OpenAI) or produced dimension (hashed)
    pub dimension: Option<usize>,
    /// Input is cut to this many characters before submission
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Gemini,
            api_key: None,
            base_url: None,
            model: "models/text-embedding-004".to_string(),
            dimension: None,
            max_input_chars: 5000,
        }
    }
}

/// Vector index (Pinecone data plane) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub api_key: Option<String>,
    /// Data-plane host of the index, e.g. `https://vpu29-abc123.svc.pinecone.io`
    pub host: Option<String>,
    pub environment: Option<String>,
    pub index_name: String,
    pub namespace: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: None,
            environment: None,
            index_name: "vpu29".to_string(),
            namespace: "INFO".to_string(),
        }
    }
}

/// School-info collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolInfoConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    /// When false the lookup still runs but its result is not put in the prompt
    pub include_in_prompt: bool,
}

impl Default for SchoolInfoConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            include_in_prompt: true,
        }
    }
}

/// Retrieval knobs for the read path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            preview_chars: 200,
        }
    }
}

/// Batch ingestion knobs for the write path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub batch_size: usize,
    pub embed_delay_ms: u64,
    pub batch_delay_ms: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            embed_delay_ms: 200,
            batch_delay_ms: 500,
        }
    }
}

/// Timeout and retry policy shared by every outbound call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 1,
            retry_backoff_ms: 500,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Lifetime of in-memory chat sessions served over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A session untouched for this long is dropped with its history
    pub idle_ttl_secs: u64,
    /// The least recently active idle session is dropped beyond this
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 1800,
            max_sessions: 1000,
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub school_info: SchoolInfoConfig,
    pub retrieval: RetrievalConfig,
    pub ingestion: IngestionConfig,
    pub http: HttpConfig,
    pub sessions: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a TOML file, then apply the environment overlay
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Override fields from environment variables that are set
    pub fn apply_env(&mut self) {
        if let Some(key) = env_string("GEMINI_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Some(model) = env_string("GEMINI_MODEL") {
            self.generation.model = model;
        }
        if let Some(url) = env_string("GEMINI_BASE_URL") {
            self.generation.base_url = url;
        }
        if let Some(temperature) = env_parse("GEMINI_TEMPERATURE") {
            self.generation.temperature = temperature;
        }
        if let Some(max_tokens) = env_parse("GEMINI_MAX_OUTPUT_TOKENS") {
            self.generation.max_output_tokens = max_tokens;
        }

        if let Some(backend) = env_string("EMBEDDING_BACKEND") {
            match EmbeddingBackend::from_str(&backend) {
                Some(parsed) => self.embedding.backend = parsed,
                None => tracing::warn!(
                    "Unknown EMBEDDING_BACKEND '{}', keeping {}",
                    backend,
                    self.embedding.backend.as_str()
                ),
            }
        }
        if let Some(key) = env_string("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = env_string("EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(url);
        }
        if let Some(model) = env_string("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dimension) = env_parse("EMBEDDING_DIMENSION") {
            self.embedding.dimension = Some(dimension);
        }
        if let Some(max_chars) = env_parse("EMBED_MAX_CHARS") {
            self.embedding.max_input_chars = max_chars;
        }

        if let Some(key) = env_string("PINECONE_API_KEY") {
            self.index.api_key = Some(key);
        }
        if let Some(host) = env_string("PINECONE_INDEX_HOST") {
            self.index.host = Some(host);
        }
        if let Some(environment) = env_string("PINECONE_ENVIRONMENT") {
            self.index.environment = Some(environment);
        }
        if let Some(name) = env_string("PINECONE_INDEX_NAME") {
            self.index.index_name = name;
        }
        if let Some(namespace) = env_string("PINECONE_NAMESPACE") {
            self.index.namespace = namespace;
        }

        if let Some(url) = env_string("SCHOOL_INFO_URL") {
            self.school_info.url = Some(url);
        }
        if let Some(token) = env_string("SCHOOL_INFO_TOKEN") {
            self.school_info.token = Some(token);
        }
        if let Ok(flag) = env::var("SCHOOL_INFO_IN_PROMPT") {
            self.school_info.include_in_prompt = parse_flag(&flag);
        }

        if let Some(top_k) = env_parse("RAG_TOP_K") {
            self.retrieval.top_k = top_k;
        }
        if let Some(preview) = env_parse("CONTEXT_PREVIEW_CHARS") {
            self.retrieval.preview_chars = preview;
        }

        if let Some(batch_size) = env_parse("INGEST_BATCH_SIZE") {
            self.ingestion.batch_size = batch_size;
        }
        if let Some(delay) = env_parse("INGEST_EMBED_DELAY_MS") {
            self.ingestion.embed_delay_ms = delay;
        }
        if let Some(delay) = env_parse("INGEST_BATCH_DELAY_MS") {
            self.ingestion.batch_delay_ms = delay;
        }

        if let Some(timeout) = env_parse("HTTP_TIMEOUT_MS") {
            self.http.timeout_ms = timeout;
        }
        if let Some(retries) = env_parse("HTTP_MAX_RETRIES") {
            self.http.max_retries = retries;
        }
        if let Some(backoff) = env_parse("HTTP_RETRY_BACKOFF_MS") {
            self.http.retry_backoff_ms = backoff;
        }

        if let Some(ttl) = env_parse("SESSION_IDLE_TTL_SECS") {
            self.sessions.idle_ttl_secs = ttl;
        }
        if let Some(max) = env_parse("MAX_SESSIONS") {
            self.sessions.max_sessions = max;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.retrieval.top_k == 0 {
            return Err("top_k must be greater than 0".to_string());
        }
        if self.embedding.max_input_chars == 0 {
            return Err("Embedding max input chars must be greater than 0".to_string());
        }
        if self.ingestion.batch_size == 0 {
            return Err("Ingestion batch size must be greater than 0".to_string());
        }
        if self.http.timeout_ms == 0 {
            return Err("HTTP timeout must be greater than 0".to_string());
        }
        if self.sessions.idle_ttl_secs == 0 {
            return Err("Session idle TTL must be greater than 0".to_string());
        }
        if self.sessions.max_sessions == 0 {
            return Err("Max sessions must be greater than 0".to_string());
        }
        if self.embedding.backend == EmbeddingBackend::Hashed
            && self.embedding.dimension == Some(0)
        {
            return Err("Hashed embedding dimension must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Key used by the embedding backend, if any
    pub fn embedding_api_key(&self) -> Option<&str> {
        let own = self.embedding.api_key.as_deref().filter(|k| !k.trim().is_empty());
        match self.embedding.backend {
            EmbeddingBackend::Gemini => own.or_else(|| self.generation_api_key()),
            EmbeddingBackend::OpenAi => own,
            EmbeddingBackend::Hashed => None,
        }
    }

    pub fn generation_api_key(&self) -> Option<&str> {
        self.generation.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Whether the generative model can be called at all
    pub fn generation_enabled(&self) -> bool {
        self.generation_api_key().is_some()
    }

    /// Whether embedding credentials are present for the selected backend
    pub fn embedding_enabled(&self) -> bool {
        self.embedding.backend == EmbeddingBackend::Hashed || self.embedding_api_key().is_some()
    }

    /// Whether the vector index can be reached
    pub fn index_enabled(&self) -> bool {
        self.index.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
            && self.index.host.as_deref().map_or(false, |h| !h.trim().is_empty())
    }

    /// Retrieval runs only when both the embedder and the index are configured
    pub fn retrieval_enabled(&self) -> bool {
        self.embedding_enabled() && self.index_enabled()
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
