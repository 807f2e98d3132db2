// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use super::http_server::AppState;
use crate::chat::ConversationTurn;
use crate::ingestion::IngestionReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub context: Vec<String>,
    pub context_preview: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatsResponse {
    pub namespace: String,
    pub vector_count: u64,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    #[serde(flatten)]
    pub report: IngestionReport,
    pub summary: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut issues = Vec::new();
    if !state.pipeline.generation_configured() {
        issues.push("generation disabled: GEMINI_API_KEY not set".to_string());
    }
    if !state.pipeline.retrieval_enabled() {
        issues.push("retrieval disabled: embedding or index credentials not set".to_string());
    }

    Json(HealthResponse {
        status: if state.pipeline.generation_configured() {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: crate::version::get_version_string(),
        issues: if issues.is_empty() { None } else { Some(issues) },
    })
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::InvalidRequest("message must not be empty".to_string()));
    }

    let session = state
        .sessions
        .get_or_create(request.session_id, &state.pipeline)
        .await;
    let reply = session.send(&request.message).await?;

    Ok(Json(ChatResponse {
        session_id: session.id().to_string(),
        answer: reply.answer,
        context: reply.context,
        context_preview: reply.context_preview,
        error: reply.error,
        history: session.history().await,
    }))
}

/// End a conversation and drop its history
pub async fn end_chat_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {} not found", session_id)))
    }
}

pub async fn index_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<IndexStatsResponse>, ApiError> {
    let stats = state.ingestion.stats().await;
    let summary = state.ingestion.describe_stats(&stats);
    Ok(Json(IndexStatsResponse {
        namespace: state.ingestion.namespace().to_string(),
        vector_count: stats?.map_or(0, |s| s.vector_count),
        summary,
    }))
}

pub async fn ingest_handler(
    State(state): State<AppState>,
) -> Result<Json<IngestResponse>, ApiError> {
    if state.ingestion.is_busy() {
        return Err(ApiError::Conflict("ingestion already running".to_string()));
    }
    let report = state.ingestion.run().await;
    let summary = report.summary();
    Ok(Json(IngestResponse { report, summary }))
}
