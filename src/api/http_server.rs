// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    chat_handler, end_chat_handler, health_handler, index_stats_handler, ingest_handler,
};
use crate::chat::SessionStore;
use crate::ingestion::IngestionJob;
use crate::rag::RagPipeline;

/// Sessions live in memory only and are gone after a restart
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub ingestion: Arc<IngestionJob>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>, ingestion: Arc<IngestionJob>) -> Self {
        Self::with_sessions(pipeline, ingestion, SessionStore::default())
    }

    pub fn with_sessions(
        pipeline: Arc<RagPipeline>,
        ingestion: Arc<IngestionJob>,
        sessions: SessionStore,
    ) -> Self {
        Self {
            pipeline,
            ingestion,
            sessions,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/chat/:session_id", delete(end_chat_handler))
        .route("/v1/index/stats", get(index_stats_handler))
        .route("/v1/ingest", post(ingest_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let sweep_every = state.sessions.idle_ttl().min(Duration::from_secs(60));
    let sweeper = state.sessions.spawn_sweeper(sweep_every);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", listener.local_addr()?);

    let served = axum::serve(listener, app).await;
    sweeper.abort();
    served?;

    Ok(())
}
