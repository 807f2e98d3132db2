// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Subcommand implementations

use anyhow::{anyhow, bail, Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::api::{start_server, AppState};
use crate::chat::{ChatSession, SessionStore, TurnReply};
use crate::config::AppConfig;
use crate::embeddings::{EmbeddingProvider, HashedEmbedder, hashed::DEFAULT_HASHED_DIMENSION};
use crate::generation::GenerationService;
use crate::ingestion::{IngestionJob, IngestionSettings};
use crate::knowledge::KnowledgeBase;
use crate::rag::{PipelineSettings, RagError, RagPipeline};
use crate::vector::{InMemoryIndex, VectorIndex};

/// Pipeline and ingestion job sharing one set of backends
struct Runtime {
    pipeline: Arc<RagPipeline>,
    ingestion: Arc<IngestionJob>,
}

impl Runtime {
    fn build(config: &AppConfig, offline: bool, knowledge: KnowledgeBase) -> Result<Self> {
        if !offline {
            return Ok(Self {
                pipeline: Arc::new(RagPipeline::from_config(config)),
                ingestion: Arc::new(IngestionJob::from_config(config, knowledge)),
            });
        }

        let dimension = config.embedding.dimension.unwrap_or(DEFAULT_HASHED_DIMENSION);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            HashedEmbedder::new(dimension, config.embedding.max_input_chars)
                .map_err(|e| anyhow!("{}", e))?,
        );
        let index: Arc<dyn VectorIndex> = Arc::new(InMemoryIndex::new());

        let pipeline = RagPipeline::new(
            GenerationService::from_config(config),
            PipelineSettings::from_config(config),
        )
        .with_retrieval(embedder.clone(), index.clone());
        let mut settings = IngestionSettings::from_config(config);
        settings.embed_delay = std::time::Duration::ZERO;
        settings.batch.pause = std::time::Duration::ZERO;
        let ingestion = IngestionJob::new(knowledge, Some(embedder), Some(index), settings);

        Ok(Self {
            pipeline: Arc::new(pipeline),
            ingestion: Arc::new(ingestion),
        })
    }

    /// Offline runs start from an empty index, so fill it first
    async fn seed_if_offline(&self, offline: bool) {
        if offline {
            let report = self.ingestion.run().await;
            info!("{}", report.summary());
        }
    }
}

fn print_reply(reply: &TurnReply) {
    println!("\n🤖 {}\n", reply.answer);
    if !reply.context_preview.is_empty() {
        println!("📚 Контекст:");
        for (i, preview) in reply.context_preview.iter().enumerate() {
            println!("  [{}] {}", i + 1, preview.replace('\n', " "));
        }
        println!();
    }
    if let Some(error) = &reply.error {
        eprintln!("⚠️  {}", error);
    }
}

pub async fn ask(config: &AppConfig, offline: bool, question: &str) -> Result<()> {
    let runtime = Runtime::build(config, offline, KnowledgeBase::builtin())?;
    runtime.seed_if_offline(offline).await;

    let session = ChatSession::new(runtime.pipeline.clone());
    match session.send(question).await {
        Ok(reply) => {
            print_reply(&reply);
            Ok(())
        }
        Err(e) => bail!("{}", e.user_message()),
    }
}

pub async fn chat(config: &AppConfig, offline: bool) -> Result<()> {
    let runtime = Runtime::build(config, offline, KnowledgeBase::builtin())?;
    runtime.seed_if_offline(offline).await;

    let session = ChatSession::new(runtime.pipeline.clone());
    println!("Шкільний помічник. Введіть запитання (або \"exit\" для виходу).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if matches!(line, "exit" | "quit" | "вихід") {
            break;
        }

        match session.send(line).await {
            Ok(reply) => print_reply(&reply),
            Err(RagError::EmptyInput) => continue,
            Err(e @ RagError::Configuration(_)) => bail!("{}", e.user_message()),
            Err(e) => eprintln!("⚠️  {}", e.user_message()),
        }
    }

    info!(
        "Chat session {} ended after {} messages",
        session.id(),
        session.history().await.len()
    );
    Ok(())
}

pub async fn ingest(config: &AppConfig, offline: bool, knowledge: Option<&Path>) -> Result<()> {
    let knowledge = match knowledge {
        Some(path) => KnowledgeBase::from_json_file(path)
            .with_context(|| format!("failed to load knowledge base {}", path.display()))?,
        None => KnowledgeBase::builtin(),
    };
    let runtime = Runtime::build(config, offline, knowledge)?;

    let report = runtime.ingestion.run().await;
    let summary = report.summary();
    if !report.is_success() {
        bail!("{}", summary);
    }
    println!("{}", summary);
    Ok(())
}

pub async fn stats(config: &AppConfig, offline: bool) -> Result<()> {
    let runtime = Runtime::build(config, offline, KnowledgeBase::builtin())?;
    println!("{}", runtime.ingestion.namespace_stats().await);
    Ok(())
}

pub async fn clear(config: &AppConfig, offline: bool) -> Result<()> {
    let runtime = Runtime::build(config, offline, KnowledgeBase::builtin())?;
    println!("{}", runtime.ingestion.clear_namespace().await);
    Ok(())
}

pub async fn serve(config: &AppConfig, offline: bool, host: &str, port: u16) -> Result<()> {
    let runtime = Runtime::build(config, offline, KnowledgeBase::builtin())?;
    runtime.seed_if_offline(offline).await;

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;
    let sessions = SessionStore::from_config(&config.sessions);
    let state = AppState::with_sessions(runtime.pipeline, runtime.ingestion, sessions);
    start_server(state, addr).await
}
