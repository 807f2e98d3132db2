// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-turn retrieval-augmented query pipeline
//!
//! school info -> embed -> search -> assemble -> prompt -> generate
//!
//! Steps run sequentially. Retrieval failures degrade to a plain-mode
//! prompt; generation failures become the fallback answer.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::context::{AssembledContext, ContextAssembler};
use super::prompt::{BuiltPrompt, PromptBuilder};
use crate::config::AppConfig;
use crate::embeddings::{build_embedder, EmbeddingProvider};
use crate::generation::{GenerationResponse, GenerationService};
use crate::school_info::{SchoolInfoClient, SchoolInfoSource};
use crate::utils::RetryPolicy;
use crate::vector::{PineconeIndex, VectorIndex};

/// What the retrieval step did for one turn
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalStatus {
    /// No embedder or index configured; search was never attempted
    Disabled,
    /// Embedding or search failed; the turn continued without context
    Degraded(String),
    /// Search ran and returned this many hits (zero is valid)
    Hits(usize),
}

/// Everything produced by one pass through the pipeline
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: GenerationResponse,
    pub prompt: BuiltPrompt,
    pub retrieval: RetrievalStatus,
}

/// Tunables that do not depend on any backend
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub namespace: String,
    pub top_k: usize,
    pub preview_chars: usize,
    pub max_text_chars: usize,
    /// Prepend fetched school info to the prompt, or only fetch and log it
    pub include_school_info: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            namespace: config.index.namespace.clone(),
            top_k: config.retrieval.top_k,
            preview_chars: config.retrieval.preview_chars,
            max_text_chars: config.embedding.max_input_chars,
            include_school_info: config.school_info.include_in_prompt,
        }
    }
}

pub struct RagPipeline {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    school_info: Option<Arc<dyn SchoolInfoSource>>,
    generation: GenerationService,
    assembler: ContextAssembler,
    prompts: PromptBuilder,
    settings: PipelineSettings,
}

impl RagPipeline {
    /// Pipeline with generation only; add retrieval and school info with the `with_*` methods
    pub fn new(generation: GenerationService, settings: PipelineSettings) -> Self {
        Self {
            embedder: None,
            index: None,
            school_info: None,
            generation,
            assembler: ContextAssembler::new(settings.preview_chars),
            prompts: PromptBuilder::new(settings.max_text_chars),
            settings,
        }
    }

    pub fn with_retrieval(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        self.embedder = Some(embedder);
        self.index = Some(index);
        self
    }

    pub fn with_school_info(mut self, source: Arc<dyn SchoolInfoSource>) -> Self {
        self.school_info = Some(source);
        self
    }

    /// Wire every collaborator the configuration has credentials for
    ///
    /// Missing retrieval credentials silently disable retrieval.
    pub fn from_config(config: &AppConfig) -> Self {
        let retry = RetryPolicy::from_config(&config.http);
        let mut pipeline = Self::new(
            GenerationService::from_config(config),
            PipelineSettings::from_config(config),
        );

        if config.retrieval_enabled() {
            let embedder = build_embedder(config);
            let index = PineconeIndex::from_config(&config.index, retry.clone());
            match (embedder, index) {
                (Ok(embedder), Ok(index)) => {
                    pipeline = pipeline.with_retrieval(embedder, Arc::new(index));
                }
                (Err(e), _) => warn!("[{}] retrieval disabled: {}", e.error_code(), e),
                (_, Err(e)) => warn!("[{}] retrieval disabled: {}", e.error_code(), e),
            }
        } else {
            info!("Retrieval credentials absent, answering without context");
        }

        if let Some(client) = SchoolInfoClient::from_config(&config.school_info, &retry) {
            pipeline = pipeline.with_school_info(Arc::new(client));
        }

        pipeline
    }

    pub fn generation_configured(&self) -> bool {
        self.generation.is_configured()
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.embedder.is_some() && self.index.is_some()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    /// Embed the query and search the namespace
    pub async fn retrieve(&self, query: &str) -> (AssembledContext, RetrievalStatus) {
        let (Some(embedder), Some(index)) = (&self.embedder, &self.index) else {
            return (AssembledContext::empty(), RetrievalStatus::Disabled);
        };

        let vector = match embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("[{}] embedding failed, continuing without context: {}", e.error_code(), e);
                return (AssembledContext::empty(), RetrievalStatus::Degraded(e.to_string()));
            }
        };

        match index
            .search(&self.settings.namespace, &vector, self.settings.top_k)
            .await
        {
            Ok(hits) => {
                info!(
                    "{} returned {} hits from namespace {}",
                    index.name(),
                    hits.len(),
                    self.settings.namespace
                );
                let count = hits.len();
                (self.assembler.assemble(&hits), RetrievalStatus::Hits(count))
            }
            Err(e) => {
                warn!("[{}] search failed, continuing without context: {}", e.error_code(), e);
                (AssembledContext::empty(), RetrievalStatus::Degraded(e.to_string()))
            }
        }
    }

    async fn school_info_for(&self, query: &str) -> String {
        let Some(source) = &self.school_info else {
            return String::new();
        };
        let info = source.lookup(query).await;
        if self.settings.include_school_info {
            info
        } else {
            if !info.is_empty() {
                debug!("School info fetched ({} chars) but not used", info.chars().count());
            }
            String::new()
        }
    }

    /// Run one full turn; never fails
    pub async fn answer(&self, query: &str) -> TurnOutcome {
        let school_info = self.school_info_for(query).await;
        let (context, retrieval) = self.retrieve(query).await;
        let prompt = self.prompts.build(query, Some(&context), &school_info);
        debug!(
            "Prompt built in {:?} mode for {} question",
            prompt.mode,
            prompt.question_type.as_str()
        );

        let used_context = if context.usable {
            context.texts
        } else {
            Vec::new()
        };
        let response = self
            .generation
            .query_with_context(&prompt.text, used_context)
            .await;

        TurnOutcome {
            response,
            prompt,
            retrieval,
        }
    }
}
