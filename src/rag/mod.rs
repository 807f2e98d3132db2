// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Context assembly, prompt construction and the per-turn pipeline

pub mod classifier;
pub mod context;
pub mod errors;
pub mod pipeline;
pub mod prompt;

pub use classifier::{QuestionClassifier, QuestionType};
pub use context::{AssembledContext, ContextAssembler};
pub use errors::RagError;
pub use pipeline::{PipelineSettings, RagPipeline, RetrievalStatus, TurnOutcome};
pub use prompt::{BuiltPrompt, PromptBuilder, PromptMode};
