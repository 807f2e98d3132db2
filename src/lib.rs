// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod ingestion;
pub mod knowledge;
pub mod rag;
pub mod school_info;
pub mod utils;
pub mod vector;
pub mod version;

// Re-export main types
pub use chat::{ChatSession, ConversationTurn, Sender, SessionStore, TurnReply, TurnState};
pub use config::AppConfig;
pub use embeddings::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
pub use generation::{GenerationError, GenerationResponse, GenerationService, TextGenerator};
pub use ingestion::{IngestionJob, IngestionReport};
pub use knowledge::{convert, KnowledgeBase, KnowledgeRecord};
pub use rag::{RagError, RagPipeline};
pub use school_info::{SchoolInfoClient, SchoolInfoSource};
pub use vector::{IndexError, SearchHit, VectorIndex};
