// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Errors surfaced at the conversation boundary
//!
//! Only conditions that stop a turn before it starts reach the caller.
//! Retrieval and generation failures degrade inside the pipeline instead.

use thiserror::Error;

use crate::generation::GenerationError;
use crate::vector::IndexError;

#[derive(Error, Debug)]
pub enum RagError {
    /// A required credential is absent; nothing was sent anywhere
    #[error("Not configured: {0}")]
    Configuration(String),

    /// A turn could not run to completion
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// A turn or an ingestion run is already in flight
    #[error("Another request is still in progress")]
    Busy,

    #[error("Message is empty")]
    EmptyInput,
}

impl RagError {
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::Configuration(_) => "NOT_CONFIGURED",
            RagError::Provider(_) => "PROVIDER_ERROR",
            RagError::Index(e) => e.error_code(),
            RagError::Busy => "BUSY",
            RagError::EmptyInput => "EMPTY_INPUT",
        }
    }

    /// Text suitable for an error banner
    pub fn user_message(&self) -> String {
        match self {
            RagError::Configuration(_) => {
                GenerationError::Configuration(String::new()).user_message()
            }
            RagError::Provider(_) | RagError::Index(_) => {
                GenerationError::MalformedResponse(String::new()).user_message()
            }
            RagError::Busy => "Зачекайте, попередній запит ще обробляється.".to_string(),
            RagError::EmptyInput => "Введіть запитання.".to_string(),
        }
    }
}
