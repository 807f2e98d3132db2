// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turns ranked search hits into a context block

use serde::{Deserialize, Serialize};

use crate::utils::preview;
use crate::vector::SearchHit;

pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Context retrieved for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Hit texts in index order
    pub texts: Vec<String>,
    pub scores: Vec<f32>,
    /// True iff at least one hit came back
    pub usable: bool,
}

impl AssembledContext {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    preview_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_CHARS)
    }
}

impl ContextAssembler {
    pub fn new(preview_chars: usize) -> Self {
        Self { preview_chars }
    }

    /// Keep the index ranking as is; no score threshold is applied
    pub fn assemble(&self, hits: &[SearchHit]) -> AssembledContext {
        AssembledContext {
            texts: hits.iter().map(|h| h.text.clone()).collect(),
            scores: hits.iter().map(|h| h.score).collect(),
            usable: !hits.is_empty(),
        }
    }

    /// Display-only previews; the prompt always gets the full text
    pub fn previews(&self, texts: &[String]) -> Vec<String> {
        texts
            .iter()
            .map(|t| preview(t, self.preview_chars))
            .collect()
    }
}
