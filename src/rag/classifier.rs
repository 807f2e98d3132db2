// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Question-type detection
//!
//! Keyword patterns map a raw question to a [`QuestionType`]. The result
//! only selects extra guidance for the prompt; retrieval ignores it.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Asks for a formula or how to compute something
    Formula,
    /// Asks to solve a concrete exercise or equation
    ProblemSolving,
    /// Asks what something is or to explain a concept
    Concept,
    /// Asks for books, websites or other materials
    Resource,
    General,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Formula => "formula",
            Self::ProblemSolving => "problem_solving",
            Self::Concept => "concept",
            Self::Resource => "resource",
            Self::General => "general",
        }
    }
}

/// Ordered pattern table; the first matching rule wins
pub struct QuestionClassifier {
    rules: Vec<(QuestionType, Regex)>,
}

impl Default for QuestionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionClassifier {
    pub fn new() -> Self {
        let table = [
            (
                QuestionType::Resource,
                r"(?i)(книг|підручник|посібник|сайт|ресурс|матеріал|джерел|посилан|порад\w* .*(чита|вивч)|book|website|resource)",
            ),
            (
                QuestionType::Formula,
                r"(?i)(формул|як\s+(обчислити|знайти|розрахувати|порахувати)|обчисл|formula)",
            ),
            (
                QuestionType::ProblemSolving,
                r"(?i)(розв'?[яʼ’]?[жз]|розв.яз|задач|рівнянн|\d\s*[a-zа-я]?\s*[+\-*/^=]\s*\d|\bsolve\b|equation)",
            ),
            (
                QuestionType::Concept,
                r"(?i)(що\s+так\w*|поясн|чому|означає|визначенн|що\s+це|explain|what\s+is)",
            ),
        ];

        let rules = table
            .into_iter()
            .filter_map(|(kind, pattern)| Regex::new(pattern).ok().map(|re| (kind, re)))
            .collect();

        Self { rules }
    }

    pub fn classify(&self, question: &str) -> QuestionType {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(question))
            .map(|(kind, _)| *kind)
            .unwrap_or(QuestionType::General)
    }
}
