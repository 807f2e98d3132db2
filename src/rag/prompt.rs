// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt construction for the school assistant
//!
//! Two modes:
//! - plain: no usable context, the model answers from general knowledge
//!   and is told to admit uncertainty
//! - context: retrieved passages come before the question, followed by
//!   guidance picked from the detected [`QuestionType`]
//!
//! Building a prompt never fails.

use serde::Serialize;

use super::classifier::{QuestionClassifier, QuestionType};
use super::context::AssembledContext;
use crate::utils::truncate_chars;

pub const DEFAULT_MAX_TEXT_CHARS: usize = 5000;

const ROLE: &str = "Ти - шкільний помічник, який допомагає учням з навчанням. Відповідай українською мовою.";

const PLAIN_INSTRUCTION: &str = "Дай чітку та зрозумілу відповідь. Якщо ти не впевнений у відповіді, чесно скажи про це і не вигадуй фактів.";

const CONTEXT_INTRO: &str = "Використовуй наступну інформацію з бази знань:";

const CONTEXT_CLOSING: &str = "Якщо наданої інформації недостатньо, скажи про це та доповни відповідь загальними знаннями, не вигадуючи фактів.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    Plain,
    Context,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuiltPrompt {
    pub text: String,
    pub mode: PromptMode,
    pub question_type: QuestionType,
}

pub struct PromptBuilder {
    classifier: QuestionClassifier,
    max_text_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXT_CHARS)
    }
}

impl PromptBuilder {
    /// `max_text_chars` bounds the question and every passage separately
    pub fn new(max_text_chars: usize) -> Self {
        Self {
            classifier: QuestionClassifier::new(),
            max_text_chars: max_text_chars.max(1),
        }
    }

    pub fn classify(&self, query: &str) -> QuestionType {
        self.classifier.classify(query)
    }

    /// Build the final instruction text
    ///
    /// Falls back to plain mode when `context` is absent, unusable or
    /// holds only blank passages. A blank `school_info` adds nothing.
    pub fn build(
        &self,
        query: &str,
        context: Option<&AssembledContext>,
        school_info: &str,
    ) -> BuiltPrompt {
        let query = truncate_chars(query.trim(), self.max_text_chars);
        let question_type = self.classifier.classify(query);

        let passages: Vec<&str> = context
            .filter(|c| c.usable)
            .map(|c| {
                c.texts
                    .iter()
                    .map(|t| truncate_chars(t.trim(), self.max_text_chars))
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut text = String::from(ROLE);
        text.push_str("\n\n");

        let school_info = school_info.trim();
        if !school_info.is_empty() {
            text.push_str("Інформація про школу:\n");
            text.push_str(truncate_chars(school_info, self.max_text_chars));
            text.push_str("\n\n");
        }

        if passages.is_empty() {
            text.push_str(&format!("Запитання учня: {}\n\n{}", query, PLAIN_INSTRUCTION));
            return BuiltPrompt {
                text,
                mode: PromptMode::Plain,
                question_type,
            };
        }

        text.push_str(CONTEXT_INTRO);
        text.push_str("\n\n");
        for (i, passage) in passages.iter().enumerate() {
            text.push_str(&format!("[{}] {}\n\n", i + 1, passage));
        }
        text.push_str(&format!("Запитання учня: {}\n\n", query));
        if let Some(guidance) = guidance(question_type) {
            text.push_str(guidance);
            text.push('\n');
        }
        text.push_str(CONTEXT_CLOSING);

        BuiltPrompt {
            text,
            mode: PromptMode::Context,
            question_type,
        }
    }
}

fn guidance(question_type: QuestionType) -> Option<&'static str> {
    match question_type {
        QuestionType::Formula => Some(
            "Наведи потрібну формулу, поясни всі позначення та покажи приклад її застосування.",
        ),
        QuestionType::ProblemSolving => Some(
            "Розв'яжи задачу покроково, пояснюючи кожен крок, і перевір отриману відповідь.",
        ),
        QuestionType::Concept => {
            Some("Поясни поняття простими словами та наведи приклад із шкільної програми.")
        }
        QuestionType::Resource => Some(
            "Порекомендуй відповідні навчальні ресурси з бази знань і коротко опиши, чим кожен корисний.",
        ),
        QuestionType::General => None,
    }
}
