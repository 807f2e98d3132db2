// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structured knowledge base and its flattening into embeddable records
//!
//! Subjects hold topics; topics hold subtopics plus optional examples and
//! formulas. Learning resources (websites and books) sit beside them.

pub mod builtin;
pub mod converter;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::vector::Metadata;

pub use converter::convert;

/// A topic inside a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
    /// Subtopic name -> worked example
    #[serde(default)]
    pub examples: NamedTexts,
    /// Formula name -> formula
    #[serde(default)]
    pub formulas: NamedTexts,
}

/// Name -> text pairs kept in the order they were written
///
/// Serialized as a JSON object. A repeated name replaces the earlier text
/// in place, matching how a JSON object keeps its first key position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedTexts(Vec<(String, String)>);

impl NamedTexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = text,
            None => self.0.push((name, text)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, text)| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NamedTexts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut texts = Self::new();
        for (name, text) in iter {
            texts.insert(name, text);
        }
        texts
    }
}

impl Serialize for NamedTexts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, text) in &self.0 {
            map.serialize_entry(name, text)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NamedTexts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamedTextsVisitor;

        impl<'de> Visitor<'de> for NamedTextsVisitor {
            type Value = NamedTexts;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of name -> text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut texts = NamedTexts::new();
                while let Some((name, text)) = access.next_entry::<String, String>()? {
                    texts.insert(name, text);
                }
                Ok(texts)
            }
        }

        deserializer.deserialize_map(NamedTextsVisitor)
    }
}

/// A school subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identifier used in record ids, e.g. `mathematics`
    pub key: String,
    /// Display name, e.g. `Математика`
    pub name: String,
    /// Form used inside sentences ("з предмету математики").
    /// Defaults to the lowercase name.
    #[serde(default)]
    pub genitive: Option<String>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

impl Subject {
    pub fn genitive_name(&self) -> String {
        self.genitive
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    pub name: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningResources {
    #[serde(default)]
    pub websites: Vec<Website>,
    #[serde(default)]
    pub books: Vec<Book>,
}

/// The whole knowledge base
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub resources: LearningResources,
}

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse knowledge base: {0}")]
    Parse(#[from] serde_json::Error),
}

impl KnowledgeBase {
    /// Load a knowledge base from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Number of records [`convert`] will emit
    pub fn record_count(&self) -> usize {
        let topic_records: usize = self
            .subjects
            .iter()
            .flat_map(|s| s.topics.iter())
            .map(|t| 1 + t.examples.len() + t.formulas.len())
            .sum();
        topic_records + self.resources.websites.len() + self.resources.books.len()
    }
}

/// Kind of knowledge record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    SubjectTopic,
    Example,
    Formula,
    LearningResource,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubjectTopic => "subject_topic",
            Self::Example => "example",
            Self::Formula => "formula",
            Self::LearningResource => "learning_resource",
        }
    }
}

/// One independently embeddable passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub text: String,
    /// Always contains `type` and a copy of `text`
    pub metadata: Metadata,
}

impl KnowledgeRecord {
    pub fn record_type(&self) -> Option<&str> {
        self.metadata.get("type").and_then(|v| v.as_str())
    }

    /// Human-readable label for progress logs
    pub fn label(&self) -> String {
        let kind = self.record_type().unwrap_or("record");
        let source = ["subject", "name", "title"]
            .iter()
            .find_map(|k| self.metadata.get(*k).and_then(|v| v.as_str()))
            .unwrap_or("resource");
        format!("{} - {}", kind, source)
    }
}
