// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flattens a [`KnowledgeBase`] into natural-language records
//!
//! Pure and deterministic: the same input always yields the same records,
//! in the same order, with the same ids.

use serde_json::{json, Value};

use super::{Book, KnowledgeBase, KnowledgeRecord, RecordType, Subject, Topic, Website};
use crate::vector::Metadata;

/// Emits one record per topic, example, formula, website and book
///
/// Ids are `{category}-{subject key or nothing}-{n}` with `n` counted from 0
/// across the whole run, so every id is unique within one conversion.
/// Examples and formulas follow the order they were written in.
pub fn convert(knowledge: &KnowledgeBase) -> Vec<KnowledgeRecord> {
    let mut builder = RecordBuilder::default();

    for subject in &knowledge.subjects {
        for topic in &subject.topics {
            builder.topic(subject, topic);
            for (subtopic, example) in topic.examples.iter() {
                builder.example(subject, topic, subtopic, example);
            }
            for (name, formula) in topic.formulas.iter() {
                builder.formula(subject, topic, name, formula);
            }
        }
    }

    for website in &knowledge.resources.websites {
        builder.website(website);
    }
    for book in &knowledge.resources.books {
        builder.book(book);
    }

    builder.records
}

#[derive(Default)]
struct RecordBuilder {
    counter: usize,
    records: Vec<KnowledgeRecord>,
}

impl RecordBuilder {
    fn push(&mut self, prefix: &str, text: String, record_type: RecordType, fields: Value) {
        let id = format!("{}-{}", prefix, self.counter);
        self.counter += 1;

        let mut metadata = Metadata::new();
        metadata.insert("type".to_string(), json!(record_type.as_str()));
        if let Value::Object(fields) = fields {
            metadata.extend(fields);
        }
        metadata.insert("text".to_string(), json!(text));

        self.records.push(KnowledgeRecord {
            id,
            text,
            metadata,
        });
    }

    fn topic(&mut self, subject: &Subject, topic: &Topic) {
        let joined = topic.subtopics.join(", ");
        let text = format!(
            "Предмет: {}\nРозділ: {}\nПідтеми: {}\n\nЦе основна тема з предмету {} під назвою \"{}\". \nВона включає наступні підтеми: {}.",
            subject.name,
            topic.name,
            joined,
            subject.genitive_name(),
            topic.name,
            joined
        );
        self.push(
            &format!("subject-{}", subject.key),
            text,
            RecordType::SubjectTopic,
            json!({
                "subject": subject.key,
                "topic": topic.name,
                "subtopics": topic.subtopics,
            }),
        );
    }

    fn example(&mut self, subject: &Subject, topic: &Topic, subtopic: &str, example: &str) {
        let text = format!(
            "Предмет: {}\nТема: {}\nПриклад: {}\n\nДля вивчення теми \"{}\" з предмету {} \nможна використати наступний приклад: {}",
            subject.name,
            subtopic,
            example,
            subtopic,
            subject.genitive_name(),
            example
        );
        self.push(
            &format!("example-{}", subject.key),
            text,
            RecordType::Example,
            json!({
                "subject": subject.key,
                "topic": topic.name,
                "subtopic": subtopic,
                "example": example,
            }),
        );
    }

    fn formula(&mut self, subject: &Subject, topic: &Topic, name: &str, formula: &str) {
        let text = format!(
            "Предмет: {}\nРозділ: {}\nФормула для обчислення: {}\nФормула: {}\n\nДля розв'язання задач на тему \"{}\" використовується формула: {}\nЦя формула належить до розділу \"{}\" предмету {}.",
            subject.name,
            topic.name,
            name,
            formula,
            name,
            formula,
            topic.name,
            subject.genitive_name()
        );
        self.push(
            &format!("formula-{}", subject.key),
            text,
            RecordType::Formula,
            json!({
                "subject": subject.key,
                "topic": topic.name,
                "formula_name": name,
                "formula": formula,
            }),
        );
    }

    fn website(&mut self, website: &Website) {
        let text = format!(
            "Навчальний ресурс: {}\nОпис: {}\nПосилання: {}\n\n{} - це корисний освітній ресурс для навчання. {}\nВи можете знайти його за посиланням: {}",
            website.name,
            website.description,
            website.url,
            website.name,
            website.description,
            website.url
        );
        self.push(
            "website",
            text,
            RecordType::LearningResource,
            json!({
                "resource_type": "website",
                "name": website.name,
                "url": website.url,
                "description": website.description,
            }),
        );
    }

    fn book(&mut self, book: &Book) {
        let text = format!(
            "Рекомендована книга: {}\nАвтор: {}\nРік видання: {}\n\n\"{}\" автора {} ({} рік) - це рекомендований підручник для навчання.\nЦя книга допоможе поглибити знання з відповідного предмету.",
            book.title, book.author, book.year, book.title, book.author, book.year
        );
        self.push(
            "book",
            text,
            RecordType::LearningResource,
            json!({
                "resource_type": "book",
                "title": book.title,
                "author": book.author,
                "year": book.year,
            }),
        );
    }
}
