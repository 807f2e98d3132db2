// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Flattening a structured knowledge base into records

use std::collections::HashSet;
use std::io::Write;

use school_assistant::knowledge::{
    convert, Book, KnowledgeBase, LearningResources, NamedTexts, RecordType, Subject, Topic,
    Website,
};

fn topic(name: &str, examples: &[(&str, &str)], formulas: &[(&str, &str)]) -> Topic {
    Topic {
        name: name.to_string(),
        subtopics: vec!["Перша".to_string(), "Друга".to_string()],
        examples: examples.iter().copied().collect::<NamedTexts>(),
        formulas: formulas.iter().copied().collect::<NamedTexts>(),
    }
}

/// Two subjects with one topic each (two examples, two formulas), one website, one book
pub fn small_knowledge_base() -> KnowledgeBase {
    KnowledgeBase {
        subjects: vec![
            Subject {
                key: "algebra".to_string(),
                name: "Алгебра".to_string(),
                genitive: None,
                topics: vec![topic(
                    "Рівняння",
                    &[("Лінійні", "2x + 3 = 7"), ("Квадратні", "x² - 4 = 0")],
                    &[("Дискримінант", "D = b² - 4ac"), ("Корені", "x = (-b ± √D) / 2a")],
                )],
            },
            Subject {
                key: "chemistry".to_string(),
                name: "Хімія".to_string(),
                genitive: Some("хімії".to_string()),
                topics: vec![topic(
                    "Розчини",
                    &[
                        ("Концентрація", "10 г солі у 90 г води"),
                        ("Розведення", "додати 100 мл води"),
                    ],
                    &[("Масова частка", "w = m(реч) / m(розч)"), ("Молярність", "c = n / V")],
                )],
            },
        ],
        resources: LearningResources {
            websites: vec![Website {
                name: "Хімія онлайн".to_string(),
                url: "https://example.org/chem".to_string(),
                description: "Задачі з хімії".to_string(),
            }],
            books: vec![Book {
                title: "Хімія 8".to_string(),
                author: "Попель П.П.".to_string(),
                year: 2021,
            }],
        },
    }
}

#[test]
fn test_small_knowledge_base_yields_twelve_unique_records() {
    let knowledge = small_knowledge_base();
    let records = convert(&knowledge);

    assert_eq!(records.len(), 12);
    assert_eq!(knowledge.record_count(), 12);

    let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), 12);

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids[0], "subject-algebra-0");
    assert_eq!(ids[5], "subject-chemistry-5");
    assert_eq!(ids[10], "website-10");
    assert_eq!(ids[11], "book-11");
}

#[test]
fn test_examples_keep_written_order_not_alphabetical() {
    let records = convert(&small_knowledge_base());
    // "Лінійні" sorts after "Квадратні" but was written first
    assert_eq!(records[1].id, "example-algebra-1");
    assert_eq!(records[1].metadata["subtopic"], "Лінійні");
    assert_eq!(records[2].metadata["subtopic"], "Квадратні");
    assert_eq!(records[3].metadata["formula_name"], "Дискримінант");
    assert_eq!(records[4].metadata["formula_name"], "Корені");
}

#[test]
fn test_record_types_are_counted_per_category() {
    let records = convert(&small_knowledge_base());
    let count = |t: RecordType| {
        records
            .iter()
            .filter(|r| r.record_type() == Some(t.as_str()))
            .count()
    };

    assert_eq!(count(RecordType::SubjectTopic), 2);
    assert_eq!(count(RecordType::Example), 4);
    assert_eq!(count(RecordType::Formula), 4);
    assert_eq!(count(RecordType::LearningResource), 2);
}

#[test]
fn test_every_record_carries_its_text_in_metadata() {
    for record in convert(&small_knowledge_base()) {
        assert_eq!(record.metadata["text"], record.text.as_str());
        assert!(record.metadata.contains_key("type"));
    }
}

#[test]
fn test_missing_genitive_falls_back_to_lowercase_name() {
    let records = convert(&small_knowledge_base());
    assert!(records[0].text.contains("з предмету алгебра"));
    assert!(records[5].text.contains("з предмету хімії"));
}

#[test]
fn test_knowledge_base_loads_from_json_file() {
    let knowledge = small_knowledge_base();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::to_string(&knowledge).unwrap()).unwrap();

    let loaded = KnowledgeBase::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, knowledge);
    assert_eq!(convert(&loaded), convert(&knowledge));
}

#[test]
fn test_sparse_json_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"subjects":[{{"key":"history","name":"Історія","topics":[{{"name":"Козацтво"}}]}}]}}"#
    )
    .unwrap();

    let loaded = KnowledgeBase::from_json_file(file.path()).unwrap();
    let records = convert(&loaded);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "subject-history-0");
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{not json").unwrap();
    assert!(KnowledgeBase::from_json_file(file.path()).is_err());
}
