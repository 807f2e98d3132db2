// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Knowledge base shipped with the assistant

use super::{Book, KnowledgeBase, LearningResources, NamedTexts, Subject, Topic, Website};

fn pairs(items: &[(&str, &str)]) -> NamedTexts {
    items.iter().copied().collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl KnowledgeBase {
    /// School mathematics and physics, plus recommended resources
    pub fn builtin() -> Self {
        Self {
            subjects: vec![
                Subject {
                    key: "mathematics".to_string(),
                    name: "Математика".to_string(),
                    genitive: Some("математики".to_string()),
                    topics: vec![
                        Topic {
                            name: "Алгебра".to_string(),
                            subtopics: strings(&[
                                "Лінійні рівняння",
                                "Квадратні рівняння",
                                "Функції",
                                "Графіки",
                            ]),
                            examples: pairs(&[
                                ("Лінійні рівняння", "Приклад лінійного рівняння: 2x + 3 = 7"),
                                (
                                    "Квадратні рівняння",
                                    "Приклад квадратного рівняння: x² + 5x + 6 = 0",
                                ),
                            ]),
                            formulas: NamedTexts::new(),
                        },
                        Topic {
                            name: "Геометрія".to_string(),
                            subtopics: strings(&[
                                "Трикутники",
                                "Чотирикутники",
                                "Кола",
                                "Площі фігур",
                            ]),
                            examples: NamedTexts::new(),
                            formulas: pairs(&[
                                ("Площа трикутника", "S = (a * h) / 2"),
                                ("Площа кола", "S = πr²"),
                            ]),
                        },
                    ],
                },
                Subject {
                    key: "physics".to_string(),
                    name: "Фізика".to_string(),
                    genitive: Some("фізики".to_string()),
                    topics: vec![Topic {
                        name: "Механіка".to_string(),
                        subtopics: strings(&["Кінематика", "Динаміка", "Закони Ньютона"]),
                        examples: NamedTexts::new(),
                        formulas: pairs(&[
                            ("Швидкість", "v = s/t"),
                            ("Прискорення", "a = (v - v₀)/t"),
                        ]),
                    }],
                },
            ],
            resources: LearningResources {
                websites: vec![
                    Website {
                        name: "Khan Academy".to_string(),
                        url: "https://uk.khanacademy.org/".to_string(),
                        description: "Безкоштовні онлайн-курси з різних предметів".to_string(),
                    },
                    Website {
                        name: "Всеосвіта".to_string(),
                        url: "https://vseosvita.ua/".to_string(),
                        description: "Освітній портал для учнів та вчителів".to_string(),
                    },
                ],
                books: vec![Book {
                    title: "Математика: підручник для 7 класу".to_string(),
                    author: "Мерзляк А.Г.".to_string(),
                    year: 2020,
                }],
            },
        }
    }
}
