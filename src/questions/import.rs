use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use regex::Regex;
use serde::Deserialize;

use crate::db::{Database, StoredQuiz};
use crate::models::{Question, QuizCode, OPTIONS_PER_QUESTION};

const MAX_CODE_ATTEMPTS: usize = 16;

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    q: String,
    options: Vec<String>,
    ans: usize,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuiz {
    #[serde(default)]
    questions: Vec<GeneratedQuestion>,
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```(?:json)?\n?").expect("fence pattern is valid"))
}

/// Parses a question generator reply of the form
/// `{"questions":[{"q":..,"options":[..4..],"ans":0}]}`, with or without
/// surrounding markdown fences.
pub fn parse_generated_quiz(raw: &str) -> Result<Vec<Question>> {
    let cleaned = fence_pattern().replace_all(raw, "");
    let parsed: GeneratedQuiz = serde_json::from_str(cleaned.trim())
        .context("generated quiz is not valid JSON")?;

    if parsed.questions.is_empty() {
        bail!("generated quiz contains no questions");
    }

    parsed
        .questions
        .into_iter()
        .enumerate()
        .map(|(idx, generated)| {
            let options: [String; OPTIONS_PER_QUESTION] =
                generated.options.try_into().map_err(|opts: Vec<String>| {
                    anyhow::anyhow!(
                        "question {} has {} options, expected {OPTIONS_PER_QUESTION}",
                        idx + 1,
                        opts.len()
                    )
                })?;
            if generated.ans >= OPTIONS_PER_QUESTION {
                bail!("question {} has answer index {} out of range", idx + 1, generated.ans);
            }
            Ok(Question {
                text: generated.q,
                options,
                correct_index: generated.ans,
            })
        })
        .collect()
}

/// Stores a generated quiz under a fresh code and returns that code.
pub async fn import_generated_quiz(
    db: &Database,
    raw: &str,
    subject: Option<&str>,
    section: Option<&str>,
) -> Result<QuizCode> {
    let questions = parse_generated_quiz(raw)?;

    let mut code = QuizCode::generate();
    let mut attempts = 1;
    while db.quiz_exists(code.as_str()).await? {
        if attempts >= MAX_CODE_ATTEMPTS {
            bail!("could not allocate an unused quiz code");
        }
        code = QuizCode::generate();
        attempts += 1;
    }

    let quiz = StoredQuiz {
        code: code.as_str().to_string(),
        subject: subject.unwrap_or("General").to_string(),
        section: section.filter(|s| !s.is_empty()).map(str::to_string),
        questions,
        created_at: Utc::now(),
    };
    db.insert_quiz(&quiz).await?;

    info!(
        "imported quiz {} ({}, {} questions)",
        quiz.code,
        quiz.subject,
        quiz.questions.len()
    );
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"questions":[
        {"q":"Which data structure uses LIFO?","options":["Queue","Stack","Array","Tree"],"ans":1},
        {"q":"BFS uses?","options":["Stack","Queue","Tree","Heap"],"ans":1}
    ]}"#;

    #[test]
    fn parses_plain_payload() {
        let questions = parse_generated_quiz(PAYLOAD).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "Which data structure uses LIFO?");
        assert_eq!(questions[0].options[1], "Stack");
        assert_eq!(questions[1].correct_index, 1);
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = format!("```json\n{PAYLOAD}\n```\n");
        assert_eq!(parse_generated_quiz(&fenced).unwrap().len(), 2);

        let bare_fence = format!("```\n{PAYLOAD}```");
        assert_eq!(parse_generated_quiz(&bare_fence).unwrap().len(), 2);
    }

    #[test]
    fn rejects_empty_and_malformed_payloads() {
        assert!(parse_generated_quiz(r#"{"questions":[]}"#).is_err());
        assert!(parse_generated_quiz("{}").is_err());
        assert!(parse_generated_quiz("not json").is_err());
        assert!(parse_generated_quiz(
            r#"{"questions":[{"q":"x","options":["a","b","c"],"ans":0}]}"#
        )
        .is_err());
        assert!(parse_generated_quiz(
            r#"{"questions":[{"q":"x","options":["a","b","c","d"],"ans":4}]}"#
        )
        .is_err());
    }
}
