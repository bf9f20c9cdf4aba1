use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;

use crate::db::Database;
use crate::error::QuizError;
use crate::models::{QuestionSet, QuizCode};

/// Resolves a well-formed quiz code to the questions prepared for it.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn resolve(&self, code: &QuizCode) -> Result<QuestionSet, QuizError>;
}

/// Quizzes stored in the local database.
pub struct DbQuestionSource {
    db: Database,
    expected_len: usize,
}

impl DbQuestionSource {
    pub fn new(db: Database, expected_len: usize) -> Self {
        Self { db, expected_len }
    }
}

#[async_trait]
impl QuestionSource for DbQuestionSource {
    async fn resolve(&self, code: &QuizCode) -> Result<QuestionSet, QuizError> {
        let quiz = self
            .db
            .get_quiz_by_code(code.as_str())
            .await?
            .ok_or_else(|| QuizError::unavailable(code.as_str()))?;

        debug!("resolved quiz {} ({})", quiz.code, quiz.subject);
        QuestionSet::new(quiz.questions, self.expected_len)
    }
}

/// Fixed in-memory quizzes.
#[derive(Default)]
pub struct StaticQuestionSource {
    sets: HashMap<QuizCode, QuestionSet>,
}

impl StaticQuestionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quiz(mut self, code: QuizCode, questions: QuestionSet) -> Self {
        self.sets.insert(code, questions);
        self
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn resolve(&self, code: &QuizCode) -> Result<QuestionSet, QuizError> {
        self.sets
            .get(code)
            .cloned()
            .ok_or_else(|| QuizError::unavailable(code.as_str()))
    }
}
