use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;

pub const OPTIONS_PER_QUESTION: usize = 4;

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{6}$").expect("quiz code pattern is valid"))
}

/// Six decimal digits. Only constructed through [`QuizCode::parse`] or
/// [`QuizCode::generate`], so a held value is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuizCode(String);

impl QuizCode {
    pub fn parse(raw: &str) -> Result<Self, QuizError> {
        if code_pattern().is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(QuizError::InvalidCodeFormat)
        }
    }

    /// Fresh code in `100000..=999999`, so it never starts with a zero.
    pub fn generate() -> Self {
        let value: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for QuizCode {
    type Error = QuizError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        QuizCode::parse(&value)
    }
}

impl From<QuizCode> for String {
    fn from(code: QuizCode) -> Self {
        code.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    pub correct_index: usize,
}

impl Question {
    pub fn new(text: impl Into<String>, options: [&str; OPTIONS_PER_QUESTION], correct_index: usize) -> Self {
        Self {
            text: text.into(),
            options: options.map(str::to_string),
            correct_index,
        }
    }
}

/// Ordered questions for one session. Order is preserved exactly as
/// supplied; index `i` is question number `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Accepts the set only if it has exactly `expected_len` questions and
    /// every correct index points at one of the four options.
    pub fn new(questions: Vec<Question>, expected_len: usize) -> Result<Self, QuizError> {
        if questions.len() != expected_len {
            return Err(QuizError::InvalidQuestionSet(format!(
                "expected {expected_len} questions, got {}",
                questions.len()
            )));
        }

        if let Some((idx, _)) = questions
            .iter()
            .enumerate()
            .find(|(_, q)| q.correct_index >= OPTIONS_PER_QUESTION)
        {
            return Err(QuizError::InvalidQuestionSet(format!(
                "question {} has correct index outside 0..{OPTIONS_PER_QUESTION}",
                idx + 1
            )));
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

/// Question index -> selected option index. A later selection for the same
/// question overwrites the earlier one.
pub type AnswerMap = BTreeMap<usize, usize>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digit_codes() {
        for raw in ["123456", "000000", "999999"] {
            assert_eq!(QuizCode::parse(raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "12345", "1234567", "12a456", " 123456", "123456\n", "１２３４５６"] {
            assert!(matches!(QuizCode::parse(raw), Err(QuizError::InvalidCodeFormat)), "{raw:?}");
        }
    }

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..100 {
            let code = QuizCode::generate();
            assert!(QuizCode::parse(code.as_str()).is_ok());
            assert_ne!(code.as_str().as_bytes()[0], b'0');
        }
    }

    #[test]
    fn question_set_enforces_length_and_indices() {
        let q = Question::new("q", ["a", "b", "c", "d"], 1);
        assert!(QuestionSet::new(vec![q.clone(); 3], 3).is_ok());
        assert!(QuestionSet::new(vec![q.clone(); 2], 3).is_err());

        let bad = Question::new("q", ["a", "b", "c", "d"], 4);
        assert!(QuestionSet::new(vec![q, bad], 2).is_err());
    }
}
