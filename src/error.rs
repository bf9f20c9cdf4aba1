use thiserror::Error;

/// Failures a learner-facing caller can see. None of these end the process;
/// the session always stays in a valid state.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("Please enter a valid 6-digit quiz code.")]
    InvalidCodeFormat,

    #[error("no quiz found for code {code}")]
    QuestionSetUnavailable { code: String },

    #[error("question set rejected: {0}")]
    InvalidQuestionSet(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl QuizError {
    pub fn unavailable(code: impl Into<String>) -> Self {
        QuizError::QuestionSetUnavailable { code: code.into() }
    }
}
