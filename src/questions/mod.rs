pub mod demo;
pub mod import;
pub mod source;

pub use demo::{demo_questions, seed_demo_quiz, DEMO_QUIZ_CODE};
pub use import::{import_generated_quiz, parse_generated_quiz};
pub use source::{DbQuestionSource, QuestionSource, StaticQuestionSource};
