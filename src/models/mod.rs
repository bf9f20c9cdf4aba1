pub mod outcome;
pub mod question;

pub use outcome::{AttendanceStatus, PassFail, QuizOutcome, TerminationReason};
pub use question::{AnswerMap, Question, QuestionSet, QuizCode, OPTIONS_PER_QUESTION};
