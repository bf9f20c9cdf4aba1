pub mod attempt;
pub mod quiz;

pub use attempt::{AttemptRecord, AttemptSummary};
pub use quiz::StoredQuiz;
