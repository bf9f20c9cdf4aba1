pub mod config;
pub mod deriver;

pub use config::QuizRules;
pub use deriver::{attendance_for, compute_score, evaluate, pass_fail_for};
