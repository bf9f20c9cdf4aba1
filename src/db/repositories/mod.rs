pub mod attempts;
pub mod quizzes;
