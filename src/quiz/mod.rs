pub mod commands;
pub mod controller;
pub mod countdown;
pub mod events;
pub mod state;

pub use controller::QuizController;
pub use countdown::{format_mmss, Countdown, CountdownStatus, TickOutcome};
pub use events::QuizEvent;
pub use state::{QuizSession, QuizSnapshot, SessionState, ViolationOutcome};
