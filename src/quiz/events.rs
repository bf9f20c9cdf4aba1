use serde::Serialize;

use crate::integrity::RestrictedInput;
use crate::models::QuizOutcome;

use super::state::SessionState;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuizEvent {
    StateChanged {
        state: SessionState,
        epoch: u64,
    },
    TimerTick {
        remaining_secs: u32,
        display: String,
        is_urgent: bool,
    },
    ViolationWarning {
        count: u32,
        threshold: u32,
        message: String,
    },
    InputBlocked {
        input: RestrictedInput,
    },
    SessionFinished {
        outcome: QuizOutcome,
        violations: u32,
        remaining_secs: u32,
    },
}

impl QuizEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            QuizEvent::StateChanged { .. } => "state-changed",
            QuizEvent::TimerTick { .. } => "timer-tick",
            QuizEvent::ViolationWarning { .. } => "violation-warning",
            QuizEvent::InputBlocked { .. } => "input-blocked",
            QuizEvent::SessionFinished { .. } => "session-finished",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
