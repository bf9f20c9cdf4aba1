use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::integrity::RestrictedInput;
use crate::models::{AnswerMap, Question, QuestionSet, QuizCode, QuizOutcome, TerminationReason};
use crate::scoring::{evaluate, QuizRules};

use super::countdown::{Countdown, TickOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    EnteringCode,
    ShowingRules,
    Active,
    Completed,
    ForciblyTerminated,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::ForciblyTerminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::EnteringCode => "EnteringCode",
            SessionState::ShowingRules => "ShowingRules",
            SessionState::Active => "Active",
            SessionState::Completed => "Completed",
            SessionState::ForciblyTerminated => "ForciblyTerminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Session was not active; the counter did not move.
    Ignored,
    Warned { count: u32, message: String },
    Terminated { count: u32, message: String, outcome: QuizOutcome },
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
    pub state: SessionState,
    pub code: Option<String>,
    pub code_error: Option<String>,
    pub cursor: usize,
    pub total_questions: usize,
    pub current_question: Option<Question>,
    pub answers: AnswerMap,
    pub answered: usize,
    pub remaining_secs: u32,
    pub remaining_display: String,
    pub is_urgent: bool,
    pub violations: u32,
    pub violation_threshold: u32,
    pub warning: Option<String>,
    pub suppressed_inputs: u32,
    pub outcome: Option<QuizOutcome>,
}

/// One learner's quiz attempt, from code entry to result. Every method is a
/// synchronous transition; events that are illegal in the current state are
/// ignored and reported as `false`/`None` instead of failing.
#[derive(Debug, Clone)]
pub struct QuizSession {
    rules: QuizRules,
    state: SessionState,
    code: Option<QuizCode>,
    code_error: Option<String>,
    questions: QuestionSet,
    answers: AnswerMap,
    cursor: usize,
    countdown: Countdown,
    violations: u32,
    warning: Option<String>,
    suppressed_inputs: u32,
    outcome: Option<QuizOutcome>,
    /// Bumped on every `start` and reset so stale tasks can tell they are stale.
    epoch: u64,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    pub fn new(rules: QuizRules) -> Self {
        let countdown = Countdown::new(rules.duration_secs);
        Self {
            rules,
            state: SessionState::EnteringCode,
            code: None,
            code_error: None,
            questions: QuestionSet::default(),
            answers: AnswerMap::new(),
            cursor: 0,
            countdown,
            violations: 0,
            warning: None,
            suppressed_inputs: 0,
            outcome: None,
            epoch: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Format check for a typed code. `Ok(None)` means the event was ignored
    /// because no code is being entered.
    pub fn check_code(&mut self, raw: &str) -> Result<Option<QuizCode>, QuizError> {
        if self.state != SessionState::EnteringCode {
            debug!("ignoring code entry in state {}", self.state.as_str());
            return Ok(None);
        }

        match QuizCode::parse(raw) {
            Ok(code) => {
                self.code_error = None;
                Ok(Some(code))
            }
            Err(err) => {
                self.code_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Binds a resolved question set and moves on to the rules screen.
    pub fn accept_questions(&mut self, code: QuizCode, questions: QuestionSet) -> Result<bool, QuizError> {
        if self.state != SessionState::EnteringCode {
            debug!("ignoring question set for {code} in state {}", self.state.as_str());
            return Ok(false);
        }

        if questions.len() != self.rules.question_count {
            let err = QuizError::InvalidQuestionSet(format!(
                "quiz {code} has {} questions, expected {}",
                questions.len(),
                self.rules.question_count
            ));
            self.code_error = Some(err.to_string());
            return Err(err);
        }

        info!("quiz {code} loaded with {} questions", questions.len());
        self.code = Some(code);
        self.questions = questions;
        self.code_error = None;
        self.state = SessionState::ShowingRules;
        Ok(true)
    }

    /// Records a failed lookup; the session stays on code entry.
    pub fn reject_code(&mut self, err: &QuizError) {
        if self.state == SessionState::EnteringCode {
            self.code_error = Some(err.to_string());
        }
    }

    /// Format check plus a synchronous lookup, in one step.
    pub fn submit_code_with<F>(&mut self, raw: &str, resolve: F) -> Result<bool, QuizError>
    where
        F: FnOnce(&QuizCode) -> Result<QuestionSet, QuizError>,
    {
        let Some(code) = self.check_code(raw)? else {
            return Ok(false);
        };

        match resolve(&code) {
            Ok(questions) => self.accept_questions(code, questions),
            Err(err) => {
                self.reject_code(&err);
                Err(err)
            }
        }
    }

    pub fn back(&mut self) -> bool {
        if self.state != SessionState::ShowingRules {
            debug!("ignoring back in state {}", self.state.as_str());
            return false;
        }

        self.code = None;
        self.questions = QuestionSet::default();
        self.state = SessionState::EnteringCode;
        true
    }

    pub fn start(&mut self) -> bool {
        if self.state != SessionState::ShowingRules {
            debug!("ignoring start in state {}", self.state.as_str());
            return false;
        }

        self.epoch = self.epoch.wrapping_add(1);
        self.answers.clear();
        self.cursor = 0;
        self.violations = 0;
        self.warning = None;
        self.suppressed_inputs = 0;
        self.outcome = None;
        self.finished_at = None;
        self.started_at = Some(Utc::now());
        self.countdown.arm(self.rules.duration_secs);
        self.state = SessionState::Active;

        info!(
            "quiz {} started (epoch {}, {}s)",
            self.code_label(),
            self.epoch,
            self.rules.duration_secs
        );
        true
    }

    pub fn select_answer(&mut self, question_index: usize, option_index: usize) -> bool {
        if self.state != SessionState::Active {
            debug!("ignoring answer selection in state {}", self.state.as_str());
            return false;
        }

        let Some(question) = self.questions.get(question_index) else {
            debug!("ignoring answer for out-of-range question {question_index}");
            return false;
        };
        if option_index >= question.options.len() {
            debug!("ignoring out-of-range option {option_index} for question {question_index}");
            return false;
        }

        self.answers.insert(question_index, option_index);
        true
    }

    /// Selects an option on the question currently on screen.
    pub fn select_current(&mut self, option_index: usize) -> bool {
        self.select_answer(self.cursor, option_index)
    }

    pub fn navigate(&mut self, new_index: usize) -> bool {
        if self.state != SessionState::Active || new_index >= self.questions.len() {
            return false;
        }
        self.cursor = new_index;
        true
    }

    pub fn next(&mut self) -> bool {
        self.navigate(self.cursor + 1)
    }

    pub fn prev(&mut self) -> bool {
        match self.cursor.checked_sub(1) {
            Some(idx) => self.navigate(idx),
            None => false,
        }
    }

    pub fn submit(&mut self) -> Option<QuizOutcome> {
        self.finalize(TerminationReason::Submitted)
    }

    /// One second of countdown. Expiry finalizes the attempt as timed out.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::Active {
            return TickOutcome::Idle;
        }

        let outcome = self.countdown.tick();
        if outcome == TickOutcome::Expired {
            info!("quiz {} timed out", self.code_label());
            self.finalize(TerminationReason::TimedOut);
        }
        outcome
    }

    /// A focus or visibility loss while answering.
    pub fn record_focus_lost(&mut self) -> ViolationOutcome {
        if self.state != SessionState::Active {
            return ViolationOutcome::Ignored;
        }

        self.violations += 1;
        let count = self.violations;
        let message = format!(
            "Tab switch detected! Warning: {}/{}",
            count, self.rules.violation_threshold
        );
        warn!("quiz {}: {message}", self.code_label());
        self.warning = Some(message.clone());

        if count >= self.rules.violation_threshold {
            match self.finalize(TerminationReason::IntegrityViolation) {
                Some(outcome) => ViolationOutcome::Terminated { count, message, outcome },
                None => ViolationOutcome::Ignored,
            }
        } else {
            ViolationOutcome::Warned { count, message }
        }
    }

    /// Returns true when the input must be blocked. Never counts as a violation.
    pub fn record_restricted_input(&mut self, input: RestrictedInput) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        debug!("suppressed {} during quiz {}", input.as_str(), self.code_label());
        self.suppressed_inputs += 1;
        true
    }

    pub fn reset_for_new_attempt(&mut self) -> bool {
        if !self.state.is_terminal() {
            debug!("ignoring reset in state {}", self.state.as_str());
            return false;
        }

        let epoch = self.epoch.wrapping_add(1);
        *self = Self::new(self.rules.clone());
        self.epoch = epoch;
        true
    }

    /// The only place an attempt is scored. Reached from submit, timer
    /// expiry and the violation threshold.
    fn finalize(&mut self, reason: TerminationReason) -> Option<QuizOutcome> {
        if self.state != SessionState::Active {
            debug!("ignoring {} in state {}", reason.as_str(), self.state.as_str());
            return None;
        }

        self.countdown.disarm();
        let outcome = evaluate(&self.questions, &self.answers, &self.rules, reason);
        self.state = match reason {
            TerminationReason::IntegrityViolation => SessionState::ForciblyTerminated,
            TerminationReason::Submitted | TerminationReason::TimedOut => SessionState::Completed,
        };
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());

        info!(
            "quiz {} finished: {}/{} ({}, {}, {})",
            self.code_label(),
            outcome.score,
            outcome.total,
            reason.as_str(),
            outcome.attendance_status.as_str(),
            outcome.pass_fail.as_str()
        );
        Some(outcome)
    }

    fn code_label(&self) -> &str {
        self.code.as_ref().map(QuizCode::as_str).unwrap_or("-")
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rules(&self) -> &QuizRules {
        &self.rules
    }

    pub fn code(&self) -> Option<&QuizCode> {
        self.code.as_ref()
    }

    pub fn code_error(&self) -> Option<&str> {
        self.code_error.as_deref()
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.len().saturating_sub(self.answers.len())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs
    }

    pub fn violations(&self) -> u32 {
        self.violations
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn suppressed_inputs(&self) -> u32 {
        self.suppressed_inputs
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.outcome
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            state: self.state,
            code: self.code.as_ref().map(|c| c.as_str().to_string()),
            code_error: self.code_error.clone(),
            cursor: self.cursor,
            total_questions: self.questions.len(),
            current_question: self.current_question().cloned(),
            answers: self.answers.clone(),
            answered: self.answered_count(),
            remaining_secs: self.countdown.remaining_secs,
            remaining_display: self.countdown.display(),
            is_urgent: self.countdown.is_urgent(self.rules.urgent_threshold_secs),
            violations: self.violations,
            violation_threshold: self.rules.violation_threshold,
            warning: self.warning.clone(),
            suppressed_inputs: self.suppressed_inputs,
            outcome: self.outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, PassFail};

    fn question_set(correct: &[usize]) -> QuestionSet {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &ans)| Question::new(format!("Question {}", i + 1), ["a", "b", "c", "d"], ans))
            .collect();
        QuestionSet::new(questions, correct.len()).unwrap()
    }

    fn small_rules() -> QuizRules {
        QuizRules {
            question_count: 3,
            duration_secs: 5,
            attendance_threshold: 3,
            pass_threshold: 2,
            ..QuizRules::default()
        }
    }

    fn active_session() -> QuizSession {
        let mut session = QuizSession::new(small_rules());
        assert!(session
            .submit_code_with("123456", |_| Ok(question_set(&[1, 1, 2])))
            .unwrap());
        assert!(session.start());
        session
    }

    #[test]
    fn valid_code_moves_to_rules() {
        let mut session = QuizSession::new(small_rules());
        let moved = session
            .submit_code_with("654321", |code| {
                assert_eq!(code.as_str(), "654321");
                Ok(question_set(&[0, 0, 0]))
            })
            .unwrap();
        assert!(moved);
        assert_eq!(session.state(), SessionState::ShowingRules);
        assert!(session.code_error().is_none());
    }

    #[test]
    fn invalid_code_stays_on_entry_with_error() {
        let mut session = QuizSession::new(small_rules());
        for raw in ["12345", "abcdef", "1234567", ""] {
            let err = session
                .submit_code_with(raw, |_| panic!("resolver must not run for {raw:?}"))
                .unwrap_err();
            assert!(matches!(err, QuizError::InvalidCodeFormat));
            assert_eq!(session.state(), SessionState::EnteringCode);
            assert_eq!(session.code_error(), Some("Please enter a valid 6-digit quiz code."));
        }
    }

    #[test]
    fn unknown_code_stays_on_entry() {
        let mut session = QuizSession::new(small_rules());
        let err = session
            .submit_code_with("111111", |code| Err(QuizError::unavailable(code.as_str())))
            .unwrap_err();
        assert!(matches!(err, QuizError::QuestionSetUnavailable { .. }));
        assert_eq!(session.state(), SessionState::EnteringCode);
        assert!(session.code_error().is_some());
    }

    #[test]
    fn wrong_sized_question_set_is_rejected() {
        let mut session = QuizSession::new(small_rules());
        let err = session
            .submit_code_with("123456", |_| Ok(question_set(&[0, 1])))
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestionSet(_)));
        assert_eq!(session.state(), SessionState::EnteringCode);
    }

    #[test]
    fn back_returns_to_code_entry_and_drops_questions() {
        let mut session = QuizSession::new(small_rules());
        session
            .submit_code_with("123456", |_| Ok(question_set(&[0, 0, 0])))
            .unwrap();
        assert!(session.back());
        assert_eq!(session.state(), SessionState::EnteringCode);
        assert!(session.questions().is_empty());
        assert!(session.code().is_none());
        assert!(!session.start());
    }

    #[test]
    fn start_resets_session_fields() {
        let session = active_session();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.violations(), 0);
        assert_eq!(session.remaining_secs(), 5);
        assert!(session.answers().is_empty());
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.epoch(), 1);
    }

    #[test]
    fn answers_upsert_and_navigation_is_bounded() {
        let mut session = active_session();
        assert!(session.select_answer(0, 3));
        assert!(session.select_answer(0, 1));
        assert_eq!(session.answers().get(&0), Some(&1));
        assert!(!session.select_answer(3, 0));
        assert!(!session.select_answer(1, 4));

        assert!(session.navigate(2));
        assert!(!session.navigate(3));
        assert_eq!(session.cursor(), 2);
        assert!(!session.next());
        assert!(session.prev());
        assert!(session.select_current(2));
        assert_eq!(session.answers().get(&1), Some(&2));
        assert_eq!(session.answered_count(), 2);
        assert_eq!(session.unanswered_count(), 1);
    }

    #[test]
    fn submit_scores_current_answers() {
        let mut session = active_session();
        session.select_answer(0, 1);
        session.select_answer(1, 0);
        session.select_answer(2, 2);

        let outcome = session.submit().unwrap();
        assert_eq!(outcome.score, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.termination_reason, TerminationReason::Submitted);
        assert_eq!(outcome.attendance_status, AttendanceStatus::Absent);
        assert_eq!(outcome.pass_fail, PassFail::Pass);
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.outcome(), Some(outcome));
    }

    #[test]
    fn timer_expiry_completes_exactly_once() {
        let mut session = active_session();
        session.select_answer(0, 1);
        for expected in (1..5).rev() {
            assert_eq!(session.tick(), TickOutcome::Remaining(expected));
        }
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.state(), SessionState::Completed);
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.termination_reason, TerminationReason::TimedOut);
        assert_eq!(outcome.score, 1);

        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.remaining_secs(), 0);
    }

    #[test]
    fn two_violations_warn_third_terminates() {
        let mut session = active_session();
        assert_eq!(
            session.record_focus_lost(),
            ViolationOutcome::Warned {
                count: 1,
                message: "Tab switch detected! Warning: 1/3".into()
            }
        );
        assert!(matches!(session.record_focus_lost(), ViolationOutcome::Warned { count: 2, .. }));
        assert_eq!(session.state(), SessionState::Active);

        match session.record_focus_lost() {
            ViolationOutcome::Terminated { count, outcome, .. } => {
                assert_eq!(count, 3);
                assert_eq!(outcome.termination_reason, TerminationReason::IntegrityViolation);
            }
            other => panic!("expected termination, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::ForciblyTerminated);

        assert_eq!(session.record_focus_lost(), ViolationOutcome::Ignored);
        assert_eq!(session.violations(), 3);
    }

    #[test]
    fn restricted_input_is_blocked_but_not_counted() {
        let mut session = QuizSession::new(small_rules());
        assert!(!session.record_restricted_input(RestrictedInput::Copy));

        let mut session = active_session();
        assert!(session.record_restricted_input(RestrictedInput::ContextMenu));
        assert!(session.record_restricted_input(RestrictedInput::Paste));
        assert_eq!(session.suppressed_inputs(), 2);
        assert_eq!(session.violations(), 0);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn illegal_events_do_not_mutate() {
        let mut session = QuizSession::new(small_rules());
        assert!(!session.select_answer(0, 0));
        assert!(!session.navigate(0));
        assert!(session.submit().is_none());
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert!(!session.reset_for_new_attempt());
        assert!(!session.back());
        assert!(session.answers().is_empty());

        let mut session = active_session();
        session.select_answer(0, 1);
        session.submit().unwrap();
        assert!(!session.select_answer(1, 1));
        assert!(session.submit().is_none());
        assert_eq!(session.check_code("123456").unwrap(), None);
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn reset_clears_previous_attempt() {
        let mut session = active_session();
        session.select_answer(0, 1);
        session.record_focus_lost();
        session.tick();
        session.submit().unwrap();

        assert!(session.reset_for_new_attempt());
        assert_eq!(session.state(), SessionState::EnteringCode);
        assert!(session.answers().is_empty());
        assert_eq!(session.violations(), 0);
        assert_eq!(session.remaining_secs(), 5);
        assert!(session.outcome().is_none());
        assert!(session.warning().is_none());
        assert!(session.code().is_none());
        assert_eq!(session.epoch(), 2);

        session
            .submit_code_with("222222", |_| Ok(question_set(&[3, 3, 3])))
            .unwrap();
        session.start();
        assert_eq!(session.epoch(), 3);
        session.select_answer(0, 3);
        let outcome = session.submit().unwrap();
        assert_eq!(outcome.score, 1);
    }

    #[test]
    fn full_default_quiz_answered_correctly() {
        let rules = QuizRules::default();
        let correct: Vec<usize> = (0..20).map(|i| i % 4).collect();
        let mut session = QuizSession::new(rules);
        session
            .submit_code_with("123456", |_| Ok(question_set(&correct)))
            .unwrap();
        session.start();
        assert_eq!(session.remaining_secs(), 600);

        for (idx, ans) in correct.iter().enumerate() {
            assert!(session.select_answer(idx, *ans));
        }
        let outcome = session.submit().unwrap();
        assert_eq!(
            outcome,
            QuizOutcome {
                score: 20,
                total: 20,
                attendance_status: AttendanceStatus::Present,
                pass_fail: PassFail::Pass,
                termination_reason: TerminationReason::Submitted,
            }
        );
    }
}
