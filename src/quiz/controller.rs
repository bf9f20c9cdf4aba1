use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    db::{AttemptRecord, Database},
    error::QuizError,
    integrity::{IntegrityMonitor, RestrictedInput, SignalSource, ViolationHandler},
    models::QuizOutcome,
    questions::QuestionSource,
    scoring::QuizRules,
};

use super::{
    countdown::{format_mmss, TickOutcome},
    events::QuizEvent,
    state::{QuizSession, QuizSnapshot, SessionState, ViolationOutcome},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

const EVENT_CAPACITY: usize = 256;

struct SessionCell {
    session: QuizSession,
    /// Cancelled on any exit from `Active`; shared by ticker and monitor.
    active_token: Option<CancellationToken>,
}

/// Everything the post-transition work needs, captured under the lock.
struct FinishedAttempt {
    epoch: u64,
    state: SessionState,
    outcome: QuizOutcome,
    violations: u32,
    remaining_secs: u32,
    record: Option<AttemptRecord>,
}

impl SessionCell {
    fn close_active(&mut self) {
        if let Some(token) = self.active_token.take() {
            token.cancel();
        }
    }

    fn take_finished(&self) -> Option<FinishedAttempt> {
        let session = &self.session;
        let outcome = session.outcome()?;

        let record = match (session.code(), session.started_at()) {
            (Some(code), Some(started_at)) => Some(AttemptRecord {
                id: Uuid::new_v4().to_string(),
                quiz_code: code.as_str().to_string(),
                subject: None,
                started_at,
                finished_at: session.finished_at().unwrap_or_else(Utc::now),
                score: outcome.score,
                total: outcome.total,
                attendance_status: outcome.attendance_status,
                pass_fail: outcome.pass_fail,
                termination_reason: outcome.termination_reason,
                violations: session.violations(),
                remaining_secs: session.remaining_secs(),
            }),
            _ => None,
        };

        Some(FinishedAttempt {
            epoch: session.epoch(),
            state: session.state(),
            outcome,
            violations: session.violations(),
            remaining_secs: session.remaining_secs(),
            record,
        })
    }
}

/// Async owner of one learner's quiz session. All transitions, including
/// timer ticks and integrity signals, go through the same mutex, so the
/// first event to take the lock wins and later ones see a settled state.
#[derive(Clone)]
pub struct QuizController {
    cell: Arc<Mutex<SessionCell>>,
    questions: Arc<dyn QuestionSource>,
    signals: Arc<dyn SignalSource>,
    attempts: Option<Database>,
    events: broadcast::Sender<QuizEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    monitor: Arc<Mutex<IntegrityMonitor>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl QuizController {
    pub fn new(
        rules: QuizRules,
        questions: Arc<dyn QuestionSource>,
        signals: Arc<dyn SignalSource>,
    ) -> Self {
        let debug_mode = std::env::var("QUIZ_PROCTOR_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            cell: Arc::new(Mutex::new(SessionCell {
                session: QuizSession::new(rules),
                active_token: None,
            })),
            questions,
            signals,
            attempts: None,
            events,
            ticker: Arc::new(Mutex::new(None)),
            monitor: Arc::new(Mutex::new(IntegrityMonitor::new())),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
        }
    }

    /// Finished attempts are written here, best effort.
    pub fn with_attempt_log(mut self, db: Database) -> Self {
        self.attempts = Some(db);
        self
    }

    /// Real time per countdown second. Only tests shorten this.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QuizEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> QuizSnapshot {
        self.cell.lock().await.session.snapshot()
    }

    pub async fn state(&self) -> SessionState {
        self.cell.lock().await.session.state()
    }

    pub async fn outcome(&self) -> Option<QuizOutcome> {
        self.cell.lock().await.session.outcome()
    }

    pub async fn is_monitoring(&self) -> bool {
        self.monitor.lock().await.is_running()
    }

    /// True while clipboard shortcuts and the context menu must be swallowed.
    pub async fn should_block_input(&self) -> bool {
        self.state().await == SessionState::Active
    }

    pub async fn submit_code(&self, raw: &str) -> Result<bool, QuizError> {
        let code = {
            let mut cell = self.cell.lock().await;
            match cell.session.check_code(raw)? {
                Some(code) => code,
                None => return Ok(false),
            }
        };

        let resolved = self.questions.resolve(&code).await;

        let (accepted, epoch) = {
            let mut cell = self.cell.lock().await;
            match resolved {
                Ok(questions) => (
                    cell.session.accept_questions(code, questions)?,
                    cell.session.epoch(),
                ),
                Err(err) => {
                    warn!("quiz code {code} rejected: {err}");
                    cell.session.reject_code(&err);
                    return Err(err);
                }
            }
        };

        if accepted {
            self.emit(QuizEvent::StateChanged {
                state: SessionState::ShowingRules,
                epoch,
            });
        }
        Ok(accepted)
    }

    pub async fn back(&self) -> bool {
        self.apply(QuizSession::back).await
    }

    pub async fn start(&self) -> bool {
        let (epoch, token) = {
            let mut cell = self.cell.lock().await;
            if !cell.session.start() {
                return false;
            }
            cell.close_active();
            let token = CancellationToken::new();
            cell.active_token = Some(token.clone());
            (cell.session.epoch(), token)
        };

        self.spawn_ticker(epoch, token.clone()).await;

        let handler: Arc<dyn ViolationHandler> = Arc::new(self.clone());
        if let Err(err) = self
            .monitor
            .lock()
            .await
            .start_monitoring(epoch, self.signals.as_ref(), handler, token)
            .await
        {
            error!("integrity monitor failed to start; quiz continues unmonitored: {err:#}");
        }

        self.emit(QuizEvent::StateChanged {
            state: SessionState::Active,
            epoch,
        });
        true
    }

    pub async fn select_answer(&self, question_index: usize, option_index: usize) -> bool {
        self.apply(|session| session.select_answer(question_index, option_index))
            .await
    }

    pub async fn select_current(&self, option_index: usize) -> bool {
        self.apply(|session| session.select_current(option_index)).await
    }

    pub async fn navigate(&self, new_index: usize) -> bool {
        self.apply(|session| session.navigate(new_index)).await
    }

    pub async fn next(&self) -> bool {
        self.apply(QuizSession::next).await
    }

    pub async fn prev(&self) -> bool {
        self.apply(QuizSession::prev).await
    }

    pub async fn submit(&self) -> Option<QuizOutcome> {
        let finished = {
            let mut cell = self.cell.lock().await;
            cell.session.submit()?;
            cell.close_active();
            cell.take_finished()?
        };

        let outcome = finished.outcome;
        self.complete(finished).await;
        Some(outcome)
    }

    pub async fn reset_for_new_attempt(&self) -> bool {
        let epoch = {
            let mut cell = self.cell.lock().await;
            if !cell.session.reset_for_new_attempt() {
                return false;
            }
            cell.close_active();
            cell.session.epoch()
        };

        info!("session reset for a new attempt");
        self.emit(QuizEvent::StateChanged {
            state: SessionState::EnteringCode,
            epoch,
        });
        true
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.cell.lock().await.close_active();

        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
        self.monitor.lock().await.stop_monitoring().await
    }

    /// Runs a synchronous transition and announces it if the state moved.
    async fn apply<F>(&self, op: F) -> bool
    where
        F: FnOnce(&mut QuizSession) -> bool,
    {
        let (applied, before, after, epoch) = {
            let mut cell = self.cell.lock().await;
            let before = cell.session.state();
            let applied = op(&mut cell.session);
            (applied, before, cell.session.state(), cell.session.epoch())
        };

        if applied && before != after {
            self.emit(QuizEvent::StateChanged {
                state: after,
                epoch,
            });
        }
        applied
    }

    async fn complete(&self, finished: FinishedAttempt) {
        if let (Some(db), Some(record)) = (&self.attempts, &finished.record) {
            if let Err(err) = db.insert_attempt(record).await {
                error!("failed to record attempt {}: {err:#}", record.id);
            }
        }

        self.emit(QuizEvent::SessionFinished {
            outcome: finished.outcome,
            violations: finished.violations,
            remaining_secs: finished.remaining_secs,
        });
        self.emit(QuizEvent::StateChanged {
            state: finished.state,
            epoch: finished.epoch,
        });
    }

    async fn spawn_ticker(&self, epoch: u64, token: CancellationToken) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            controller.run_ticker(epoch, token).await;
        });

        *ticker_guard = Some(handle);
    }

    async fn run_ticker(&self, epoch: u64, token: CancellationToken) {
        let period = self.tick_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    log_debug!("ticker for epoch {} cancelled", epoch);
                    break;
                }
                _ = interval.tick() => {}
            }

            let (tick, urgent_threshold, finished) = {
                let mut cell = self.cell.lock().await;
                if cell.session.epoch() != epoch {
                    break;
                }
                let tick = cell.session.tick();
                let finished = if tick == TickOutcome::Expired {
                    cell.close_active();
                    cell.take_finished()
                } else {
                    None
                };
                (tick, cell.session.rules().urgent_threshold_secs, finished)
            };

            match tick {
                TickOutcome::Idle => break,
                TickOutcome::Remaining(remaining) => {
                    ticks = ticks.wrapping_add(1);
                    let is_urgent = remaining < urgent_threshold;
                    if is_urgent || ticks % self.heartbeat_every_ticks == 0 {
                        self.emit(QuizEvent::TimerTick {
                            remaining_secs: remaining,
                            display: format_mmss(remaining),
                            is_urgent,
                        });
                    }
                }
                TickOutcome::Expired => {
                    self.emit(QuizEvent::TimerTick {
                        remaining_secs: 0,
                        display: format_mmss(0),
                        is_urgent: true,
                    });
                    match finished {
                        Some(finished) => self.complete(finished).await,
                        None => log_error!("epoch {} expired without an outcome", epoch),
                    }
                    break;
                }
            }
        }
    }

    fn emit(&self, event: QuizEvent) {
        // No subscribers is normal when nothing is rendering.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl ViolationHandler for QuizController {
    async fn on_focus_lost(&self, epoch: u64) {
        let (violation, threshold, finished) = {
            let mut cell = self.cell.lock().await;
            if cell.session.epoch() != epoch {
                return;
            }
            let violation = cell.session.record_focus_lost();
            let finished = if matches!(violation, ViolationOutcome::Terminated { .. }) {
                cell.close_active();
                cell.take_finished()
            } else {
                None
            };
            (violation, cell.session.rules().violation_threshold, finished)
        };

        match violation {
            ViolationOutcome::Ignored => {}
            ViolationOutcome::Warned { count, message } => {
                self.emit(QuizEvent::ViolationWarning {
                    count,
                    threshold,
                    message,
                });
            }
            ViolationOutcome::Terminated { count, message, .. } => {
                self.emit(QuizEvent::ViolationWarning {
                    count,
                    threshold,
                    message,
                });
                if let Some(finished) = finished {
                    self.complete(finished).await;
                }
            }
        }
    }

    async fn on_restricted_input(&self, epoch: u64, input: RestrictedInput) {
        let blocked = {
            let mut cell = self.cell.lock().await;
            cell.session.epoch() == epoch && cell.session.record_restricted_input(input)
        };

        if blocked {
            self.emit(QuizEvent::InputBlocked { input });
        }
    }
}
