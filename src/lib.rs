pub mod db;
pub mod error;
pub mod integrity;
pub mod models;
pub mod questions;
pub mod quiz;
pub mod scoring;
pub mod settings;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use db::Database;
use integrity::ChannelSignalSource;
use questions::{seed_demo_quiz, DbQuestionSource, DEMO_QUIZ_CODE};
use quiz::{
    commands::{execute, ConsoleCommand},
    QuizController, QuizEvent,
};
use settings::SettingsStore;

pub struct AppState {
    pub db: Database,
    pub quiz: QuizController,
    pub signals: Arc<ChannelSignalSource>,
    pub settings: SettingsStore,
}

fn data_dir() -> PathBuf {
    std::env::var_os("QUIZ_PROCTOR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".quiz-proctor"))
}

pub fn run() -> Result<()> {
    // RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("quiz proctor starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let state = setup().await?;
        serve(state).await
    })
}

async fn setup() -> Result<AppState> {
    let app_data_dir = data_dir();
    std::fs::create_dir_all(&app_data_dir)
        .with_context(|| format!("failed to create {}", app_data_dir.display()))?;

    let database = Database::new(app_data_dir.join("quiz-proctor.sqlite3"))?;
    debug!("attempt history at {}", database.path().display());
    if seed_demo_quiz(&database).await? {
        info!("demo quiz available under code {DEMO_QUIZ_CODE}");
    }

    let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
    let rules = settings_store.rules();

    let signals = Arc::new(ChannelSignalSource::new());
    let question_source = Arc::new(DbQuestionSource::new(
        database.clone(),
        rules.question_count,
    ));
    let quiz = QuizController::new(rules, question_source, signals.clone())
        .with_attempt_log(database.clone());

    Ok(AppState {
        db: database,
        quiz,
        signals,
        settings: settings_store,
    })
}

async fn serve(state: AppState) -> Result<()> {
    let mut events = state.quiz.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("console skipped {skipped} quiz events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("type 'help' for commands; the demo quiz code is {DEMO_QUIZ_CODE}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match execute(&state, command).await {
            Ok(Some(reply)) => println!("{reply}"),
            Ok(None) => break,
            Err(err) => println!("error: {err}"),
        }
    }

    state.quiz.shutdown().await?;
    printer.abort();
    info!("quiz proctor shut down");
    Ok(())
}

fn print_event(event: &QuizEvent) {
    debug!("event {}: {}", event.event_name(), event.to_json());

    match event {
        QuizEvent::TimerTick {
            display, is_urgent, ..
        } => {
            if *is_urgent {
                println!("[{display}] hurry up");
            } else {
                println!("[{display}]");
            }
        }
        QuizEvent::ViolationWarning { message, .. } => println!("{message}"),
        QuizEvent::InputBlocked { input } => println!("({} is disabled during the quiz)", input.as_str()),
        QuizEvent::SessionFinished { outcome, .. } => println!(
            "quiz over: {}/{} ({}), {}",
            outcome.score,
            outcome.total,
            outcome.termination_reason.as_str(),
            outcome.pass_fail.as_str(),
        ),
        QuizEvent::StateChanged { .. } => {}
    }
}
