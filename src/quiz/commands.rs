use std::fmt::Write as _;

use crate::{
    integrity::RestrictedInput,
    models::OPTIONS_PER_QUESTION,
    questions::import_generated_quiz,
    quiz::{QuizController, QuizSnapshot, SessionState},
    AppState,
};

const HISTORY_LIMIT: u32 = 10;

pub const HELP_TEXT: &str = "\
commands:
  code <6 digits>          enter a quiz code
  start | back             begin the quiz / return to code entry
  answer <q> <a-d|1-4>     answer question q
  pick <a-d|1-4>           answer the displayed question
  next | prev | goto <q>   move between questions
  submit                   finish and score the attempt
  reset                    start over after a finished attempt
  blur                     simulate leaving the quiz window
  copy | paste | selectall | print | menu | key ctrl+<k>
  status | history | rules
  import <file> [subject] [section]
  help | quit";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Code(String),
    Start,
    Back,
    Answer { question: usize, option: usize },
    Pick(usize),
    Next,
    Prev,
    Goto(usize),
    Submit,
    Reset,
    Blur,
    Restricted(RestrictedInput),
    Status,
    History,
    Rules,
    Import {
        path: String,
        subject: Option<String>,
        section: Option<String>,
    },
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Question numbers and numeric options are 1-based on the console and
    /// 0-based once parsed.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err("empty command".into());
        };
        let args: Vec<&str> = parts.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "code" => ConsoleCommand::Code(required(&args, 0, "code")?.to_string()),
            "start" => ConsoleCommand::Start,
            "back" => ConsoleCommand::Back,
            "answer" => ConsoleCommand::Answer {
                question: parse_question(required(&args, 0, "question")?)?,
                option: parse_option(required(&args, 1, "option")?)?,
            },
            "pick" => ConsoleCommand::Pick(parse_option(required(&args, 0, "option")?)?),
            "next" | "n" => ConsoleCommand::Next,
            "prev" | "p" => ConsoleCommand::Prev,
            "goto" => ConsoleCommand::Goto(parse_question(required(&args, 0, "question")?)?),
            "submit" => ConsoleCommand::Submit,
            "reset" => ConsoleCommand::Reset,
            "blur" => ConsoleCommand::Blur,
            "copy" => ConsoleCommand::Restricted(RestrictedInput::Copy),
            "paste" => ConsoleCommand::Restricted(RestrictedInput::Paste),
            "selectall" => ConsoleCommand::Restricted(RestrictedInput::SelectAll),
            "print" => ConsoleCommand::Restricted(RestrictedInput::Print),
            "menu" => ConsoleCommand::Restricted(RestrictedInput::ContextMenu),
            "key" => ConsoleCommand::Restricted(parse_key_combo(required(&args, 0, "key combo")?)?),
            "status" => ConsoleCommand::Status,
            "history" => ConsoleCommand::History,
            "rules" => ConsoleCommand::Rules,
            "import" => ConsoleCommand::Import {
                path: required(&args, 0, "file")?.to_string(),
                subject: args.get(1).map(|s| s.to_string()),
                section: args.get(2).map(|s| s.to_string()),
            },
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };

        Ok(command)
    }
}

fn required<'a>(args: &[&'a str], idx: usize, what: &str) -> Result<&'a str, String> {
    args.get(idx)
        .copied()
        .ok_or_else(|| format!("missing {what}"))
}

fn parse_question(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("'{raw}' is not a question number")),
    }
}

fn parse_option(raw: &str) -> Result<usize, String> {
    let mut chars = raw.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(format!("'{raw}' is not an option"));
    };

    let idx = match c.to_ascii_lowercase() {
        letter @ 'a'..='z' => letter as usize - 'a' as usize,
        digit @ '1'..='9' => digit as usize - '1' as usize,
        _ => return Err(format!("'{raw}' is not an option")),
    };

    if idx < OPTIONS_PER_QUESTION {
        Ok(idx)
    } else {
        Err(format!("'{raw}' is not an option"))
    }
}

fn parse_key_combo(raw: &str) -> Result<RestrictedInput, String> {
    let lower = raw.to_ascii_lowercase();
    let (ctrl, key) = match lower.strip_prefix("ctrl+") {
        Some(rest) => (true, rest),
        None => (false, lower.as_str()),
    };

    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => RestrictedInput::from_key_combo(ctrl, c)
            .ok_or_else(|| format!("{raw} is not a restricted shortcut")),
        _ => Err(format!("'{raw}' is not a key combo")),
    }
}

fn controller_from_state(state: &AppState) -> QuizController {
    state.quiz.clone()
}

/// Runs one command against the app. `Ok(None)` asks the caller to exit.
pub async fn execute(state: &AppState, command: ConsoleCommand) -> Result<Option<String>, String> {
    let controller = controller_from_state(state);

    let reply = match command {
        ConsoleCommand::Code(raw) => match controller.submit_code(&raw).await {
            Ok(true) => render_rules(&controller.snapshot().await),
            Ok(false) => "a code can only be entered on the code screen".into(),
            Err(err) => return Err(err.to_string()),
        },
        ConsoleCommand::Start => {
            if controller.start().await {
                render_snapshot(&controller.snapshot().await)
            } else {
                "nothing to start; enter a quiz code first".into()
            }
        }
        ConsoleCommand::Back => ack(controller.back().await, "back to code entry"),
        ConsoleCommand::Answer { question, option } => {
            ack(controller.select_answer(question, option).await, "answer saved")
        }
        ConsoleCommand::Pick(option) => ack(controller.select_current(option).await, "answer saved"),
        ConsoleCommand::Next => moved(&controller, controller.next().await).await,
        ConsoleCommand::Prev => moved(&controller, controller.prev().await).await,
        ConsoleCommand::Goto(idx) => moved(&controller, controller.navigate(idx).await).await,
        ConsoleCommand::Submit => match controller.submit().await {
            Some(_) => render_snapshot(&controller.snapshot().await),
            None => "no quiz in progress".into(),
        },
        ConsoleCommand::Reset => ack(
            controller.reset_for_new_attempt().await,
            "ready for a new quiz code",
        ),
        ConsoleCommand::Blur => {
            if state.signals.report_focus_lost() == 0 {
                "focus change ignored; no quiz is being monitored".into()
            } else {
                "focus lost".into()
            }
        }
        ConsoleCommand::Restricted(input) => {
            if controller.should_block_input().await {
                state.signals.report_restricted_input(input);
                format!("{} blocked", input.as_str())
            } else {
                format!("{} allowed", input.as_str())
            }
        }
        ConsoleCommand::Status => render_snapshot(&controller.snapshot().await),
        ConsoleCommand::History => history(state).await?,
        ConsoleCommand::Rules => {
            serde_json::to_string_pretty(&state.settings.rules()).map_err(|e| e.to_string())?
        }
        ConsoleCommand::Import {
            path,
            subject,
            section,
        } => {
            let raw = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
            let code = import_generated_quiz(&state.db, &raw, subject.as_deref(), section.as_deref())
                .await
                .map_err(|e| format!("{e:#}"))?;
            format!("imported quiz; share code {code}")
        }
        ConsoleCommand::Help => HELP_TEXT.into(),
        ConsoleCommand::Quit => return Ok(None),
    };

    Ok(Some(reply))
}

fn ack(applied: bool, message: &str) -> String {
    if applied {
        message.to_string()
    } else {
        "not allowed right now".to_string()
    }
}

async fn moved(controller: &QuizController, applied: bool) -> String {
    if applied {
        render_snapshot(&controller.snapshot().await)
    } else {
        "not allowed right now".to_string()
    }
}

async fn history(state: &AppState) -> Result<String, String> {
    let attempts = state
        .db
        .list_attempts(HISTORY_LIMIT)
        .await
        .map_err(|e| e.to_string())?;
    let summary = state.db.attempt_summary().await.map_err(|e| e.to_string())?;

    if attempts.is_empty() {
        return Ok("no attempts yet".into());
    }

    let mut out = String::new();
    for attempt in &attempts {
        let _ = writeln!(
            out,
            "{}  {} {:<16} {:>2}/{:<2} {:<7} {:<4} {}",
            attempt.finished_at.format("%Y-%m-%d %H:%M"),
            attempt.quiz_code,
            attempt.subject.as_deref().unwrap_or("-"),
            attempt.score,
            attempt.total,
            attempt.attendance_status.as_str(),
            attempt.pass_fail.as_str(),
            attempt.termination_reason.as_str(),
        );
    }
    let _ = write!(
        out,
        "{} attempts, average {:.1}, present {}, passed {}",
        summary.attempts, summary.average_score, summary.present_count, summary.pass_count
    );
    Ok(out)
}

fn render_rules(snapshot: &QuizSnapshot) -> String {
    format!(
        "quiz {} ready: {} questions, {} on the clock, {} tab switches end the attempt. type 'start' to begin",
        snapshot.code.as_deref().unwrap_or("-"),
        snapshot.total_questions,
        snapshot.remaining_display,
        snapshot.violation_threshold,
    )
}

/// Human-readable rendering of whatever screen the session is on.
pub fn render_snapshot(snapshot: &QuizSnapshot) -> String {
    let mut out = String::new();

    match snapshot.state {
        SessionState::EnteringCode => {
            out.push_str("enter a 6-digit quiz code");
            if let Some(err) = &snapshot.code_error {
                let _ = write!(out, " ({err})");
            }
        }
        SessionState::ShowingRules => out.push_str(&render_rules(snapshot)),
        SessionState::Active => {
            let _ = writeln!(
                out,
                "[{}{}] question {}/{}  answered {}  warnings {}/{}",
                snapshot.remaining_display,
                if snapshot.is_urgent { " !" } else { "" },
                snapshot.cursor + 1,
                snapshot.total_questions,
                snapshot.answered,
                snapshot.violations,
                snapshot.violation_threshold,
            );
            if let Some(question) = &snapshot.current_question {
                let _ = writeln!(out, "{}", question.text);
                let selected = snapshot.answers.get(&snapshot.cursor).copied();
                for (idx, option) in question.options.iter().enumerate() {
                    let marker = if selected == Some(idx) { '*' } else { ' ' };
                    let _ = writeln!(out, " {marker} {}) {option}", (b'a' + idx as u8) as char);
                }
            }
            if let Some(warning) = &snapshot.warning {
                let _ = write!(out, "{warning}");
            }
        }
        SessionState::Completed | SessionState::ForciblyTerminated => {
            if snapshot.state == SessionState::ForciblyTerminated {
                out.push_str("quiz terminated: too many tab switches\n");
            }
            if let Some(outcome) = &snapshot.outcome {
                let _ = write!(
                    out,
                    "score {}/{}  attendance {}  result {}  ({})",
                    outcome.score,
                    outcome.total,
                    outcome.attendance_status.as_str(),
                    outcome.pass_fail.as_str(),
                    outcome.termination_reason.as_str(),
                );
            }
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_and_answers() {
        assert_eq!(ConsoleCommand::parse("start"), Ok(ConsoleCommand::Start));
        assert_eq!(ConsoleCommand::parse("  NEXT "), Ok(ConsoleCommand::Next));
        assert_eq!(ConsoleCommand::parse("goto 20"), Ok(ConsoleCommand::Goto(19)));
        assert_eq!(
            ConsoleCommand::parse("answer 3 c"),
            Ok(ConsoleCommand::Answer {
                question: 2,
                option: 2
            })
        );
        assert_eq!(ConsoleCommand::parse("pick 4"), Ok(ConsoleCommand::Pick(3)));
        assert_eq!(ConsoleCommand::parse("pick B"), Ok(ConsoleCommand::Pick(1)));
    }

    #[test]
    fn code_is_passed_through_unvalidated() {
        assert_eq!(
            ConsoleCommand::parse("code 12ab56"),
            Ok(ConsoleCommand::Code("12ab56".into()))
        );
        assert!(ConsoleCommand::parse("code").is_err());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(ConsoleCommand::parse("").is_err());
        assert!(ConsoleCommand::parse("goto 0").is_err());
        assert!(ConsoleCommand::parse("pick e").is_err());
        assert!(ConsoleCommand::parse("pick 5").is_err());
        assert!(ConsoleCommand::parse("answer 1").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[test]
    fn maps_restricted_inputs() {
        assert_eq!(
            ConsoleCommand::parse("key ctrl+V"),
            Ok(ConsoleCommand::Restricted(RestrictedInput::Paste))
        );
        assert_eq!(
            ConsoleCommand::parse("menu"),
            Ok(ConsoleCommand::Restricted(RestrictedInput::ContextMenu))
        );
        assert!(ConsoleCommand::parse("key c").is_err());
        assert!(ConsoleCommand::parse("key ctrl+z").is_err());
    }

    #[test]
    fn import_takes_optional_subject_and_section() {
        assert_eq!(
            ConsoleCommand::parse("import quiz.json Algorithms B"),
            Ok(ConsoleCommand::Import {
                path: "quiz.json".into(),
                subject: Some("Algorithms".into()),
                section: Some("B".into()),
            })
        );
    }
}
