use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tracker_core::{update, FeatureKind, InputRule, Msg, Phase, TrackerState};
use tracker_engine::{EngineHandle, EnvSession, ReqwestJobClient, SessionProvider};
use tracker_logging::{tracker_info, tracker_warn};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::history::{append_history, load_history, HistoryEntry, Outcome};
use super::logging;
use super::render::render;
use crate::cli::{Cli, Command, SubmitArgs};

const EVENT_WAIT: Duration = Duration::from_millis(200);
const PROMPT_POLL: Duration = Duration::from_millis(100);

pub fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(destination) = cli.log {
        config.log_destination = destination;
    }
    logging::initialize(config.log_destination, config.level());

    match cli.command {
        Command::Submit(args) => run_submit(&config, &args),
        Command::History => {
            print_history(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Features => {
            print_features(&config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_submit(config: &AppConfig, args: &SubmitArgs) -> Result<ExitCode> {
    let feature_config = config.feature_config(args.feature)?;
    let session = Arc::new(EnvSession::new(config.token_env.clone()));
    let signed_in = session.is_signed_in();

    let mut client = ReqwestJobClient::new(config.client_settings(), session)
        .context("failed to set up the job client")?;
    for (kind, endpoint) in config.endpoint_overrides()? {
        client = client.with_endpoint(kind, endpoint);
    }
    let engine = EngineHandle::new(Arc::new(client), config.backoff())
        .context("failed to start the job engine")?;
    let runner = EffectRunner::new(engine);

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracker_warn!("Ctrl-C handler not installed: {}", err);
    }

    let mut tracker = Tracker::new(TrackerState::new(feature_config), &runner);
    tracker.dispatch(Msg::SessionChanged { signed_in });
    tracker.dispatch(Msg::InputChanged(args.job_input()));
    tracker.dispatch(Msg::SubmitClicked);

    loop {
        if interrupted.load(Ordering::SeqCst) {
            tracker_info!("interrupted; closing the job view");
            tracker.dispatch(Msg::ViewClosed);
            break;
        }

        match tracker.state.phase().clone() {
            Phase::Idle => break,
            Phase::Completed { .. } => {
                tracker.record(&config.history_dir);
                break;
            }
            Phase::Failed { .. } => {
                tracker.record(&config.history_dir);
                if !tracker.state.view().can_retry || !(args.yes || ask_retry(&interrupted)) {
                    break;
                }
                tracker.dispatch(Msg::RetryClicked);
                if tracker.state.phase().is_terminal() {
                    break;
                }
            }
            Phase::Submitting | Phase::Queued | Phase::Processing => {
                if let Some(msg) = runner.next_msg(EVENT_WAIT) {
                    tracker.dispatch(msg);
                }
            }
        }
    }

    runner.shutdown();
    let completed = matches!(tracker.state.phase(), Phase::Completed { .. });
    Ok(if completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Owns the state between messages and prints every dirty view.
struct Tracker<'a> {
    state: TrackerState,
    runner: &'a EffectRunner,
    last_lines: Vec<String>,
}

impl<'a> Tracker<'a> {
    fn new(state: TrackerState, runner: &'a EffectRunner) -> Self {
        Self {
            state,
            runner,
            last_lines: Vec::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let (mut state, effects) = update(self.state.clone(), msg);
        self.runner.run(effects);
        if state.consume_dirty() {
            let lines = render(&state.view());
            if lines != self.last_lines {
                let mut out = io::stdout().lock();
                for line in &lines {
                    let _ = writeln!(out, "{line}");
                }
                self.last_lines = lines;
            }
        }
        self.state = state;
    }

    fn record(&self, history_dir: &std::path::Path) {
        let entry = HistoryEntry::from_phase(
            self.state.config().kind,
            self.state.job_id(),
            self.state.phase(),
            Utc::now(),
        );
        if let Some(entry) = entry {
            append_history(history_dir, entry);
        }
    }
}

/// Asks on stdin; Ctrl-C while waiting counts as "no".
fn ask_retry(interrupted: &AtomicBool) -> bool {
    print!("Retry? [y/N] ");
    let _ = io::stdout().flush();
    let (answer_tx, answer_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_ok() {
            let _ = answer_tx.send(answer);
        }
    });
    wait_for_answer(&answer_rx, interrupted, PROMPT_POLL)
}

pub(crate) fn wait_for_answer(
    answers: &mpsc::Receiver<String>,
    interrupted: &AtomicBool,
    poll: Duration,
) -> bool {
    loop {
        if interrupted.load(Ordering::SeqCst) {
            println!();
            return false;
        }
        match answers.recv_timeout(poll) {
            Ok(answer) => {
                return !interrupted.load(Ordering::SeqCst) && is_yes(&answer);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_history(config: &AppConfig) {
    let entries = load_history(&config.history_dir);
    if entries.is_empty() {
        println!("No finished jobs yet.");
        return;
    }
    for entry in &entries {
        println!("{}", history_line(entry));
    }
}

pub(crate) fn history_line(entry: &HistoryEntry) -> String {
    let result = match &entry.outcome {
        Outcome::Completed { artifact_url } => format!("completed {artifact_url}"),
        Outcome::Failed { message } => format!("failed    {message}"),
    };
    format!(
        "{}  {:<17} {:<12} {}",
        entry.finished_utc.format("%Y-%m-%d %H:%M:%S"),
        entry.feature,
        entry.job_id.as_deref().unwrap_or("-"),
        result
    )
}

fn print_features(config: &AppConfig) -> Result<()> {
    for kind in FeatureKind::ALL {
        let feature = config.feature_config(kind)?;
        println!(
            "{:<17} every {:>3}s, {} retries, needs {}",
            kind.slug(),
            feature.poll_interval.as_secs(),
            feature.max_retries,
            describe_rule(feature.input_rule)
        );
    }
    Ok(())
}

pub(crate) fn describe_rule(rule: InputRule) -> String {
    match rule {
        InputRule::Topic => "--topic".to_string(),
        InputRule::QuestionId => "--target-id <question>".to_string(),
        InputRule::ScriptId => "--target-id <script>".to_string(),
        InputRule::TopicWithFacts { min_facts } => format!("--topic and {min_facts}+ --fact"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn history_line_lists_outcome() {
        let entry = HistoryEntry {
            feature: "pyq-explanation".to_string(),
            job_id: Some("exp-9".to_string()),
            outcome: Outcome::Completed {
                artifact_url: "https://x/avatar.mp4".to_string(),
            },
            finished_utc: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().unwrap(),
        };
        assert_eq!(
            history_line(&entry),
            "2026-03-01 09:30:00  pyq-explanation   exp-9        completed https://x/avatar.mp4"
        );
    }

    #[test]
    fn rules_name_the_flags_to_pass() {
        assert_eq!(
            describe_rule(InputRule::TopicWithFacts { min_facts: 3 }),
            "--topic and 3+ --fact"
        );
        assert_eq!(describe_rule(InputRule::ScriptId), "--target-id <script>");
    }

    #[test]
    fn ctrl_c_at_the_prompt_declines_without_an_answer() {
        let (_answer_tx, answers) = mpsc::channel::<String>();
        let interrupted = AtomicBool::new(true);
        assert!(!wait_for_answer(&answers, &interrupted, Duration::from_millis(5)));
    }

    #[test]
    fn ctrl_c_while_waiting_declines() {
        let (_answer_tx, answers) = mpsc::channel::<String>();
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();
        let interrupter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::SeqCst);
        });
        assert!(!wait_for_answer(&answers, &interrupted, Duration::from_millis(5)));
        interrupter.join().unwrap();
    }

    #[test]
    fn typed_answer_decides() {
        let (answer_tx, answers) = mpsc::channel();
        let interrupted = AtomicBool::new(false);
        answer_tx.send("Yes\n".to_string()).unwrap();
        assert!(wait_for_answer(&answers, &interrupted, Duration::from_millis(5)));
        answer_tx.send("\n".to_string()).unwrap();
        assert!(!wait_for_answer(&answers, &interrupted, Duration::from_millis(5)));
    }
}
