use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracker_core::{JobSnapshot, JobStatus};
use tracker_engine::{poll_until_terminal, Backoff, PollExit, PollSchedule};

type Reply = Result<JobSnapshot, String>;

/// Hands out scripted replies in order and counts fetches.
#[derive(Clone, Default)]
struct Script {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<AtomicUsize>,
}

impl Script {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn next(&self) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobSnapshot::with_status(JobStatus::Processing)))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn processing() -> Reply {
    Ok(JobSnapshot::with_status(JobStatus::Processing))
}

#[tokio::test(start_paused = true)]
async fn stops_on_first_terminal_snapshot() {
    let script = Script::new(vec![
        processing(),
        processing(),
        processing(),
        Ok(JobSnapshot::completed("https://x/out.mp4")),
    ]);
    let mut seen = Vec::new();

    let exit = poll_until_terminal(
        || script.next(),
        JobSnapshot::is_terminal,
        |result| seen.push(result),
        PollSchedule::fixed(Duration::from_secs(3)),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(exit, PollExit::Terminal);
    assert_eq!(script.calls(), 4);
    assert_eq!(
        seen.last(),
        Some(&Ok(JobSnapshot::completed("https://x/out.mp4")))
    );
}

#[tokio::test(start_paused = true)]
async fn failed_fetches_are_retried() {
    let script = Script::new(vec![
        Err("connection reset".to_string()),
        Err("connection reset".to_string()),
        Ok(JobSnapshot::failed(Some("render timeout".to_string()))),
    ]);
    let mut errors = 0;

    let exit = poll_until_terminal(
        || script.next(),
        JobSnapshot::is_terminal,
        |result| {
            if result.is_err() {
                errors += 1;
            }
        },
        PollSchedule::fixed(Duration::from_secs(5)),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(exit, PollExit::Terminal);
    assert_eq!(errors, 2);
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn first_poll_waits_one_interval() {
    let script = Script::new(vec![Ok(JobSnapshot::completed("https://x/a.mp4"))]);
    let started = tokio::time::Instant::now();

    poll_until_terminal(
        || script.next(),
        JobSnapshot::is_terminal,
        |_| {},
        PollSchedule::fixed(Duration::from_secs(10)),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn backoff_spaces_out_polls_after_failures() {
    let script = Script::new(vec![
        Err("down".to_string()),
        Err("down".to_string()),
        Ok(JobSnapshot::completed("https://x/a.mp4")),
    ]);
    let started = tokio::time::Instant::now();
    let schedule = PollSchedule::fixed(Duration::from_secs(2)).with_backoff(Backoff {
        factor: 2,
        max_interval: Duration::from_secs(5),
    });

    poll_until_terminal(
        || script.next(),
        JobSnapshot::is_terminal,
        |_| {},
        schedule,
        CancellationToken::new(),
    )
    .await;

    // 2s, then 4s after one failure, then capped at 5s after two.
    assert_eq!(started.elapsed(), Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_further_fetches() {
    let script = Script::new(Vec::new());
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        canceller.cancel();
    });

    let exit = poll_until_terminal(
        || script.next(),
        JobSnapshot::is_terminal,
        |_| {},
        PollSchedule::fixed(Duration::from_secs(3)),
        cancel,
    )
    .await;

    assert_eq!(exit, PollExit::Cancelled);
    assert_eq!(script.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_is_abandoned_on_cancel() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        canceller.cancel();
    });

    let exit = poll_until_terminal(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<Reply>()
        },
        JobSnapshot::is_terminal,
        |_| {},
        PollSchedule::fixed(Duration::from_secs(1)),
        cancel,
    )
    .await;

    assert_eq!(exit, PollExit::Cancelled);
    // The hung request is never doubled up.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
