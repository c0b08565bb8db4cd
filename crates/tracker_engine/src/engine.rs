use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracker_core::{FeatureKind, JobId, JobInput, JobSnapshot};
use tracker_logging::{tracker_debug, tracker_info, tracker_warn};

use crate::client::JobClient;
use crate::poller::{poll_until_terminal, Backoff, PollExit, PollSchedule};
use crate::{EngineEvent, SetupError};

enum EngineCommand {
    Submit {
        feature: FeatureKind,
        input: JobInput,
    },
    StartPolling {
        job_id: JobId,
        feature: FeatureKind,
        interval: Duration,
    },
    StopPolling {
        job_id: JobId,
    },
    Shutdown,
}

/// Runs submissions and pollers on a background runtime and reports back as
/// [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(client: Arc<dyn JobClient>, backoff: Option<Backoff>) -> Result<Self, SetupError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("tracker-engine")
            .build()?;

        thread::spawn(move || {
            let mut pollers: HashMap<JobId, CancellationToken> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Submit { feature, input } => {
                        let client = client.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = client.submit(feature, &input).await;
                            let _ = event_tx.send(EngineEvent::Submitted { feature, result });
                        });
                    }
                    EngineCommand::StartPolling {
                        job_id,
                        feature,
                        interval,
                    } => {
                        pollers.retain(|_, token| !token.is_cancelled());
                        if pollers.contains_key(&job_id) {
                            tracker_debug!("job {} is already being polled", job_id);
                            continue;
                        }
                        let token = CancellationToken::new();
                        pollers.insert(job_id.clone(), token.clone());
                        let mut schedule = PollSchedule::fixed(interval);
                        if let Some(backoff) = backoff {
                            schedule = schedule.with_backoff(backoff);
                        }
                        runtime.spawn(run_poller(
                            client.clone(),
                            feature,
                            job_id,
                            schedule,
                            token,
                            event_tx.clone(),
                        ));
                    }
                    EngineCommand::StopPolling { job_id } => {
                        if let Some(token) = pollers.remove(&job_id) {
                            tracker_debug!("stopping poller for job {}", job_id);
                            token.cancel();
                        }
                    }
                    EngineCommand::Shutdown => break,
                }
            }
            for token in pollers.values() {
                token.cancel();
            }
            runtime.shutdown_timeout(Duration::from_secs(1));
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, feature: FeatureKind, input: JobInput) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { feature, input });
    }

    pub fn start_polling(&self, job_id: JobId, feature: FeatureKind, interval: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling {
            job_id,
            feature,
            interval,
        });
    }

    pub fn stop_polling(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::StopPolling { job_id });
    }

    /// Cancels every poller. Backend jobs keep running.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_poller(
    client: Arc<dyn JobClient>,
    feature: FeatureKind,
    job_id: JobId,
    schedule: PollSchedule,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    tracker_info!(
        "polling job {} ({}) every {:?}",
        job_id,
        feature,
        schedule.interval
    );
    let exit = poll_until_terminal(
        || client.poll(feature, &job_id),
        JobSnapshot::is_terminal,
        |result| {
            if let Err(err) = &result {
                tracker_warn!("poll for job {} failed, retrying next tick: {}", job_id, err);
            }
            let _ = event_tx.send(EngineEvent::Polled {
                job_id: job_id.clone(),
                result,
            });
        },
        schedule,
        token.clone(),
    )
    .await;
    if exit == PollExit::Terminal {
        // Lets the command loop prune this entry.
        token.cancel();
    }
    tracker_debug!("poller for job {} exited: {:?}", job_id, exit);
}
