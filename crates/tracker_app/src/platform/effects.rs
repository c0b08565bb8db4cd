use std::time::Duration;

use tracker_core::{Effect, Msg};
use tracker_engine::{EngineEvent, EngineHandle};
use tracker_logging::{tracker_info, tracker_warn};

/// Executes core effects on the engine and turns engine events back into
/// messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitJob { feature, input } => {
                    tracker_info!("SubmitJob feature={} topic_len={}", feature, input.topic.len());
                    self.engine.submit(feature, input);
                }
                Effect::StartPolling {
                    job_id,
                    feature,
                    interval,
                } => {
                    self.engine.start_polling(job_id, feature, interval);
                }
                Effect::StopPolling { job_id } => {
                    self.engine.stop_polling(job_id);
                }
            }
        }
    }

    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(event_to_msg)
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

pub(crate) fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted { feature, result } => {
            if let Err(err) = &result {
                tracker_warn!("submit for {} failed: {}", feature, err);
            }
            Msg::SubmitFinished(result.map_err(Into::into))
        }
        EngineEvent::Polled { job_id, result } => Msg::StatusPolled {
            job_id,
            result: result.map_err(Into::into),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracker_core::{FeatureKind, JobSnapshot, PollFailure, SubmitFailure};
    use tracker_engine::{PollError, SubmitError};

    #[test]
    fn entitlement_denial_keeps_its_reason() {
        let msg = event_to_msg(EngineEvent::Submitted {
            feature: FeatureKind::PalaceAnimation,
            result: Err(SubmitError::EntitlementDenied {
                reason: Some("trial_expired".to_string()),
            }),
        });
        assert_eq!(
            msg,
            Msg::SubmitFinished(Err(SubmitFailure::EntitlementDenied {
                reason: Some("trial_expired".to_string())
            }))
        );
    }

    #[test]
    fn poll_errors_become_poll_failures() {
        let msg = event_to_msg(EngineEvent::Polled {
            job_id: "j1".to_string(),
            result: Err(PollError::Timeout),
        });
        let Msg::StatusPolled { job_id, result } = msg else {
            panic!("expected StatusPolled");
        };
        assert_eq!(job_id, "j1");
        assert!(matches!(result, Err(PollFailure { .. })));
    }

    #[test]
    fn snapshots_pass_through() {
        let msg = event_to_msg(EngineEvent::Polled {
            job_id: "j2".to_string(),
            result: Ok(JobSnapshot::completed("https://x/a.mp4")),
        });
        assert_eq!(
            msg,
            Msg::StatusPolled {
                job_id: "j2".to_string(),
                result: Ok(JobSnapshot::completed("https://x/a.mp4")),
            }
        );
    }
}
