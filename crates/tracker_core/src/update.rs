use crate::input::validate;
use crate::state::{GENERIC_FAILURE, MISSING_ARTIFACT};
use crate::{
    Effect, JobId, JobSnapshot, JobStatus, Msg, Notice, Phase, PollFailure, SubmitFailure,
    SubmitOutcome, TrackerState,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    if state.is_closed() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::SessionChanged { signed_in } => {
            state.set_signed_in(signed_in);
            Vec::new()
        }
        Msg::InputChanged(input) => {
            state.set_input(input);
            Vec::new()
        }
        Msg::SubmitClicked => submit(&mut state),
        Msg::RetryClicked => retry(&mut state),
        Msg::SubmitFinished(result) => {
            if state.phase() != &Phase::Submitting {
                return (state, Vec::new());
            }
            match result {
                Ok(outcome) => apply_submit_outcome(&mut state, outcome),
                Err(failure) => {
                    state.submission_failed(notice_for(failure));
                    Vec::new()
                }
            }
        }
        Msg::StatusPolled { job_id, result } => {
            let is_current = state.job_id() == Some(job_id.as_str());
            if !is_current || !matches!(state.phase(), Phase::Queued | Phase::Processing) {
                return (state, Vec::new());
            }
            apply_poll(&mut state, job_id, result)
        }
        Msg::ViewClosed => match state.close() {
            Some(job_id) => vec![Effect::StopPolling { job_id }],
            None => Vec::new(),
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut TrackerState) -> Vec<Effect> {
    if state.phase().is_in_flight() {
        return Vec::new();
    }
    if !state.signed_in() {
        state.set_notice(Some(Notice::LoginRequired));
        return Vec::new();
    }
    let input = match validate(state.config().input_rule, state.input()) {
        Ok(input) => input,
        Err(err) => {
            state.set_notice(Some(Notice::Validation(err)));
            return Vec::new();
        }
    };

    // Resubmitting the same parameters after a failure spends the retry budget.
    let is_retry = state.submitted() == Some(&input)
        && match state.phase() {
            Phase::Failed { .. } => true,
            Phase::Idle => state.retries_used() > 0,
            _ => false,
        };
    if is_retry && state.retries_used() >= state.config().max_retries {
        return Vec::new();
    }

    state.begin_submission(input.clone(), is_retry);
    vec![Effect::SubmitJob {
        feature: state.config().kind,
        input,
    }]
}

fn retry(state: &mut TrackerState) -> Vec<Effect> {
    if !state.can_retry() {
        return Vec::new();
    }
    if !state.signed_in() {
        state.set_notice(Some(Notice::LoginRequired));
        return Vec::new();
    }
    let Some(input) = state.submitted().cloned() else {
        return Vec::new();
    };
    state.begin_submission(input.clone(), true);
    vec![Effect::SubmitJob {
        feature: state.config().kind,
        input,
    }]
}

fn apply_submit_outcome(state: &mut TrackerState, outcome: SubmitOutcome) -> Vec<Effect> {
    match outcome {
        SubmitOutcome::Cached { artifact_url } => {
            state.complete(artifact_url);
            Vec::new()
        }
        SubmitOutcome::Started { job_id } => {
            state.start_job(job_id.clone());
            vec![Effect::StartPolling {
                job_id,
                feature: state.config().kind,
                interval: state.config().poll_interval,
            }]
        }
    }
}

fn apply_poll(
    state: &mut TrackerState,
    job_id: JobId,
    result: Result<JobSnapshot, PollFailure>,
) -> Vec<Effect> {
    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(_) => {
            // Transient; the next tick tries again.
            state.record_tick(None);
            return Vec::new();
        }
    };

    match snapshot.status {
        JobStatus::Queued => {
            state.record_tick(snapshot.progress);
            Vec::new()
        }
        JobStatus::Processing => {
            state.mark_processing();
            state.record_tick(snapshot.progress);
            Vec::new()
        }
        JobStatus::Completed => {
            match snapshot.artifact_url {
                Some(artifact_url) => state.complete(artifact_url),
                None => state.fail(MISSING_ARTIFACT.to_string()),
            }
            vec![Effect::StopPolling { job_id }]
        }
        JobStatus::Failed => {
            let message = snapshot
                .error
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            state.fail(message);
            vec![Effect::StopPolling { job_id }]
        }
    }
}

fn notice_for(failure: SubmitFailure) -> Notice {
    match failure {
        SubmitFailure::Unauthenticated => Notice::LoginRequired,
        SubmitFailure::EntitlementDenied { reason } => Notice::UpgradeRequired { reason },
        SubmitFailure::RateLimited { message } => Notice::TryLater { message },
        SubmitFailure::Rejected { message } | SubmitFailure::Transient { message } => {
            Notice::SubmitFailed { message }
        }
    }
}
