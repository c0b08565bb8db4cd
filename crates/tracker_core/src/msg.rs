use crate::{JobId, JobInput, JobSnapshot, PollFailure, SubmitFailure, SubmitOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Session provider reported whether a credential is available.
    SessionChanged { signed_in: bool },
    /// User edited the job parameters.
    InputChanged(JobInput),
    /// User asked to start a job with the current parameters.
    SubmitClicked,
    /// Engine reply to the last submission.
    SubmitFinished(Result<SubmitOutcome, SubmitFailure>),
    /// One poll tick for a job.
    StatusPolled {
        job_id: JobId,
        result: Result<JobSnapshot, PollFailure>,
    },
    /// User clicked Retry on a failed job.
    RetryClicked,
    /// The owning view was torn down.
    ViewClosed,
    /// Fallback for placeholder wiring.
    NoOp,
}
