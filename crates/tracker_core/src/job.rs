/// Opaque identifier assigned by the backend when a job is created.
pub type JobId = String;

/// Canonical four-state job status every backend label set collapses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One observation of a job, already normalized from the feature's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub artifact_url: Option<String>,
    pub error: Option<String>,
    /// Backend-reported percent in `0..=100`, when the backend reports one.
    pub progress: Option<u8>,
}

impl JobSnapshot {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            artifact_url: None,
            error: None,
            progress: None,
        }
    }

    pub fn completed(artifact_url: impl Into<String>) -> Self {
        Self {
            artifact_url: Some(artifact_url.into()),
            ..Self::with_status(JobStatus::Completed)
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Self {
            error,
            ..Self::with_status(JobStatus::Failed)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Successful reply to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend already had the artifact; nothing to poll.
    Cached { artifact_url: String },
    /// Work started; poll with this id.
    Started { job_id: JobId },
}

/// Why a submission did not start a job, grouped by the UI reaction it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    Unauthenticated,
    EntitlementDenied { reason: Option<String> },
    RateLimited { message: Option<String> },
    Rejected { message: String },
    Transient { message: String },
}

/// A poll that produced no snapshot. Never terminal on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollFailure {
    pub message: String,
}

impl PollFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
