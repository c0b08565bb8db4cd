use thiserror::Error;
use tracker_core::{FeatureKind, JobId, JobSnapshot, PollFailure, SubmitFailure, SubmitOutcome};

/// Payload could not be mapped onto the canonical job shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("response is not valid json: {0}")]
    InvalidJson(String),
    #[error("response has no {0} field")]
    MissingField(&'static str),
    #[error("unknown job status label {0:?}")]
    UnknownStatus(String),
    #[error("job failed immediately: {}", .0.as_deref().unwrap_or("no reason given"))]
    FailedOnSubmit(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("no session credential")]
    Unauthenticated,
    #[error("entitlement denied ({})", .reason.as_deref().unwrap_or("upgrade required"))]
    EntitlementDenied { reason: Option<String> },
    #[error("rate limited ({})", .message.as_deref().unwrap_or("try again later"))]
    RateLimited { message: Option<String> },
    #[error("request rejected: {message}")]
    Rejected { message: String },
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("response too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("no session credential")]
    Unauthenticated,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("response too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Failure while wiring up the engine, before any job is touched.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("http client could not be built: {0}")]
    Client(String),
    #[error("async runtime could not be started: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<SubmitError> for SubmitFailure {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Unauthenticated => SubmitFailure::Unauthenticated,
            SubmitError::EntitlementDenied { reason } => SubmitFailure::EntitlementDenied { reason },
            SubmitError::RateLimited { message } => SubmitFailure::RateLimited { message },
            SubmitError::Rejected { message } => SubmitFailure::Rejected { message },
            SubmitError::Adapter(AdapterError::FailedOnSubmit(reason)) => SubmitFailure::Rejected {
                message: reason.unwrap_or_else(|| "The job could not be started".to_string()),
            },
            other => SubmitFailure::Transient {
                message: other.to_string(),
            },
        }
    }
}

impl From<PollError> for PollFailure {
    fn from(err: PollError) -> Self {
        PollFailure::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Submitted {
        feature: FeatureKind,
        result: Result<SubmitOutcome, SubmitError>,
    },
    Polled {
        job_id: JobId,
        result: Result<JobSnapshot, PollError>,
    },
}
