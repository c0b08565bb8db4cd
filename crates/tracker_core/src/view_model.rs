use crate::{FeatureKind, JobId, Notice, Phase};

/// Everything a renderer needs to draw one tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobViewModel {
    pub feature: FeatureKind,
    pub phase: Phase,
    pub job_id: Option<JobId>,
    pub percent: u8,
    pub stage_label: &'static str,
    /// Artifact reference exactly as the backend returned it.
    pub artifact_url: Option<String>,
    pub error_message: Option<String>,
    pub notice: Option<Notice>,
    pub can_retry: bool,
    pub retries_left: u32,
    pub polling: bool,
    pub dirty: bool,
}
