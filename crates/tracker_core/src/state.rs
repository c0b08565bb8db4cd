use crate::progress::{stage_label, ProgressTracker};
use crate::view_model::JobViewModel;
use crate::{FeatureConfig, FeatureKind, JobId, JobInput, ValidationError};

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";
pub const MISSING_ARTIFACT: &str = "Job finished without an artifact";

/// Where the tracked job is in its lifecycle. Transitions only move forward
/// except for an explicit resubmission out of `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Queued,
    Processing,
    Completed { artifact_url: String },
    Failed { message: String },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed { .. } | Phase::Failed { .. })
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Phase::Submitting | Phase::Queued | Phase::Processing)
    }
}

/// Banner shown next to the job; each variant needs a different UI reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Validation(ValidationError),
    LoginRequired,
    UpgradeRequired { reason: Option<String> },
    TryLater { message: Option<String> },
    SubmitFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    config: FeatureConfig,
    signed_in: bool,
    input: JobInput,
    submitted: Option<JobInput>,
    phase: Phase,
    job_id: Option<JobId>,
    progress: ProgressTracker,
    notice: Option<Notice>,
    retries_used: u32,
    polling: bool,
    closed: bool,
    dirty: bool,
}

impl TrackerState {
    pub fn new(config: FeatureConfig) -> Self {
        let progress = ProgressTracker::new(config.progress_step);
        Self {
            config,
            signed_in: false,
            input: JobInput::default(),
            submitted: None,
            phase: Phase::Idle,
            job_id: None,
            progress,
            notice: None,
            retries_used: 0,
            polling: false,
            closed: false,
            dirty: false,
        }
    }

    pub fn for_feature(kind: FeatureKind) -> Self {
        Self::new(FeatureConfig::for_kind(kind))
    }

    pub fn view(&self) -> JobViewModel {
        let percent = self.progress.percent();
        let (artifact_url, error_message) = match &self.phase {
            Phase::Completed { artifact_url } => (Some(artifact_url.clone()), None),
            Phase::Failed { message } => (None, Some(message.clone())),
            _ => (None, None),
        };
        JobViewModel {
            feature: self.config.kind,
            phase: self.phase.clone(),
            job_id: self.job_id.clone(),
            percent,
            stage_label: stage_label(&self.config, &self.phase, percent),
            artifact_url,
            error_message,
            notice: self.notice.clone(),
            can_retry: self.can_retry(),
            retries_left: self.retries_left(),
            polling: self.polling,
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    pub(crate) fn signed_in(&self) -> bool {
        self.signed_in
    }

    pub(crate) fn input(&self) -> &JobInput {
        &self.input
    }

    pub(crate) fn submitted(&self) -> Option<&JobInput> {
        self.submitted.as_ref()
    }

    pub(crate) fn can_retry(&self) -> bool {
        matches!(self.phase, Phase::Failed { .. })
            && self.submitted.is_some()
            && self.retries_used < self.config.max_retries
    }

    fn retries_left(&self) -> u32 {
        self.config.max_retries.saturating_sub(self.retries_used)
    }

    pub(crate) fn set_signed_in(&mut self, signed_in: bool) {
        if self.signed_in != signed_in {
            self.signed_in = signed_in;
            self.mark_dirty();
        }
        if signed_in && self.notice == Some(Notice::LoginRequired) {
            self.set_notice(None);
        }
    }

    pub(crate) fn set_input(&mut self, input: JobInput) {
        self.input = input;
        if matches!(self.notice, Some(Notice::Validation(_))) {
            self.set_notice(None);
        }
    }

    pub(crate) fn set_notice(&mut self, notice: Option<Notice>) {
        if self.notice != notice {
            self.notice = notice;
            self.mark_dirty();
        }
    }

    /// Enters `Submitting` for `input`; a fresh input resets the retry budget.
    pub(crate) fn begin_submission(&mut self, input: JobInput, is_retry: bool) {
        if is_retry {
            self.retries_used += 1;
        } else {
            self.retries_used = 0;
        }
        self.submitted = Some(input);
        self.job_id = None;
        self.progress.reset();
        self.phase = Phase::Submitting;
        self.notice = None;
        self.mark_dirty();
    }

    pub(crate) fn start_job(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
        self.phase = Phase::Queued;
        self.polling = true;
        self.mark_dirty();
    }

    pub(crate) fn submission_failed(&mut self, notice: Notice) {
        self.phase = Phase::Idle;
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn record_tick(&mut self, backend_progress: Option<u8>) {
        let before = self.progress.percent();
        self.progress.tick(backend_progress);
        if self.progress.percent() != before {
            self.mark_dirty();
        }
    }

    pub(crate) fn mark_processing(&mut self) {
        if self.phase != Phase::Processing {
            self.phase = Phase::Processing;
            self.mark_dirty();
        }
    }

    pub(crate) fn complete(&mut self, artifact_url: String) {
        self.progress.complete();
        self.phase = Phase::Completed { artifact_url };
        self.polling = false;
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.phase = Phase::Failed { message };
        self.polling = false;
        self.mark_dirty();
    }

    /// Marks the view as gone; returns the job whose poller must stop, if any.
    pub(crate) fn close(&mut self) -> Option<JobId> {
        self.closed = true;
        if std::mem::take(&mut self.polling) {
            self.job_id.clone()
        } else {
            None
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
