use std::time::Duration;

use crate::{FeatureKind, JobId, JobInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitJob {
        feature: FeatureKind,
        input: JobInput,
    },
    StartPolling {
        job_id: JobId,
        feature: FeatureKind,
        interval: Duration,
    },
    StopPolling { job_id: JobId },
}
