//! Tracker core: pure job state machine, progress presenter and view model.
mod effect;
mod feature;
mod input;
mod job;
mod msg;
mod progress;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use feature::{FeatureConfig, FeatureKind, InputRule};
pub use input::{validate, JobInput, ValidationError};
pub use job::{JobId, JobSnapshot, JobStatus, PollFailure, SubmitFailure, SubmitOutcome};
pub use msg::Msg;
pub use progress::{stage_label, ProgressTracker, NON_TERMINAL_CAP, SYNTHETIC_CAP};
pub use state::{Notice, Phase, TrackerState, GENERIC_FAILURE, MISSING_ARTIFACT};
pub use update::update;
pub use view_model::JobViewModel;
