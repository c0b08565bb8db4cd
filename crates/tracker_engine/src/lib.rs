//! Tracker engine: job submission, polling and payload normalization.
mod adapter;
mod client;
mod engine;
mod persist;
mod poller;
mod session;
mod types;

pub use adapter::{normalize_progress, normalize_status, FieldMap, FieldMapAdapter, PayloadAdapter};
pub use client::{ClientSettings, Endpoint, JobClient, ReqwestJobClient};
pub use engine::EngineHandle;
pub use persist::{ensure_state_dir, write_atomically, PersistError};
pub use poller::{poll_until_terminal, Backoff, PollExit, PollSchedule};
pub use session::{Credential, EnvSession, SessionProvider, StaticSession};
pub use types::{AdapterError, EngineEvent, PollError, SetupError, SubmitError};
