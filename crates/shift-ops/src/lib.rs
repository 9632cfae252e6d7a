//! Move orchestration engine for shift.
//!
//! This crate relocates files and folders on a remote document platform,
//! either item by item or through server-side copy jobs, and reports
//! progress through a log channel the caller observes.

mod copy_job;
mod direct;
mod listing;
mod log;
mod merge;
mod orchestrator;
mod platform;
mod poll;
mod registry;
mod retry;

pub use copy_job::CopyJobClient;
pub use direct::{DirectMoveReport, DirectMover};
pub use log::{log_channel, LogEvent, LogRecord, MoveLog};
pub use merge::{plan_merge, MergeDecision, MergeOutcome, MergePlanner};
pub use orchestrator::{MoveDetail, MoveOutcome, Orchestrator};
pub use platform::{BoxFuture, CopyJobService, DirectoryService, ItemService, Platform};
pub use poll::{JobPhase, JobPoller, PollSettings};
pub use registry::{
    FileStore, JobRegistry, KeyValueStore, MemoryStore, RegistryEntry, RUNNING_JOBS_KEY,
};
pub use retry::{RetryPolicy, RetryWindow};
