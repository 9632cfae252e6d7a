//! Copy job wire types.
//!
//! Field names follow the platform's `CreateCopyJobs` and
//! `GetCopyJobProgress` endpoints exactly.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use strum::EnumString;

use crate::request::ConflictPolicy;

/// Handle returned when a copy job is created.
///
/// Carries the key needed to read the job's log; `Debug` does not print it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CopyJobHandle {
    pub job_id: String,
    pub encryption_key: String,
    pub job_queue_uri: String,
}

impl std::fmt::Debug for CopyJobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyJobHandle")
            .field("job_id", &self.job_id)
            .field("encryption_key", &"<redacted>")
            .field("job_queue_uri", &self.job_queue_uri)
            .finish()
    }
}

/// Options block of a copy job request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CopyJobOptions {
    pub ignore_version_history: bool,
    pub is_move_mode: bool,
    pub allow_schema_mismatch: bool,
    pub name_conflict_behavior: u8,
}

impl CopyJobOptions {
    /// Options for a move that drops version history.
    pub fn move_with(policy: ConflictPolicy) -> Self {
        Self {
            ignore_version_history: true,
            is_move_mode: true,
            allow_schema_mismatch: true,
            name_conflict_behavior: policy.name_conflict_behavior(),
        }
    }
}

/// Body of a `CreateCopyJobs` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyJobRequest {
    pub export_object_uris: Vec<String>,
    pub destination_uri: String,
    pub options: CopyJobOptions,
}

impl CopyJobRequest {
    pub fn new(
        export_object_uris: Vec<String>,
        destination_uri: impl Into<String>,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            export_object_uris,
            destination_uri: destination_uri.into(),
            options: CopyJobOptions::move_with(policy),
        }
    }
}

/// Server-side job state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    None,
    Queued,
    Processing,
    Other(i64),
}

impl From<i64> for JobState {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::None,
            2 => Self::Queued,
            4 => Self::Processing,
            other => Self::Other(other),
        }
    }
}

/// Response of a `GetCopyJobProgress` call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CopyJobProgress {
    #[serde(default)]
    pub job_state: i64,
    /// JSON-encoded log records, oldest first.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl CopyJobProgress {
    pub fn state(&self) -> JobState {
        JobState::from(self.job_state)
    }
}

/// Event tag of a job log record.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum JobEventKind {
    JobQueued,
    JobLogFileCreate,
    JobStart,
    JobProgress,
    JobError,
    JobWarning,
    JobFatalError,
    JobFinishedObjectInfo,
    JobEnd,
    #[strum(default)]
    Other(String),
}

/// Phase named by `MigrationDirection` in start/end records.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum MigrationDirection {
    Export,
    Import,
    Cleanup,
    MoveCleanup,
    #[strum(default)]
    Other(String),
}

impl MigrationDirection {
    /// Whether a `JobEnd` in this direction ends the whole job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cleanup | Self::MoveCleanup)
    }
}

/// One decoded entry of a job's log.
///
/// Numeric counters arrive either as numbers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobLogRecord {
    pub event: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub migration_direction: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub objects_processed: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bytes_processed: Option<u64>,
    #[serde(
        default,
        rename = "TotalExpectedSPObjects",
        deserialize_with = "lenient_u64"
    )]
    pub total_expected_sp_objects: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_duration_in_ms: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_errors: Option<u64>,
    #[serde(default)]
    pub source_object_full_url: Option<String>,
    #[serde(default)]
    pub target_object_full_url: Option<String>,
}

impl JobLogRecord {
    /// Decode one entry of `CopyJobProgress::logs`.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn kind(&self) -> JobEventKind {
        JobEventKind::from_str(&self.event).unwrap_or(JobEventKind::Other(self.event.clone()))
    }

    pub fn direction(&self) -> Option<MigrationDirection> {
        self.migration_direction
            .as_deref()
            .map(|d| MigrationDirection::from_str(d).unwrap_or(MigrationDirection::Other(d.into())))
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Counter {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Counter>::deserialize(deserializer)? {
        Some(Counter::Number(n)) => Some(n),
        Some(Counter::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
