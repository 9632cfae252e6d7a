//! Copy job polling state machine.
//!
//! A job starts out queued and is polled every few seconds. Once the
//! platform reports `JobStart` the cadence tightens. Polling ends when the
//! log carries a terminal `JobEnd` or a `JobFatalError`, or when the
//! platform stops knowing the job without having reported either.

use std::sync::Arc;
use std::time::Duration;

use shift_core::{
    CopyJobProgress, JobEventKind, JobLogRecord, JobState, ShiftConfig, ShiftError, ShiftResult,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::log::MoveLog;
use crate::platform::Platform;
use crate::registry::{JobRegistry, RegistryEntry};
use crate::retry::RetryPolicy;

/// Where a polled job currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    Running,
}

/// Poll cadence and bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub queued_interval: Duration,
    pub running_interval: Duration,
    /// Give up after this long. `None` polls until the job ends.
    pub max_duration: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&ShiftConfig::default())
    }
}

impl PollSettings {
    pub fn from_config(config: &ShiftConfig) -> Self {
        Self {
            queued_interval: config.queued_poll_interval(),
            running_interval: config.running_poll_interval(),
            max_duration: config.max_poll_duration(),
        }
    }

    pub fn interval(&self, phase: JobPhase) -> Duration {
        match phase {
            JobPhase::Queued => self.queued_interval,
            JobPhase::Running => self.running_interval,
        }
    }
}

/// What one batch of log records means for the loop.
enum Step {
    Continue,
    Finished,
}

/// Polls a copy job until it ends.
pub struct JobPoller {
    platform: Arc<dyn Platform>,
    registry: Arc<JobRegistry>,
    retry: RetryPolicy,
    settings: PollSettings,
}

impl JobPoller {
    pub fn new(
        platform: Arc<dyn Platform>,
        registry: Arc<JobRegistry>,
        retry: RetryPolicy,
        settings: PollSettings,
    ) -> Self {
        Self {
            platform,
            registry,
            retry,
            settings,
        }
    }

    /// Poll the job in `entry` to completion.
    ///
    /// Returns the payload of the poll that carried the terminal `JobEnd`.
    /// A `JobFatalError` fails with its message. A poll with no job state
    /// and no log records means the job is gone. Every ending except a
    /// timeout removes the registry entry.
    pub async fn poll(
        &self,
        entry: &RegistryEntry,
        log: &MoveLog,
    ) -> ShiftResult<CopyJobProgress> {
        let started = Instant::now();
        let mut phase = JobPhase::Queued;
        let platform = &*self.platform;
        let handle = &entry.copy_job_info;

        loop {
            sleep(self.settings.interval(phase)).await;

            if let Some(limit) = self.settings.max_duration {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    warn!(job_id = %handle.job_id, ?elapsed, "giving up on copy job");
                    return Err(ShiftError::PollTimeout {
                        job_id: handle.job_id.clone(),
                        elapsed,
                    });
                }
            }

            let progress = self
                .retry
                .attempt("copy job progress", || platform.copy_job_progress(&entry.site, handle))
                .await?;
            debug!(
                job_id = %handle.job_id,
                state = progress.job_state,
                records = progress.logs.len(),
                "polled copy job"
            );

            if progress.state() == JobState::None && progress.logs.is_empty() {
                warn!(job_id = %handle.job_id, "copy job no longer known to the platform");
                self.unregister(entry).await;
                let err = ShiftError::JobLost {
                    job_id: handle.job_id.clone(),
                };
                log.warn(err.to_string());
                return Err(err);
            }

            match self.dispatch(entry, &progress, &mut phase, log).await? {
                Step::Finished => {
                    info!(job_id = %handle.job_id, "copy job finished");
                    return Ok(progress);
                }
                Step::Continue => {}
            }
        }
    }

    async fn dispatch(
        &self,
        entry: &RegistryEntry,
        progress: &CopyJobProgress,
        phase: &mut JobPhase,
        log: &MoveLog,
    ) -> ShiftResult<Step> {
        for raw in &progress.logs {
            let record = match JobLogRecord::parse(raw) {
                Ok(record) => record,
                Err(e) => {
                    debug!(error = %e, "skipping undecodable job log record");
                    continue;
                }
            };

            match record.kind() {
                JobEventKind::JobFatalError => {
                    let message = record
                        .message
                        .clone()
                        .unwrap_or_else(|| "Copy job failed".to_string());
                    self.unregister(entry).await;
                    log.fatal(message.clone());
                    return Err(ShiftError::JobFatal { message });
                }
                JobEventKind::JobError | JobEventKind::JobWarning => {
                    log.warn(describe(&record));
                }
                JobEventKind::JobQueued => {
                    log.write("Job queued");
                    info!(job_id = entry.job_id(), "copy job queued");
                    if let Err(e) = self.registry.insert(entry.clone()).await {
                        warn!(job_id = entry.job_id(), error = %e, "failed to record job");
                    }
                }
                JobEventKind::JobLogFileCreate => {
                    log.write("Job log file created");
                }
                JobEventKind::JobProgress => {
                    log.progress(
                        record.objects_processed.unwrap_or(0),
                        record.total_expected_sp_objects.unwrap_or(0),
                    );
                }
                JobEventKind::JobStart => {
                    let direction = record.migration_direction.as_deref().unwrap_or("Unknown");
                    log.write(format!("Job started: {direction}"));
                    *phase = JobPhase::Running;
                }
                JobEventKind::JobFinishedObjectInfo => {
                    self.unregister(entry).await;
                }
                JobEventKind::JobEnd => {
                    if record.direction().is_some_and(|d| d.is_terminal()) {
                        self.unregister(entry).await;
                        log.write("Job complete");
                        return Ok(Step::Finished);
                    }
                    log.write(summary(&record));
                }
                JobEventKind::Other(event) => {
                    debug!(event = %event, "ignoring copy job event");
                }
            }
        }

        Ok(Step::Continue)
    }

    async fn unregister(&self, entry: &RegistryEntry) {
        if let Err(e) = self.registry.remove(entry.job_id()).await {
            warn!(job_id = entry.job_id(), error = %e, "failed to unregister job");
        }
    }
}

fn describe(record: &JobLogRecord) -> String {
    let message = record.message.as_deref().unwrap_or(&record.event);
    let url = record
        .source_object_full_url
        .as_deref()
        .or(record.target_object_full_url.as_deref());
    match url {
        Some(url) => format!("{message} ({url})"),
        None => message.to_string(),
    }
}

/// One-line summary of a non-terminal `JobEnd`.
fn summary(record: &JobLogRecord) -> String {
    let direction = record.migration_direction.as_deref().unwrap_or("Job");
    let objects = record.objects_processed.unwrap_or(0);
    let bytes = humansize::format_size(record.bytes_processed.unwrap_or(0), humansize::BINARY);
    let duration = Duration::from_millis(record.total_duration_in_ms.unwrap_or(0));
    let mut line = format!(
        "{direction} finished: {objects} objects, {bytes} in {:.1}s",
        duration.as_secs_f64()
    );
    match record.total_errors {
        Some(0) | None => {}
        Some(1) => line.push_str(", 1 error"),
        Some(n) => line.push_str(&format!(", {n} errors")),
    }
    line
}
