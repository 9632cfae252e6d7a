//! Server-side copy jobs.

use std::sync::Arc;

use shift_core::{
    ConflictPolicy, CopyJobProgress, CopyJobRequest, JobLogRecord, MoveRequest, ShiftResult, Site,
};
use tracing::{debug, info};

use crate::log::MoveLog;
use crate::platform::Platform;
use crate::poll::{JobPoller, PollSettings};
use crate::registry::{JobRegistry, RegistryEntry};
use crate::retry::RetryPolicy;

/// Submits copy jobs and follows them to completion.
pub struct CopyJobClient {
    platform: Arc<dyn Platform>,
    registry: Arc<JobRegistry>,
    retry: RetryPolicy,
    poller: JobPoller,
}

impl CopyJobClient {
    pub fn new(
        platform: Arc<dyn Platform>,
        registry: Arc<JobRegistry>,
        retry: RetryPolicy,
        settings: PollSettings,
    ) -> Self {
        let poller = JobPoller::new(
            Arc::clone(&platform),
            Arc::clone(&registry),
            retry.clone(),
            settings,
        );
        Self {
            platform,
            registry,
            retry,
            poller,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Move `source_uris` into `destination_uri` with one job on `site`.
    ///
    /// A refused submission is returned as is and never retried. Otherwise
    /// the job is polled until it ends and the final poll payload returned.
    pub async fn submit_job(
        &self,
        site: &Site,
        source_uris: Vec<String>,
        destination_uri: &str,
        policy: ConflictPolicy,
        log: &MoveLog,
    ) -> ShiftResult<CopyJobProgress> {
        let request = CopyJobRequest::new(source_uris, destination_uri, policy);
        debug!(
            sources = ?request.export_object_uris,
            destination = destination_uri,
            "creating copy job"
        );

        let platform = &*self.platform;
        let handle = self
            .retry
            .attempt("create copy job", || platform.create_copy_job(site, &request))
            .await?;
        info!(job_id = %handle.job_id, "copy job created");
        log.write(format!("Copy job {} created", handle.job_id));

        let entry = RegistryEntry::new(site.clone(), handle, request);
        self.poller.poll(&entry, log).await
    }

    /// Move the item of `request` with a single job.
    pub async fn move_item(
        &self,
        request: &MoveRequest,
        log: &MoveLog,
    ) -> ShiftResult<CopyJobProgress> {
        self.submit_job(
            &request.source_site,
            vec![request.source_uri()],
            &request.destination.uri(),
            request.conflict_policy,
            log,
        )
        .await
    }

    /// Reattach to a persisted job and poll it until it ends.
    pub async fn resume(
        &self,
        entry: &RegistryEntry,
        log: &MoveLog,
    ) -> ShiftResult<CopyJobProgress> {
        info!(job_id = entry.job_id(), "resuming copy job");
        self.poller.poll(entry, log).await
    }

    /// Fetch a persisted job's pending log records once, leaving the
    /// registry untouched.
    pub async fn snapshot(&self, entry: &RegistryEntry) -> ShiftResult<Vec<JobLogRecord>> {
        let platform = &*self.platform;
        let progress = self
            .retry
            .attempt("copy job progress", || {
                platform.copy_job_progress(&entry.site, &entry.copy_job_info)
            })
            .await?;

        Ok(progress
            .logs
            .iter()
            .filter_map(|raw| JobLogRecord::parse(raw).ok())
            .collect())
    }
}
