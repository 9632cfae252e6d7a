//! Moving a selection of items.

use std::sync::Arc;

use futures::future::join_all;
use shift_core::{
    names_match, CopyJobProgress, FolderRef, MoveRequest, MoveStrategy, RemoteItem, ShiftConfig,
    ShiftError, ShiftResult,
};
use tracing::{error, info};

use crate::copy_job::CopyJobClient;
use crate::direct::{DirectMoveReport, DirectMover};
use crate::log::MoveLog;
use crate::merge::{MergeOutcome, MergePlanner};
use crate::platform::Platform;
use crate::poll::PollSettings;
use crate::registry::{JobRegistry, KeyValueStore};
use crate::retry::{RetryPolicy, RetryWindow};

/// How a selected item was moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveDetail {
    Direct(DirectMoveReport),
    Merged(Vec<MergeOutcome>),
    CopyJob(CopyJobProgress),
}

/// Result of moving one selected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub source_path: String,
    pub detail: MoveDetail,
}

/// Routes each selected item to the right mover.
pub struct Orchestrator {
    platform: Arc<dyn Platform>,
    retry: RetryPolicy,
    window: RetryWindow,
    strategy: MoveStrategy,
    direct: DirectMover,
    jobs: Arc<CopyJobClient>,
    merge: MergePlanner,
}

impl Orchestrator {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn KeyValueStore>,
        config: &ShiftConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(config);
        let registry = Arc::new(JobRegistry::new(store));
        let jobs = Arc::new(CopyJobClient::new(
            Arc::clone(&platform),
            registry,
            retry.clone(),
            PollSettings::from_config(config),
        ));

        Self {
            direct: DirectMover::new(Arc::clone(&platform), retry.clone()),
            merge: MergePlanner::new(Arc::clone(&platform), retry.clone(), Arc::clone(&jobs)),
            window: RetryWindow::from_config(config),
            strategy: config.strategy,
            platform,
            retry,
            jobs,
        }
    }

    pub fn jobs(&self) -> &CopyJobClient {
        &self.jobs
    }

    /// Move every item in `items` concurrently.
    ///
    /// Every item settles before this returns. Items that moved stay moved
    /// even if others fail; the error then reports how many failed and the
    /// last failure.
    pub async fn move_selection(
        &self,
        items: &[MoveRequest],
        log: &MoveLog,
    ) -> ShiftResult<Vec<MoveOutcome>> {
        log.write("Initialising item shift.");
        let total = items.len();

        let results = join_all(items.iter().map(|request| {
            let item_log = log.for_item(request.name.clone());
            async move {
                let result = self.move_item(request, &item_log).await;
                if let Err(e) = &result {
                    error!(item = %request.source_path, error = %e, "item failed to move");
                }
                result
            }
        }))
        .await;

        let mut outcomes = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => failures.push(e),
            }
        }

        if let Some(last) = failures.pop() {
            let failed = failures.len() + 1;
            log.fatal(last.to_string());
            return Err(ShiftError::SelectionFailed {
                failed,
                total,
                source: Box::new(last),
            });
        }

        info!(items = total, "selection moved");
        log.complete("Items moved successfully!");
        Ok(outcomes)
    }

    /// Move a single item.
    pub async fn move_item(
        &self,
        request: &MoveRequest,
        log: &MoveLog,
    ) -> ShiftResult<MoveOutcome> {
        request.validate()?;

        let detail = if self.use_direct(request, log) {
            MoveDetail::Direct(self.direct.move_request(request, log).await?)
        } else if let Some(existing) = self.existing_folder(request).await? {
            log.write(format!(
                "{} already exists at the destination, merging",
                request.name
            ));
            let source = RemoteItem::folder(
                request.source_id.as_str(),
                request.name.as_str(),
                request.source_path.as_str(),
            );
            let outcomes = self
                .window
                .run("merge", || {
                    self.merge.plan_and_merge(request, &source, &existing, log)
                })
                .await?;
            MoveDetail::Merged(outcomes)
        } else {
            let progress = self
                .window
                .run("copy job", || self.jobs.move_item(request, log))
                .await?;
            MoveDetail::CopyJob(progress)
        };

        Ok(MoveOutcome {
            source_path: request.source_path.clone(),
            detail,
        })
    }

    /// Copy jobs keep an item's name, and item-by-item moves stay on one site.
    fn use_direct(&self, request: &MoveRequest, log: &MoveLog) -> bool {
        if request.is_renamed() {
            return true;
        }
        if self.strategy != MoveStrategy::Direct {
            return false;
        }
        if request.source_site != request.destination.site {
            log.warn(format!(
                "{} is moving to another site and will use a copy job",
                request.name
            ));
            return false;
        }
        true
    }

    /// The destination folder that has the same name as the moved folder.
    async fn existing_folder(&self, request: &MoveRequest) -> ShiftResult<Option<RemoteItem>> {
        if request.is_file {
            return Ok(None);
        }

        let platform = &*self.platform;
        let site = &request.destination.site;
        let location = FolderRef::Path(request.destination.folder_path.clone());
        let folders = self
            .retry
            .attempt("list folders", || platform.list_folders(site, &location))
            .await?;

        Ok(folders
            .into_iter()
            .find(|folder| names_match(&folder.name, request.target_name())))
    }
}
