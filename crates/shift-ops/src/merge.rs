//! Merging a folder into an existing folder of the same name.
//!
//! Copy jobs refuse to move a folder onto an existing one, so the two trees
//! are walked together. Matching subfolders are merged recursively, files
//! that already exist are left at the source, and everything else is handed
//! to a copy job.

use std::sync::Arc;

use futures::future::join_all;
use shift_core::{
    CopyJobProgress, FolderTreeNode, MoveRequest, RemoteItem, ShiftError, ShiftResult,
};
use tracing::{debug, warn};

use crate::copy_job::CopyJobClient;
use crate::listing::fetch_node;
use crate::log::MoveLog;
use crate::platform::{BoxFuture, Platform};
use crate::retry::RetryPolicy;

/// What to do with one child of the source folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDecision {
    /// Both sides have this folder; merge them.
    Recurse {
        source: RemoteItem,
        destination: RemoteItem,
    },
    /// Nothing of this name at the destination; move it with a copy job.
    Delegate { source: RemoteItem },
    /// The destination already has this file; leave the source alone.
    Skip {
        source: RemoteItem,
        existing: RemoteItem,
    },
}

/// Partition the children of `source` against those of `destination`.
///
/// Names are compared case-insensitively. Subfolders are matched only
/// against subfolders and files only against files.
pub fn plan_merge(source: &FolderTreeNode, destination: &FolderTreeNode) -> Vec<MergeDecision> {
    let folders = source.folders.iter().map(|folder| {
        match destination.folder_named(&folder.name) {
            Some(existing) => MergeDecision::Recurse {
                source: folder.clone(),
                destination: existing.clone(),
            },
            None => MergeDecision::Delegate {
                source: folder.clone(),
            },
        }
    });

    let files = source.files.iter().map(|file| match destination.file_named(&file.name) {
        Some(existing) => MergeDecision::Skip {
            source: file.clone(),
            existing: existing.clone(),
        },
        None => MergeDecision::Delegate {
            source: file.clone(),
        },
    });

    folders.chain(files).collect()
}

/// How one child of a merged folder ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged {
        source_path: String,
        destination_path: String,
        children: Vec<MergeOutcome>,
    },
    Delegated {
        source_path: String,
        progress: CopyJobProgress,
    },
    Skipped {
        source_path: String,
    },
}

/// Executes merge plans.
pub struct MergePlanner {
    platform: Arc<dyn Platform>,
    retry: RetryPolicy,
    jobs: Arc<CopyJobClient>,
}

impl MergePlanner {
    pub fn new(platform: Arc<dyn Platform>, retry: RetryPolicy, jobs: Arc<CopyJobClient>) -> Self {
        Self {
            platform,
            retry,
            jobs,
        }
    }

    /// Merge `source` into `destination`, two folders with the same name.
    ///
    /// Sites and the conflict policy come from `request`. All decisions run
    /// concurrently and all settle before this returns; if any failed the
    /// result is `ShiftError::Incomplete`.
    pub fn plan_and_merge<'a>(
        &'a self,
        request: &'a MoveRequest,
        source: &'a RemoteItem,
        destination: &'a RemoteItem,
        log: &'a MoveLog,
    ) -> BoxFuture<'a, ShiftResult<Vec<MergeOutcome>>> {
        Box::pin(async move {
            let platform = &*self.platform;
            let (source_node, destination_node) = futures::future::try_join(
                fetch_node(platform, &self.retry, &request.source_site, source),
                fetch_node(platform, &self.retry, &request.destination.site, destination),
            )
            .await?;

            let decisions = plan_merge(&source_node, &destination_node);
            debug!(
                source = %source.server_relative_path,
                destination = %destination.server_relative_path,
                decisions = decisions.len(),
                "merging folders"
            );

            let destination_uri = request
                .destination
                .site
                .absolute_uri(&destination.server_relative_path);
            let results = join_all(
                decisions
                    .iter()
                    .map(|decision| self.execute(request, decision, &destination_uri, log)),
            )
            .await;

            let mut outcomes = Vec::with_capacity(results.len());
            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => failures.push(e),
                }
            }

            if let Some(last) = failures.pop() {
                let failed = failures.len() + 1;
                warn!(folder = %source.server_relative_path, failed, "merge incomplete");
                return Err(ShiftError::Incomplete {
                    path: source.server_relative_path.clone(),
                    failed,
                    source: Box::new(last),
                });
            }

            Ok(outcomes)
        })
    }

    async fn execute(
        &self,
        request: &MoveRequest,
        decision: &MergeDecision,
        destination_uri: &str,
        log: &MoveLog,
    ) -> ShiftResult<MergeOutcome> {
        match decision {
            MergeDecision::Recurse {
                source,
                destination,
            } => {
                let children = self
                    .plan_and_merge(request, source, destination, log)
                    .await?;
                Ok(MergeOutcome::Merged {
                    source_path: source.server_relative_path.clone(),
                    destination_path: destination.server_relative_path.clone(),
                    children,
                })
            }
            MergeDecision::Delegate { source } => {
                let source_uri = request
                    .source_site
                    .absolute_uri(&source.server_relative_path);
                let progress = self
                    .jobs
                    .submit_job(
                        &request.source_site,
                        vec![source_uri],
                        destination_uri,
                        request.conflict_policy,
                        log,
                    )
                    .await?;
                Ok(MergeOutcome::Delegated {
                    source_path: source.server_relative_path.clone(),
                    progress,
                })
            }
            MergeDecision::Skip { source, existing } => {
                log.warn(format!(
                    "{} already exists at {}; left in place",
                    source.name, existing.server_relative_path
                ));
                Ok(MergeOutcome::Skipped {
                    source_path: source.server_relative_path.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str, folders: &[&str], files: &[&str]) -> FolderTreeNode {
        let name = path.rsplit('/').next().unwrap();
        let child = |n: &&str| format!("{path}/{n}");
        FolderTreeNode::new(
            &RemoteItem::folder(path, name, path),
            folders
                .iter()
                .map(|n| RemoteItem::folder(child(n), *n, child(n)))
                .collect(),
            files
                .iter()
                .map(|n| RemoteItem::file(child(n), *n, child(n)))
                .collect(),
        )
    }

    #[test]
    fn test_plan_partitions_children() {
        let source = node("/s/Docs/Plans", &["A", "B"], &["x.txt", "y.txt"]);
        let destination = node("/s/Archive/Plans", &["A", "C"], &["x.txt", "z.txt"]);

        let decisions = plan_merge(&source, &destination);
        assert_eq!(decisions.len(), 4);

        assert!(matches!(
            &decisions[0],
            MergeDecision::Recurse { source, destination }
                if source.name == "A" && destination.server_relative_path == "/s/Archive/Plans/A"
        ));
        assert!(matches!(&decisions[1], MergeDecision::Delegate { source } if source.name == "B"));
        assert!(matches!(
            &decisions[2],
            MergeDecision::Skip { source, .. } if source.name == "x.txt"
        ));
        assert!(matches!(
            &decisions[3],
            MergeDecision::Delegate { source } if source.name == "y.txt"
        ));
    }

    #[test]
    fn test_plan_does_not_cross_kinds() {
        // A destination file named like a source folder does not match it.
        let source = node("/s/Docs/Plans", &["notes"], &["Report"]);
        let destination = node("/s/Archive/Plans", &["report"], &["Notes"]);

        let decisions = plan_merge(&source, &destination);
        assert!(decisions
            .iter()
            .all(|d| matches!(d, MergeDecision::Delegate { .. })));
    }

    #[test]
    fn test_plan_ignores_case() {
        let source = node("/s/Docs/Plans", &["Budget"], &["Q1.XLSX"]);
        let destination = node("/s/Archive/Plans", &["budget"], &["q1.xlsx"]);

        let decisions = plan_merge(&source, &destination);
        assert!(matches!(&decisions[0], MergeDecision::Recurse { .. }));
        assert!(matches!(&decisions[1], MergeDecision::Skip { .. }));
    }

    #[test]
    fn test_plan_is_repeatable() {
        let source = node("/s/Docs/Plans", &["A"], &["x.txt"]);
        let destination = node("/s/Archive/Plans", &[], &[]);
        assert_eq!(
            plan_merge(&source, &destination),
            plan_merge(&source, &destination)
        );
    }
}
