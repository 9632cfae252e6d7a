//! Item-by-item moves.
//!
//! A folder is moved by creating it at the destination, moving its
//! children into it and deleting the emptied source. Files are moved by id.
//! Unlike a copy job this can give the item a new name.

use std::sync::Arc;

use futures::future::join_all;
use shift_core::{MoveRequest, RemoteItem, ShiftError, ShiftResult, Site};
use tracing::warn;

use crate::listing::fetch_node;
use crate::log::MoveLog;
use crate::platform::{BoxFuture, Platform};
use crate::retry::RetryPolicy;

/// What a direct move did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectMoveReport {
    File {
        source_path: String,
        destination_path: String,
    },
    /// A folder whose children all moved and whose source was deleted.
    Folder {
        source_path: String,
        /// Path of the folder created at the destination.
        destination_path: String,
        children: Vec<DirectMoveReport>,
    },
}

impl DirectMoveReport {
    pub fn destination_path(&self) -> &str {
        match self {
            Self::File {
                destination_path, ..
            }
            | Self::Folder {
                destination_path, ..
            } => destination_path,
        }
    }

    /// Number of files moved, including those in subfolders.
    pub fn file_count(&self) -> usize {
        match self {
            Self::File { .. } => 1,
            Self::Folder { children, .. } => children.iter().map(Self::file_count).sum(),
        }
    }
}

/// Moves items one platform call at a time.
pub struct DirectMover {
    platform: Arc<dyn Platform>,
    retry: RetryPolicy,
}

impl DirectMover {
    pub fn new(platform: Arc<dyn Platform>, retry: RetryPolicy) -> Self {
        Self { platform, retry }
    }

    /// Move the item named by `request` to its (possibly renamed) target.
    pub async fn move_request(
        &self,
        request: &MoveRequest,
        log: &MoveLog,
    ) -> ShiftResult<DirectMoveReport> {
        let item = RemoteItem {
            id: request.source_id.clone(),
            name: request.name.clone(),
            server_relative_path: request.source_path.clone(),
            is_file: request.is_file,
        };
        let destination_path = request.destination_path();

        if item.is_file {
            self.move_file(&request.source_site, &item, &destination_path, log)
                .await
        } else {
            self.move_folder(&request.source_site, &item, &destination_path, log)
                .await
        }
    }

    /// Move a folder and everything below it.
    ///
    /// Subfolders and files move concurrently. The source folder is deleted
    /// only once every child has moved; if any child fails the source is
    /// kept, already moved children stay where they are, and the result is
    /// `ShiftError::Incomplete`.
    pub fn move_folder<'a>(
        &'a self,
        site: &'a Site,
        folder: &'a RemoteItem,
        destination_path: &'a str,
        log: &'a MoveLog,
    ) -> BoxFuture<'a, ShiftResult<DirectMoveReport>> {
        Box::pin(async move {
            log.write(format!("Moving folder {}", folder.server_relative_path));
            let platform = &*self.platform;

            let created = self
                .retry
                .attempt("create folder", || platform.create_folder(site, destination_path))
                .await?;
            let node = fetch_node(platform, &self.retry, site, folder).await?;

            let mut moves: Vec<BoxFuture<'_, ShiftResult<DirectMoveReport>>> =
                Vec::with_capacity(node.child_count());
            for child in &node.folders {
                let target = format!("{}/{}", created.server_relative_path, child.name);
                moves.push(Box::pin(async move {
                    self.move_folder(site, child, &target, log).await
                }));
            }
            for child in &node.files {
                let target = format!("{}/{}", created.server_relative_path, child.name);
                moves.push(Box::pin(async move {
                    self.move_file(site, child, &target, log).await
                }));
            }

            let mut children = Vec::with_capacity(moves.len());
            let mut failures = Vec::new();
            for result in join_all(moves).await {
                match result {
                    Ok(report) => children.push(report),
                    Err(e) => failures.push(e),
                }
            }

            if let Some(last) = failures.pop() {
                let failed = failures.len() + 1;
                warn!(
                    folder = %folder.server_relative_path,
                    failed,
                    "keeping source folder"
                );
                return Err(ShiftError::Incomplete {
                    path: folder.server_relative_path.clone(),
                    failed,
                    source: Box::new(last),
                });
            }

            self.retry
                .attempt("delete folder", || platform.delete_folder(site, &folder.id))
                .await?;

            Ok(DirectMoveReport::Folder {
                source_path: folder.server_relative_path.clone(),
                destination_path: created.server_relative_path,
                children,
            })
        })
    }

    /// Move a single file, replacing whatever is at `destination_path`.
    pub async fn move_file(
        &self,
        site: &Site,
        file: &RemoteItem,
        destination_path: &str,
        log: &MoveLog,
    ) -> ShiftResult<DirectMoveReport> {
        log.write(format!("Moving file {}", file.server_relative_path));
        let platform = &*self.platform;
        self.retry
            .attempt("move file", || platform.move_file(site, &file.id, destination_path))
            .await?;

        Ok(DirectMoveReport::File {
            source_path: file.server_relative_path.clone(),
            destination_path: destination_path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_file_count() {
        let report = DirectMoveReport::Folder {
            source_path: "/a/Docs".into(),
            destination_path: "/a/Archive/Docs".into(),
            children: vec![
                DirectMoveReport::File {
                    source_path: "/a/Docs/x".into(),
                    destination_path: "/a/Archive/Docs/x".into(),
                },
                DirectMoveReport::Folder {
                    source_path: "/a/Docs/Sub".into(),
                    destination_path: "/a/Archive/Docs/Sub".into(),
                    children: vec![DirectMoveReport::File {
                        source_path: "/a/Docs/Sub/y".into(),
                        destination_path: "/a/Archive/Docs/Sub/y".into(),
                    }],
                },
            ],
        };
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.destination_path(), "/a/Archive/Docs");
    }
}
