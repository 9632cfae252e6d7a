//! Folder listing with retries.

use shift_core::{FolderRef, FolderTreeNode, RemoteItem, ShiftResult, Site};

use crate::platform::Platform;
use crate::retry::RetryPolicy;

/// List the immediate children of `folder`.
///
/// Folders and files are listed concurrently, each call retried on its own.
/// Nothing is cached; every descent sees the platform's current state.
pub(crate) async fn fetch_node(
    platform: &dyn Platform,
    retry: &RetryPolicy,
    site: &Site,
    folder: &RemoteItem,
) -> ShiftResult<FolderTreeNode> {
    let location = folder.folder_ref();
    let (folders, files) = list_children(platform, retry, site, &location).await?;
    Ok(FolderTreeNode::new(folder, folders, files))
}

/// Subfolders and files of a folder addressed by id or path.
async fn list_children(
    platform: &dyn Platform,
    retry: &RetryPolicy,
    site: &Site,
    location: &FolderRef,
) -> ShiftResult<(Vec<RemoteItem>, Vec<RemoteItem>)> {
    let folders = retry.attempt("list folders", || platform.list_folders(site, location));
    let files = retry.attempt("list files", || platform.list_files(site, location));
    futures::future::try_join(folders, files).await
}
