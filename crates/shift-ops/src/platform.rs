//! Services the engine consumes from the document platform.
//!
//! The [`Platform`] trait bundles the three services so the engine can hold
//! a single `Arc<dyn Platform>`. Every call is one request/response and may
//! be retried on its own.

use std::future::Future;
use std::pin::Pin;

use shift_core::{
    CopyJobHandle, CopyJobProgress, CopyJobRequest, FolderRef, ItemId, RemoteItem, ShiftResult,
    Site,
};

/// Type alias for boxed futures returned by async service methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lists folder contents.
pub trait DirectoryService: Send + Sync {
    /// Immediate subfolders of `folder`.
    fn list_folders<'a>(
        &'a self,
        site: &'a Site,
        folder: &'a FolderRef,
    ) -> BoxFuture<'a, ShiftResult<Vec<RemoteItem>>>;

    /// Immediate files of `folder`.
    fn list_files<'a>(
        &'a self,
        site: &'a Site,
        folder: &'a FolderRef,
    ) -> BoxFuture<'a, ShiftResult<Vec<RemoteItem>>>;
}

/// Creates, moves and deletes single items.
pub trait ItemService: Send + Sync {
    /// Create a folder at a server-relative path and return it.
    fn create_folder<'a>(
        &'a self,
        site: &'a Site,
        path: &'a str,
    ) -> BoxFuture<'a, ShiftResult<RemoteItem>>;

    /// Move a file to a server-relative path, overwriting what is there.
    fn move_file<'a>(
        &'a self,
        site: &'a Site,
        id: &'a ItemId,
        destination_path: &'a str,
    ) -> BoxFuture<'a, ShiftResult<()>>;

    /// Delete a folder.
    fn delete_folder<'a>(
        &'a self,
        site: &'a Site,
        id: &'a ItemId,
    ) -> BoxFuture<'a, ShiftResult<()>>;
}

/// Server-side copy/move jobs.
pub trait CopyJobService: Send + Sync {
    /// Submit a job. An application-level refusal is `ShiftError::JobRejected`.
    fn create_copy_job<'a>(
        &'a self,
        site: &'a Site,
        request: &'a CopyJobRequest,
    ) -> BoxFuture<'a, ShiftResult<CopyJobHandle>>;

    /// Fetch the job's state and any log records written since the last call.
    fn copy_job_progress<'a>(
        &'a self,
        site: &'a Site,
        handle: &'a CopyJobHandle,
    ) -> BoxFuture<'a, ShiftResult<CopyJobProgress>>;
}

/// Everything the engine needs from the platform.
pub trait Platform: DirectoryService + ItemService + CopyJobService {}

impl<T> Platform for T where T: DirectoryService + ItemService + CopyJobService {}
