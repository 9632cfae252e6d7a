//! Core types and traits for shift.
//!
//! This crate provides the data model shared by the move engine and the
//! platform client: items and folder listings, move requests, copy job wire
//! types, the error taxonomy and configuration.

mod config;
mod error;
mod item;
mod job;
mod request;
mod site;
mod tree;

pub use config::{MoveStrategy, ShiftConfig, ShiftConfigBuilder};
pub use error::{FailureClass, ShiftError, ShiftResult};
pub use item::{names_match, FolderRef, ItemId, RemoteItem};
pub use job::{
    CopyJobHandle, CopyJobOptions, CopyJobProgress, CopyJobRequest, JobEventKind, JobLogRecord,
    JobState, MigrationDirection,
};
pub use request::{validate_name, ConflictPolicy, Destination, MoveRequest};
pub use site::Site;
pub use tree::FolderTreeNode;
