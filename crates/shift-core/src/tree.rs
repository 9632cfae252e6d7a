//! One level of a remote folder tree.

use serde::{Deserialize, Serialize};

use crate::item::{names_match, ItemId, RemoteItem};

/// A folder together with its immediate children.
///
/// Built from a fresh listing on every descent and never cached, so it only
/// reflects the folder at the moment it was listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderTreeNode {
    pub id: ItemId,
    pub name: String,
    pub server_relative_path: String,
    /// Immediate subfolders.
    pub folders: Vec<RemoteItem>,
    /// Immediate files.
    pub files: Vec<RemoteItem>,
}

impl FolderTreeNode {
    /// Create a node for `folder` with the given children.
    pub fn new(folder: &RemoteItem, folders: Vec<RemoteItem>, files: Vec<RemoteItem>) -> Self {
        Self {
            id: folder.id.clone(),
            name: folder.name.clone(),
            server_relative_path: folder.server_relative_path.clone(),
            folders,
            files,
        }
    }

    /// Find a subfolder by name.
    pub fn folder_named(&self, name: &str) -> Option<&RemoteItem> {
        self.folders.iter().find(|f| names_match(&f.name, name))
    }

    /// Find a file by name.
    pub fn file_named(&self, name: &str) -> Option<&RemoteItem> {
        self.files.iter().find(|f| names_match(&f.name, name))
    }

    /// Total number of immediate children.
    pub fn child_count(&self) -> usize {
        self.folders.len() + self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> FolderTreeNode {
        let root = RemoteItem::folder("r", "Docs", "/sites/a/Docs");
        FolderTreeNode::new(
            &root,
            vec![RemoteItem::folder("1", "Plans", "/sites/a/Docs/Plans")],
            vec![RemoteItem::file("2", "plans.txt", "/sites/a/Docs/plans.txt")],
        )
    }

    #[test]
    fn test_lookup_by_kind() {
        let node = node();
        assert!(node.folder_named("plans").is_some());
        assert!(node.file_named("Plans").is_none());
        assert!(node.file_named("PLANS.TXT").is_some());
        assert_eq!(node.child_count(), 2);
    }
}
