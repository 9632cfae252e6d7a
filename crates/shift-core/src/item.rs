//! Remote file and folder references.

use serde::{Deserialize, Serialize};

/// Stable platform identifier of a file or folder (its unique id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new ItemId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a folder is addressed when listing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    /// By unique id.
    Id(ItemId),
    /// By server-relative path.
    Path(String),
}

impl std::fmt::Display for FolderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "folder {id}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Unique id.
    pub id: ItemId,
    /// Leaf name.
    pub name: String,
    /// Path relative to the host root, e.g. `/sites/a/Shared Documents/x`.
    pub server_relative_path: String,
    /// Whether this is a file (otherwise a folder).
    pub is_file: bool,
}

impl RemoteItem {
    /// Create a folder entry.
    pub fn folder(
        id: impl Into<String>,
        name: impl Into<String>,
        server_relative_path: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::new(id),
            name: name.into(),
            server_relative_path: server_relative_path.into(),
            is_file: false,
        }
    }

    /// Create a file entry.
    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        server_relative_path: impl Into<String>,
    ) -> Self {
        Self {
            is_file: true,
            ..Self::folder(id, name, server_relative_path)
        }
    }

    pub fn folder_ref(&self) -> FolderRef {
        FolderRef::Id(self.id.clone())
    }
}

/// Compare two item names the way the platform does (case-insensitively).
pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_ignores_case() {
        assert!(names_match("Reports", "reports"));
        assert!(names_match("ÄRGER.docx", "ärger.docx"));
        assert!(!names_match("Reports", "Report"));
    }

    #[test]
    fn test_file_constructor() {
        let item = RemoteItem::file("1", "a.txt", "/sites/x/Docs/a.txt");
        assert!(item.is_file);
        assert_eq!(item.id.as_str(), "1");
    }
}
