//! Move request types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ShiftError, ShiftResult};
use crate::item::ItemId;
use crate::site::Site;

/// What the destination does when an object with the same name exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail the object.
    #[default]
    Fail,
    /// Replace the existing object.
    Replace,
    /// Keep both, renaming the incoming object.
    Rename,
}

impl ConflictPolicy {
    /// Value of `NameConflictBehavior` in copy job options.
    pub fn name_conflict_behavior(&self) -> u8 {
        match self {
            Self::Fail => 0,
            Self::Replace => 1,
            Self::Rename => 2,
        }
    }
}

/// A destination container: a folder (or library root) on some site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub site: Site,
    /// Server-relative path of the destination folder.
    pub folder_path: String,
}

impl Destination {
    pub fn new(site: Site, folder_path: impl Into<String>) -> Self {
        let folder_path: String = folder_path.into();
        Self {
            site,
            folder_path: folder_path.trim_end_matches('/').to_string(),
        }
    }

    /// Server-relative path of `name` inside this destination.
    pub fn child_path(&self, name: &str) -> String {
        format!("{}/{}", self.folder_path, name)
    }

    /// Absolute URI of the destination folder.
    pub fn uri(&self) -> String {
        self.site.absolute_uri(&self.folder_path)
    }
}

/// One selected item to relocate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Unique id of the source object.
    pub source_id: ItemId,
    pub is_file: bool,
    /// Site holding the source object.
    pub source_site: Site,
    /// Server-relative path of the source object.
    pub source_path: String,
    /// Current leaf name of the source object.
    pub name: String,
    pub destination: Destination,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// New name to give the object at the destination.
    #[serde(default)]
    pub rename: Option<String>,
}

impl MoveRequest {
    /// Create a request, deriving the name from the last path segment.
    pub fn new(
        source_id: impl Into<String>,
        is_file: bool,
        source_site: Site,
        source_path: impl Into<String>,
        destination: Destination,
    ) -> Self {
        let source_path: String = source_path.into();
        let name = source_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            source_id: ItemId::new(source_id),
            is_file,
            source_site,
            source_path,
            name,
            destination,
            conflict_policy: ConflictPolicy::default(),
            rename: None,
        }
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_rename(mut self, new_name: impl Into<String>) -> Self {
        self.rename = Some(new_name.into());
        self
    }

    /// Name the object will have at the destination.
    pub fn target_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    /// Whether the object changes name on the way.
    pub fn is_renamed(&self) -> bool {
        self.rename.as_deref().is_some_and(|n| n != self.name)
    }

    /// Server-relative path the object will have at the destination.
    pub fn destination_path(&self) -> String {
        self.destination.child_path(self.target_name())
    }

    /// Absolute URI of the source object.
    pub fn source_uri(&self) -> String {
        self.source_site.absolute_uri(&self.source_path)
    }

    /// Check the request before any call is made.
    pub fn validate(&self) -> ShiftResult<()> {
        validate_name(self.target_name())?;
        if self.is_renamed() && self.source_site != self.destination.site {
            return Err(ShiftError::invalid_request(format!(
                "cannot rename '{}' while moving it to another site",
                self.name
            )));
        }
        let prefix = format!("{}/", self.source_path.trim_end_matches('/'));
        if !self.is_file
            && self.source_site == self.destination.site
            && format!("{}/", self.destination.folder_path).starts_with(&prefix)
        {
            return Err(ShiftError::invalid_request(format!(
                "cannot move '{}' into itself",
                self.source_path
            )));
        }
        Ok(())
    }
}

/// Validate a file or folder name for the platform.
pub fn validate_name(name: &str) -> ShiftResult<()> {
    let invalid = |reason: &str| ShiftError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name cannot be blank"));
    }

    if name.chars().count() >= 255 {
        return Err(invalid("the specified name is too long"));
    }

    for c in ['"', '*', ':', '<', '>', '?', '/', '\\', '|'] {
        if name.contains(c) {
            return Err(invalid(&format!("name cannot contain '{c}'")));
        }
    }

    if name.ends_with('.') {
        return Err(invalid("name cannot end with a dot"));
    }

    Ok(())
}
