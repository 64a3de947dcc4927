use serde::{Deserialize, Serialize};

use crate::ResourceUri;

/// A file or archive a process needs on its local filesystem before it starts.
///
/// Before localization only `name`, `uri`, `archive` and `pattern` are meaningful;
/// localization fills in `last_modified` and `size_bytes` from the staged copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Logical name; the file appears under this name on the receiving side.
    name: String,
    /// Where the content lives.
    uri: ResourceUri,
    /// Modification time of the staged copy in milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<u64>,
    /// Size of the staged copy in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    /// Expand on arrival instead of copying verbatim.
    #[serde(default)]
    archive: bool,
    /// Optional inclusion pattern for selective archive expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
}

impl ResourceDescriptor {
    /// Declare a resource that has not been staged yet.
    pub fn declared(name: impl Into<String>, uri: ResourceUri) -> Self {
        Self {
            name: name.into(),
            uri,
            last_modified: None,
            size_bytes: None,
            archive: false,
            pattern: None,
        }
    }

    /// Describe a staged resource.
    pub fn staged(name: impl Into<String>, uri: ResourceUri, last_modified: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            uri,
            last_modified: Some(last_modified),
            size_bytes: Some(size),
            archive: false,
            pattern: None,
        }
    }

    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    pub fn last_modified(&self) -> Option<u64> {
        self.last_modified
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn is_archive(&self) -> bool {
        self.archive
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// `true` once size and timestamp are known.
    pub fn is_staged(&self) -> bool {
        self.last_modified.is_some() && self.size_bytes.is_some()
    }
}
