use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Location of a resource, either on the submitter's machine or in shared storage.
///
/// Accepted forms:
/// - `scheme://authority/path` (e.g. `hdfs://nn:8020/apps/a.tgz`, `file:///tmp/cfg.yaml`)
/// - a bare absolute or relative path, treated as a local file
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceUri(String);

impl ResourceUri {
    /// Parse and validate a URI string.
    pub fn new(s: impl Into<String>) -> ModelResult<Self> {
        Self::try_from(s.into())
    }

    /// Build a URI from a scheme, an authority and an absolute path.
    pub fn from_parts(scheme: &str, authority: &str, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self(format!("{scheme}://{authority}{path}"))
    }

    /// Append a path segment, inserting a single `/` separator.
    pub fn join(&self, segment: &str) -> Self {
        let base = self.0.strip_suffix('/').unwrap_or(&self.0);
        let segment = segment.trim_start_matches('/');
        Self(format!("{base}/{segment}"))
    }

    /// Raw string form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI scheme, or `None` for bare paths.
    pub fn scheme(&self) -> Option<&str> {
        self.split().0
    }

    /// Authority component (`host:port`), empty when absent.
    pub fn authority(&self) -> &str {
        self.split().1
    }

    /// Path component.
    pub fn path(&self) -> &str {
        self.split().2
    }

    /// Last path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.path()
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    /// Extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.file_name()
            .and_then(|name| name.rsplit_once('.'))
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext)
    }

    fn split(&self) -> (Option<&str>, &str, &str) {
        let Some((scheme, rest)) = self.0.split_once("://") else {
            return (None, "", &self.0);
        };
        match rest.find('/') {
            Some(pos) => (Some(scheme), &rest[..pos], &rest[pos..]),
            None => (Some(scheme), rest, "/"),
        }
    }
}

fn valid_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl TryFrom<String> for ResourceUri {
    type Error = ModelError;
    fn try_from(s: String) -> ModelResult<Self> {
        if s.trim().is_empty() {
            return Err(ModelError::InvalidUri("empty uri".into()));
        }
        if let Some((scheme, _)) = s.split_once("://") {
            if !valid_scheme(scheme) {
                return Err(ModelError::InvalidUri(s));
            }
        }
        Ok(Self(s))
    }
}

impl FromStr for ResourceUri {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        Self::try_from(s.to_owned())
    }
}

impl From<ResourceUri> for String {
    fn from(u: ResourceUri) -> Self {
        u.0
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceUri;

    #[test]
    fn splits_scheme_authority_and_path() {
        let uri: ResourceUri = "hdfs://nn:8020/apps/wc/data.tar.gz".parse().unwrap();
        assert_eq!(uri.scheme(), Some("hdfs"));
        assert_eq!(uri.authority(), "nn:8020");
        assert_eq!(uri.path(), "/apps/wc/data.tar.gz");
        assert_eq!(uri.file_name(), Some("data.tar.gz"));
        assert_eq!(uri.extension(), Some("gz"));
    }

    #[test]
    fn file_uri_has_empty_authority() {
        let uri: ResourceUri = "file:///tmp/cfg.yaml".parse().unwrap();
        assert_eq!(uri.scheme(), Some("file"));
        assert_eq!(uri.authority(), "");
        assert_eq!(uri.path(), "/tmp/cfg.yaml");
    }

    #[test]
    fn bare_path_has_no_scheme() {
        let uri: ResourceUri = "/etc/app/.hidden".parse().unwrap();
        assert_eq!(uri.scheme(), None);
        assert_eq!(uri.file_name(), Some(".hidden"));
        assert_eq!(uri.extension(), None);
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(ResourceUri::new("").is_err());
        assert!(ResourceUri::new("  ").is_err());
        assert!(ResourceUri::new("1bad://x/y").is_err());
    }

    #[test]
    fn from_parts_adds_leading_slash() {
        let uri = ResourceUri::from_parts("mem", "", "app/r1/spec.json");
        assert_eq!(uri.as_str(), "mem:///app/r1/spec.json");
        assert_eq!(uri.path(), "/app/r1/spec.json");
    }

    #[test]
    fn join_normalizes_separators() {
        let root = ResourceUri::from_parts("mem", "", "/");
        assert_eq!(root.join("app").as_str(), "mem:///app");
        assert_eq!(root.join("app").join("/r1/").as_str(), "mem:///app/r1/");
    }

    #[test]
    fn serde_is_a_plain_string() {
        let uri: ResourceUri = "file:///a/b".parse().unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, r#""file:///a/b""#);
        assert!(serde_json::from_str::<ResourceUri>(r#""""#).is_err());
    }
}
