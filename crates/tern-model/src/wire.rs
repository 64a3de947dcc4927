//! Versioned documents exchanged with the master process.
//!
//! Every serialized artifact is wrapped in an envelope:
//!
//! ```json
//! { "version": "1.0", "kind": "spec", "body": { ... } }
//! ```
//!
//! Readers accept any minor version of the major they were built for and
//! reject everything else before touching the body.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{ModelError, ModelResult};

/// `major.minor` version of the document format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WireVersion {
    pub major: u32,
    pub minor: u32,
}

/// Version written by this build.
pub const CURRENT_VERSION: WireVersion = WireVersion { major: 1, minor: 0 };

impl WireVersion {
    /// Documents are compatible when their major matches.
    pub fn is_compatible_with(&self, other: &WireVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for WireVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for WireVersion {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| ModelError::InvalidVersion(s.to_string()))?;
        let parse = |p: &str| {
            p.parse::<u32>()
                .map_err(|_| ModelError::InvalidVersion(s.to_string()))
        };
        Ok(Self {
            major: parse(major)?,
            minor: parse(minor)?,
        })
    }
}

impl TryFrom<String> for WireVersion {
    type Error = ModelError;
    fn try_from(s: String) -> ModelResult<Self> {
        s.parse()
    }
}

impl From<WireVersion> for String {
    fn from(v: WireVersion) -> Self {
        v.to_string()
    }
}

/// Kind of a serialized document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Spec,
    LocalizeManifest,
    Arguments,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Spec => "spec",
            DocumentKind::LocalizeManifest => "localize-manifest",
            DocumentKind::Arguments => "arguments",
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    version: WireVersion,
    kind: DocumentKind,
    body: &'a T,
}

#[derive(Deserialize)]
struct Header {
    version: String,
    kind: String,
    body: serde_json::Value,
}

/// Serialize `body` as a `kind` document in the current version.
///
/// Output is pretty-printed JSON with stable key order, so equal inputs give equal bytes.
pub fn encode<T: Serialize>(kind: DocumentKind, body: &T) -> ModelResult<Vec<u8>> {
    let envelope = Envelope {
        version: CURRENT_VERSION,
        kind,
        body,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Parse a `kind` document, rejecting unknown majors before decoding the body.
pub fn decode<T: DeserializeOwned>(kind: DocumentKind, bytes: &[u8]) -> ModelResult<T> {
    let header: Header = serde_json::from_slice(bytes)?;

    let version: WireVersion = header.version.parse()?;
    if !version.is_compatible_with(&CURRENT_VERSION) {
        return Err(ModelError::IncompatibleVersion {
            found: version.to_string(),
            supported: CURRENT_VERSION.major,
        });
    }
    if header.kind != kind.as_str() {
        return Err(ModelError::UnexpectedDocument {
            expected: kind.as_str().to_string(),
            found: header.kind,
        });
    }
    Ok(serde_json::from_value(header.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arguments;

    #[test]
    fn version_parses_and_displays() {
        let v: WireVersion = "1.7".parse().unwrap();
        assert_eq!(v, WireVersion { major: 1, minor: 7 });
        assert_eq!(v.to_string(), "1.7");

        for bad in ["", "1", "1.x", "a.b", "1.2.3"] {
            assert!(bad.parse::<WireVersion>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn newer_minor_is_accepted() {
        let doc = br#"{"version":"1.9","kind":"arguments","body":{"application":["x"]}}"#;
        let args: Arguments = decode(DocumentKind::Arguments, doc).unwrap();
        assert_eq!(args.application, vec!["x"]);
    }

    #[test]
    fn unknown_major_is_rejected_before_body() {
        // Body would not parse as Arguments; the version check must fire first.
        let doc = br#"{"version":"2.0","kind":"arguments","body":42}"#;
        let err = decode::<Arguments>(DocumentKind::Arguments, doc).unwrap_err();
        match err {
            ModelError::IncompatibleVersion { found, supported } => {
                assert_eq!(found, "2.0");
                assert_eq!(supported, 1);
            }
            other => panic!("expected IncompatibleVersion, got {other:?}"),
        }
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let bytes = encode(DocumentKind::Arguments, &Arguments::new()).unwrap();
        let err = decode::<Arguments>(DocumentKind::Spec, &bytes).unwrap_err();
        assert!(matches!(err, ModelError::UnexpectedDocument { .. }));
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut args = Arguments::new();
        args.push_unit("b", ["1"]);
        args.push_unit("a", ["2"]);

        assert_eq!(
            encode(DocumentKind::Arguments, &args).unwrap(),
            encode(DocumentKind::Arguments, &args.clone()).unwrap()
        );
    }
}
