//! Documents staged for the master process.
//!
//! Everything here is pure: callers stage the returned bytes themselves.
use std::collections::BTreeMap;

use tern_model::{
    ApplicationSpec, ArtifactKey, ArtifactMap, Arguments, ModelResult, ResourceDescriptor,
    wire::{self, DocumentKind},
};

/// Artifacts the master localizes for its workers.
pub const MANIFEST_INCLUDES: [ArtifactKey; 5] = [
    ArtifactKey::Spec,
    ArtifactKey::LoggingTemplate,
    ArtifactKey::WorkerPackage,
    ArtifactKey::LauncherPackage,
    ArtifactKey::Arguments,
];

/// Logger configuration handed to launched processes.
pub const LOGGING_TEMPLATE: &str = r#"{
  "format": "json",
  "level": "info",
  "tz": "utc",
  "with_targets": true,
  "use_color": false
}
"#;

/// Spec with each unit's resources replaced by its localized list.
pub fn rewrite(
    spec: &ApplicationSpec,
    localized: &BTreeMap<String, Vec<ResourceDescriptor>>,
) -> ApplicationSpec {
    spec.with_localized(localized)
}

pub fn encode_spec(spec: &ApplicationSpec) -> ModelResult<Vec<u8>> {
    wire::encode(DocumentKind::Spec, spec)
}

pub fn decode_spec(bytes: &[u8]) -> ModelResult<ApplicationSpec> {
    wire::decode(DocumentKind::Spec, bytes)
}

/// Serialize the [`MANIFEST_INCLUDES`] subset of `artifacts`, in key order.
pub fn encode_manifest(artifacts: &ArtifactMap) -> ModelResult<Vec<u8>> {
    wire::encode(
        DocumentKind::LocalizeManifest,
        &artifacts.select(&MANIFEST_INCLUDES),
    )
}

pub fn decode_manifest(bytes: &[u8]) -> ModelResult<Vec<ResourceDescriptor>> {
    wire::decode(DocumentKind::LocalizeManifest, bytes)
}

pub fn encode_arguments(arguments: &Arguments) -> ModelResult<Vec<u8>> {
    wire::encode(DocumentKind::Arguments, arguments)
}

pub fn decode_arguments(bytes: &[u8]) -> ModelResult<Arguments> {
    wire::decode(DocumentKind::Arguments, bytes)
}

/// Runtime options as a single line, or `None` when there are none.
pub fn encode_runtime_options(options: &[String]) -> Option<Vec<u8>> {
    let options: Vec<&str> = options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();
    if options.is_empty() {
        return None;
    }
    Some(format!("{}\n", options.join(" ")).into_bytes())
}
