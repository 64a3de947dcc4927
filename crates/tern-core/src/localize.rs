//! Resource localization.
//!
//! Every resource a unit declares must be readable from whatever host the unit
//! lands on. References into the shared storage are kept in place after a
//! `stat`; everything else is copied into the run's staging directory.
use std::{collections::BTreeMap, sync::Arc};

use tern_model::{ApplicationSpec, ResourceDescriptor, is_path_segment};
use tracing::{debug, instrument};

use crate::{
    error::StagingError,
    fetch::{ResourceFetcher, unsupported},
    storage::{Location, SharedStorage},
};

/// Append the extension of `source` to `name` unless `name` already ends with it.
///
/// Launched processes decide whether to expand an archive by its suffix, so a
/// resource declared as `lib` from `lib.tgz` is staged as `lib.tgz`.
pub fn append_suffix(source: &str, name: &str) -> String {
    let file = source.rsplit('/').next().unwrap_or(source);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            let suffix = format!(".{ext}");
            if name.ends_with(&suffix) {
                name.to_string()
            } else {
                format!("{name}{suffix}")
            }
        }
        _ => name.to_string(),
    }
}

/// Stages unit resources below a run directory.
pub struct Localizer {
    storage: Arc<dyn SharedStorage>,
    fetcher: Arc<dyn ResourceFetcher>,
    root: Location,
}

impl Localizer {
    pub fn new(
        storage: Arc<dyn SharedStorage>,
        fetcher: Arc<dyn ResourceFetcher>,
        root: Location,
    ) -> Self {
        Self {
            storage,
            fetcher,
            root,
        }
    }

    /// Localized resources per unit, in declaration order.
    ///
    /// Units without resources map to an empty list. The first failure aborts.
    #[instrument(skip_all, fields(app = %spec.name, root = %self.root))]
    pub async fn localize(
        &self,
        spec: &ApplicationSpec,
    ) -> Result<BTreeMap<String, Vec<ResourceDescriptor>>, StagingError> {
        let mut out = BTreeMap::new();
        for (unit, runtime) in &spec.units {
            let mut staged = Vec::with_capacity(runtime.resources.len());
            for resource in &runtime.resources {
                staged.push(self.localize_resource(unit, resource).await?);
            }
            out.insert(unit.clone(), staged);
        }
        Ok(out)
    }

    async fn localize_resource(
        &self,
        unit: &str,
        resource: &ResourceDescriptor,
    ) -> Result<ResourceDescriptor, StagingError> {
        let failed = |source: std::io::Error| StagingError::ResourceStaging {
            unit: unit.to_string(),
            resource: resource.name().to_string(),
            source,
        };
        let uri = resource.uri();
        if !is_path_segment(unit) || !is_path_segment(resource.name()) {
            return Err(failed(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "unit and resource names must be single path segments",
            )));
        }

        let location = if self.storage.owns(uri) {
            debug!(unit, resource = resource.name(), %uri, "referencing shared resource in place");
            Location::new(uri.clone())
        } else {
            if !self.fetcher.supports(uri) {
                return Err(failed(unsupported(self.fetcher.as_ref(), uri)));
            }
            debug!(unit, resource = resource.name(), %uri, "copying resource");
            let data = self.fetcher.fetch(uri).await.map_err(failed)?;
            let name = append_suffix(uri.path(), resource.name());
            let target = self.root.append(unit).temp_file(&name);
            self.storage.write(&target, data).await.map_err(failed)?;
            target
        };

        let stat = self.storage.stat(&location).await.map_err(failed)?;
        Ok(ResourceDescriptor::staged(
            resource.name(),
            location.into_uri(),
            stat.modified_ms,
            stat.len,
        )
        .with_archive(resource.is_archive())
        .with_pattern(resource.pattern().map(str::to_string)))
    }
}
