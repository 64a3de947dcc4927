use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::is_path_segment;
use crate::{
    Properties, ResourceDescriptor,
    error::{ModelError, ModelResult},
};

/// What a unit runs: the artifact holding its entry point plus free-form configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableSpec {
    /// Id of the code artifact containing the entry point.
    ///
    /// Must be a node of the dependency graph used for bundling.
    pub entry_point: String,
    /// Configuration handed to the entry point at startup.
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl ExecutableSpec {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            properties: Properties::new(),
        }
    }
}

/// Per-instance resource request of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLimits {
    /// Number of instances to run.
    pub instances: u32,
    /// Virtual cores per instance.
    pub virtual_cores: u32,
    /// Memory per instance in megabytes.
    pub memory_mb: u32,
    /// Optional uplink bandwidth in Mbit/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplink_mbps: Option<u32>,
    /// Optional downlink bandwidth in Mbit/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_mbps: Option<u32>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            instances: 1,
            virtual_cores: 1,
            memory_mb: 512,
            uplink_mbps: None,
            downlink_mbps: None,
        }
    }
}

/// Runtime description of one executable unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    /// Unit name; equals its key in [`crate::ApplicationSpec::units`].
    pub name: String,
    pub executable: ExecutableSpec,
    #[serde(default)]
    pub limits: ResourceLimits,
    /// Resources in declaration order; later entries may shadow earlier ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceDescriptor>,
}

impl RuntimeSpec {
    pub fn new(name: impl Into<String>, executable: ExecutableSpec) -> Self {
        Self {
            name: name.into(),
            executable,
            limits: ResourceLimits::default(),
            resources: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_resource(mut self, resource: ResourceDescriptor) -> Self {
        self.resources.push(resource);
        self
    }

    /// Copy of this spec with its resource list replaced.
    pub fn with_resources(&self, resources: Vec<ResourceDescriptor>) -> Self {
        Self {
            name: self.name.clone(),
            executable: self.executable.clone(),
            limits: self.limits,
            resources,
        }
    }

    /// Rules:
    /// - `name` and every resource name are single path segments
    ///   (non-empty, no `/`, not `.` or `..`);
    /// - `executable.entry_point` is not blank;
    /// - resource names are unique within the unit;
    /// - at least one instance is requested.
    pub fn validate(&self) -> ModelResult<()> {
        if !is_path_segment(&self.name) {
            return Err(ModelError::Invalid(format!(
                "invalid unit name: {:?}",
                self.name
            )));
        }
        if self.executable.entry_point.trim().is_empty() {
            return Err(ModelError::Invalid(format!(
                "unit '{}' has an empty entry point",
                self.name
            )));
        }
        if self.limits.instances == 0 {
            return Err(ModelError::Invalid(format!(
                "unit '{}' requests zero instances",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for r in &self.resources {
            if !is_path_segment(r.name()) {
                return Err(ModelError::Invalid(format!(
                    "unit '{}' declares invalid resource name {:?}",
                    self.name,
                    r.name()
                )));
            }
            if !seen.insert(r.name()) {
                return Err(ModelError::Invalid(format!(
                    "unit '{}' declares resource '{}' more than once",
                    self.name,
                    r.name()
                )));
            }
        }
        Ok(())
    }
}
