use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Preparer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparerConfig {
    /// Runtime program that hosts the launcher, first token of the master command.
    pub runtime: String,
    /// Extra runtime options, passed verbatim after the built-in ones.
    pub runtime_options: Vec<String>,
    /// Memory requested for the master, in MB.
    pub master_memory_mb: u32,
    /// Part of the master's memory kept outside the runtime heap ceiling, in MB.
    pub master_reserved_memory_mb: u32,
    pub master_virtual_cores: u32,
    /// Memory workers keep outside their heap ceiling, in MB; exported to the master.
    pub reserved_memory_mb: u32,
    /// Coordination service connect string, without the application namespace.
    pub coordination_connect: String,
    /// Artifact id of the master's main entry point.
    pub master_entry: String,
    /// Artifact id of the worker container entry point.
    pub container_entry: String,
    /// Artifact id of the bootstrap launcher; every launcher artifact shares this prefix.
    pub launcher_entry: String,
    /// Artifact id prefixes provided by the cluster runtime, never bundled.
    pub bundle_excludes: Vec<String>,
}

impl Default for PreparerConfig {
    fn default() -> Self {
        Self {
            runtime: "tern-runtime".into(),
            runtime_options: Vec::new(),
            master_memory_mb: 512,
            master_reserved_memory_mb: 150,
            master_virtual_cores: 1,
            reserved_memory_mb: 200,
            coordination_connect: "localhost:2181".into(),
            master_entry: "tern.master".into(),
            container_entry: "tern.container".into(),
            launcher_entry: "tern.launcher".into(),
            bundle_excludes: Vec::new(),
        }
    }
}

impl PreparerConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_slice(bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Heap ceiling of the master runtime, in MB.
    pub fn master_heap_mb(&self) -> u32 {
        self.master_memory_mb - self.master_reserved_memory_mb
    }

    /// Rules:
    /// - runtime and entry points are non-empty;
    /// - reserved master memory leaves a positive heap;
    /// - at least one virtual core.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_empty = [
            ("runtime", &self.runtime),
            ("master_entry", &self.master_entry),
            ("container_entry", &self.container_entry),
            ("launcher_entry", &self.launcher_entry),
            ("coordination_connect", &self.coordination_connect),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        if self.master_reserved_memory_mb >= self.master_memory_mb {
            return Err(ConfigError::Invalid(format!(
                "master_reserved_memory_mb ({}) must be below master_memory_mb ({})",
                self.master_reserved_memory_mb, self.master_memory_mb
            )));
        }
        if self.master_virtual_cores == 0 {
            return Err(ConfigError::Invalid(
                "master_virtual_cores must be positive".into(),
            ));
        }
        Ok(())
    }
}
