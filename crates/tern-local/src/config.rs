use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{error::LocalError, limits::ProcessLimits};

/// Settings of the single-host cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalClusterConfig {
    /// Directory holding one working directory per launched application.
    pub work_root: PathBuf,
    /// Exported to the master as its cluster configuration directory.
    /// Defaults to the application's working directory.
    pub conf_dir: Option<PathBuf>,
    /// Graph id of the client artifact packaged with the master.
    pub client_artifact: Option<String>,
    /// Largest memory request accepted for one process.
    pub max_memory_mb: u32,
    /// Largest virtual-core request accepted for one process.
    pub max_virtual_cores: u32,
    /// Apply the requested memory as an address-space ceiling.
    pub enforce_memory: bool,
    /// Extra limits applied to every launched process.
    pub limits: ProcessLimits,
}

impl Default for LocalClusterConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("tern-local"),
            conf_dir: None,
            client_artifact: None,
            max_memory_mb: 8192,
            max_virtual_cores: 8,
            enforce_memory: false,
            limits: ProcessLimits::default(),
        }
    }
}

impl LocalClusterConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, LocalError> {
        let cfg: Self = serde_json::from_slice(bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LocalError> {
        if self.work_root.as_os_str().is_empty() {
            return Err(LocalError::InvalidConfig("work_root is empty".into()));
        }
        if self.max_memory_mb == 0 {
            return Err(LocalError::InvalidConfig("max_memory_mb cannot be zero".into()));
        }
        if self.max_virtual_cores == 0 {
            return Err(LocalError::InvalidConfig(
                "max_virtual_cores cannot be zero".into(),
            ));
        }
        if self.limits.max_open_files == Some(0) {
            return Err(LocalError::InvalidConfig(
                "limits.max_open_files cannot be zero".into(),
            ));
        }
        Ok(())
    }
}
