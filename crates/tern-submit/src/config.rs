use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use tern_core::config::PreparerConfig;
use tern_local::LocalClusterConfig;
use tern_model::{ApplicationSpec, ResourceUri};
use tern_observe::LoggerConfig;

/// Everything one submission needs, read from a JSON file.
///
/// Relative paths are resolved against the directory of that file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub logger: LoggerConfig,
    pub preparer: PreparerConfig,
    pub cluster: LocalClusterConfig,
    /// Directory standing in for the shared file system.
    pub storage_root: PathBuf,
    /// Dependency graph document.
    pub graph: PathBuf,
    /// Submitting user; falls back to `$USER`.
    pub user: Option<String>,
    /// Serialized credential set; its presence makes the identity secure.
    pub credentials: Option<PathBuf>,
    pub application: Option<ApplicationSpec>,
    pub arguments: Vec<String>,
    pub unit_arguments: BTreeMap<String, Vec<String>>,
    pub dependencies: Vec<String>,
    pub resources: Vec<ResourceUri>,
    pub class_paths: Vec<String>,
}

impl SubmitConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let mut cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        cfg.storage_root = absolute(base, &cfg.storage_root);
        cfg.graph = absolute(base, &cfg.graph);
        cfg.cluster.work_root = absolute(base, &cfg.cluster.work_root);
        cfg.credentials = cfg.credentials.map(|p| absolute(base, &p));

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.application.is_none() {
            bail!("no application to submit");
        }
        if self.graph.as_os_str().is_empty() {
            bail!("graph path is empty");
        }
        if self.storage_root.as_os_str().is_empty() {
            bail!("storage_root is empty");
        }
        self.preparer.validate()?;
        self.cluster.validate()?;
        Ok(())
    }

    pub fn user(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "tern".to_string())
    }
}

fn absolute(base: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demo/submit.json")
    }

    #[test]
    fn demo_config_loads() {
        let cfg = SubmitConfig::load(&demo()).unwrap();

        let app = cfg.application.as_ref().unwrap();
        assert_eq!(app.name, "wordcount");
        assert_eq!(app.units["reader"].limits.instances, 2);
        assert_eq!(cfg.preparer.runtime, "echo");
        assert_eq!(cfg.preparer.master_memory_mb, 512);
        assert!(cfg.graph.is_absolute());
        assert!(cfg.cluster.work_root.ends_with("demo/target/work"));
        assert_eq!(cfg.unit_arguments["reader"], vec!["--split", "64"]);
    }

    #[test]
    fn missing_application_is_rejected() {
        let cfg = SubmitConfig {
            graph: "graph.json".into(),
            storage_root: "/tmp/shared".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
