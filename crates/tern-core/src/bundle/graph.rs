use std::{
    collections::{HashMap, HashSet, VecDeque},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::error::BundleError;

/// A code artifact and the artifacts it needs at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactNode {
    /// Globally unique artifact id, e.g. `tern.master` or `app.wordcount`.
    pub id: String,
    /// Local file holding the artifact's content.
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

impl ArtifactNode {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            requires: Vec::new(),
        }
    }

    pub fn requires<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// Static dependency graph over code artifacts, built ahead of time.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, ArtifactNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; a later node with the same id replaces the earlier one.
    pub fn insert(&mut self, node: ArtifactNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn with(mut self, node: ArtifactNode) -> Self {
        self.insert(node);
        self
    }

    /// Parse a JSON array of nodes.
    ///
    /// Relative node paths are resolved against `base`.
    pub fn from_json(bytes: &[u8], base: Option<&std::path::Path>) -> Result<Self, BundleError> {
        let nodes: Vec<ArtifactNode> = serde_json::from_slice(bytes)
            .map_err(|e| BundleError::InvalidGraph(e.to_string()))?;

        let mut graph = Self::new();
        for mut node in nodes {
            if graph.contains(&node.id) {
                return Err(BundleError::InvalidGraph(format!(
                    "duplicate artifact id '{}'",
                    node.id
                )));
            }
            if let Some(base) = base {
                if node.path.is_relative() {
                    node.path = base.join(&node.path);
                }
            }
            graph.insert(node);
        }
        Ok(graph)
    }

    pub fn get(&self, id: &str) -> Option<&ArtifactNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Transitive closure of `entries`, breadth first, in discovery order.
    ///
    /// Every artifact appears once even when reachable along several paths or
    /// through a cycle. Ids matching an `exclude` prefix are neither returned
    /// nor traversed.
    pub fn closure<S: AsRef<str>>(
        &self,
        entries: &[S],
        exclude: &[String],
    ) -> Result<Vec<&ArtifactNode>, BundleError> {
        let excluded = |id: &str| exclude.iter().any(|p| id.starts_with(p.as_str()));

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, Option<&str>)> = VecDeque::new();
        for entry in entries {
            let entry = entry.as_ref();
            if !excluded(entry) && visited.insert(entry) {
                queue.push_back((entry, None));
            }
        }

        let mut out = Vec::new();
        while let Some((id, required_by)) = queue.pop_front() {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| BundleError::DependencyResolution {
                    artifact: id.to_string(),
                    required_by: required_by.unwrap_or("entry point").to_string(),
                })?;

            for dep in &node.requires {
                let dep = dep.as_str();
                if !excluded(dep) && visited.insert(dep) {
                    queue.push_back((dep, Some(node.id.as_str())));
                }
            }
            out.push(node);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(nodes: &[&ArtifactNode]) -> Vec<String> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    fn graph() -> DependencyGraph {
        DependencyGraph::new()
            .with(ArtifactNode::new("app.a", "a").requires(["lib.common", "lib.a"]))
            .with(ArtifactNode::new("app.b", "b").requires(["lib.common"]))
            .with(ArtifactNode::new("lib.common", "c").requires(["lib.util"]))
            .with(ArtifactNode::new("lib.a", "la"))
            .with(ArtifactNode::new("lib.util", "u").requires(["lib.common"]))
            .with(ArtifactNode::new("runtime.core", "rt"))
    }

    #[test]
    fn shared_dependencies_appear_once() {
        let g = graph();
        let closure = g.closure(&["app.a", "app.b"], &[]).unwrap();

        assert_eq!(
            ids(&closure),
            vec!["app.a", "app.b", "lib.common", "lib.a", "lib.util"]
        );
    }

    #[test]
    fn cycles_terminate() {
        let g = graph();
        let closure = g.closure(&["lib.util"], &[]).unwrap();
        assert_eq!(ids(&closure), vec!["lib.util", "lib.common"]);
    }

    #[test]
    fn duplicate_entries_are_collapsed() {
        let g = graph();
        let closure = g.closure(&["app.b", "app.b"], &[]).unwrap();
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn excluded_prefixes_are_not_traversed() {
        let g = graph().with(ArtifactNode::new("app.c", "c").requires(["runtime.core", "runtime.missing"]));
        let closure = g.closure(&["app.c"], &["runtime.".into()]).unwrap();
        assert_eq!(ids(&closure), vec!["app.c"]);
    }

    #[test]
    fn missing_dependency_names_artifact_and_parent() {
        let g = graph().with(ArtifactNode::new("app.d", "d").requires(["lib.missing"]));
        match g.closure(&["app.d"], &[]).unwrap_err() {
            BundleError::DependencyResolution {
                artifact,
                required_by,
            } => {
                assert_eq!(artifact, "lib.missing");
                assert_eq!(required_by, "app.d");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_entry_point_is_reported() {
        let err = graph().closure(&["app.zzz"], &[]).unwrap_err();
        assert!(err.to_string().contains("entry point"), "{err}");
    }

    #[test]
    fn json_paths_resolve_against_base() {
        let json = br#"[
            {"id": "app.a", "path": "a.bin", "requires": ["lib.x"]},
            {"id": "lib.x", "path": "/abs/x.bin"}
        ]"#;
        let g = DependencyGraph::from_json(json, Some(std::path::Path::new("/opt/lib"))).unwrap();

        assert_eq!(g.len(), 2);
        assert_eq!(g.get("app.a").unwrap().path, PathBuf::from("/opt/lib/a.bin"));
        assert_eq!(g.get("lib.x").unwrap().path, PathBuf::from("/abs/x.bin"));
    }

    #[test]
    fn duplicate_json_ids_are_rejected() {
        let json = br#"[{"id": "a", "path": "x"}, {"id": "a", "path": "y"}]"#;
        assert!(matches!(
            DependencyGraph::from_json(json, None),
            Err(BundleError::InvalidGraph(_))
        ));
    }
}
