//! Action manifest: which module implements an action in a given worker.
//!
//! ```json
//! {
//!   "node": { "<actionId>": { "workers": { "app/page": "<moduleId>" } } },
//!   "edge": { }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::config::Runtime;

/// Runtime plus worker name an action is looked up in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerScope {
    pub runtime: Runtime,
    pub worker: String,
}

impl WorkerScope {
    pub fn new(runtime: Runtime, worker: impl Into<String>) -> Self {
        Self {
            runtime,
            worker: worker.into(),
        }
    }

    /// Scope of the page serving `pathname`: `/` → `app/page`, `/blog` → `app/blog/page`.
    pub fn for_page(runtime: Runtime, pathname: &str) -> Self {
        let page = pathname.trim_end_matches('/');
        Self::new(runtime, format!("app{page}/page"))
    }
}

impl fmt::Display for WorkerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.runtime.as_str(), self.worker)
    }
}

/// Identifier of a module that exports actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ModuleReference(String);

impl ModuleReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleReference {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps an action id in a worker scope to the module implementing it.
pub trait ActionModuleResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, action_id: &str, scope: &WorkerScope) -> Option<ModuleReference>;
}

/// Errors loading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read action manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse action manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    workers: HashMap<String, ModuleReference>,
}

/// Lookup table loaded once per process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionManifest {
    #[serde(default)]
    node: HashMap<String, ManifestEntry>,
    #[serde(default)]
    edge: HashMap<String, ManifestEntry>,
}

impl ActionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Record that `module` implements `action_id` in `scope`.
    pub fn insert(&mut self, action_id: impl Into<String>, scope: &WorkerScope, module: impl Into<ModuleReference>) {
        self.section_mut(scope.runtime)
            .entry(action_id.into())
            .or_default()
            .workers
            .insert(scope.worker.clone(), module.into());
    }

    pub fn len(&self, runtime: Runtime) -> usize {
        self.section(runtime).len()
    }

    fn section(&self, runtime: Runtime) -> &HashMap<String, ManifestEntry> {
        match runtime {
            Runtime::Node => &self.node,
            Runtime::Edge => &self.edge,
        }
    }

    fn section_mut(&mut self, runtime: Runtime) -> &mut HashMap<String, ManifestEntry> {
        match runtime {
            Runtime::Node => &mut self.node,
            Runtime::Edge => &mut self.edge,
        }
    }
}

impl ActionModuleResolver for ActionManifest {
    fn resolve(&self, action_id: &str, scope: &WorkerScope) -> Option<ModuleReference> {
        self.section(scope.runtime)
            .get(action_id)?
            .workers
            .get(&scope.worker)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "node": {
            "a1b2": { "workers": { "app/page": "mod-home", "app/blog/page": "mod-blog" } }
        },
        "edge": {
            "a1b2": { "workers": { "app/page": "mod-home-edge" } }
        }
    }"#;

    #[test]
    fn test_worker_scope_for_page() {
        assert_eq!(WorkerScope::for_page(Runtime::Node, "/").worker, "app/page");
        assert_eq!(WorkerScope::for_page(Runtime::Node, "/blog").worker, "app/blog/page");
        assert_eq!(WorkerScope::for_page(Runtime::Edge, "/blog/").worker, "app/blog/page");
    }

    #[test]
    fn test_resolve_per_runtime_and_worker() {
        let manifest = ActionManifest::from_json(MANIFEST).unwrap();

        let home = WorkerScope::for_page(Runtime::Node, "/");
        let blog = WorkerScope::for_page(Runtime::Node, "/blog");
        let edge = WorkerScope::for_page(Runtime::Edge, "/");

        assert_eq!(manifest.resolve("a1b2", &home), Some("mod-home".into()));
        assert_eq!(manifest.resolve("a1b2", &blog), Some("mod-blog".into()));
        assert_eq!(manifest.resolve("a1b2", &edge), Some("mod-home-edge".into()));
        assert_eq!(manifest.resolve("zzzz", &home), None);
        assert_eq!(
            manifest.resolve("a1b2", &WorkerScope::for_page(Runtime::Edge, "/blog")),
            None
        );
    }

    #[test]
    fn test_insert_builds_same_table() {
        let mut manifest = ActionManifest::new();
        let scope = WorkerScope::for_page(Runtime::Node, "/");
        manifest.insert("a1b2", &scope, "mod-home");

        assert_eq!(manifest.len(Runtime::Node), 1);
        assert_eq!(manifest.len(Runtime::Edge), 0);
        assert_eq!(manifest.resolve("a1b2", &scope), Some("mod-home".into()));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ActionManifest::from_json("{"),
            Err(ManifestError::Parse(_))
        ));
    }
}
