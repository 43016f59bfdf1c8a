use crate::foundation::core::ScenePath;
use crate::foundation::error::{StagehandError, StagehandResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Scene-side configuration of an [`crate::Orchestrator`], fixed for its lifetime.
///
/// ```json
/// { "root_path": "/World", "excluded_paths": ["/World/Lights"], "delegate_id": "/Stagehand" }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Subtree the orchestrator populates from; prepare rejects roots outside it.
    pub root_path: ScenePath,
    /// Subtrees never populated.
    pub excluded_paths: Vec<ScenePath>,
    /// Subtrees populated but forced invisible.
    pub invised_paths: Vec<ScenePath>,
    /// Prefix under which rprim ids live in the render index.
    pub delegate_id: ScenePath,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            root_path: ScenePath::root(),
            excluded_paths: Vec::new(),
            invised_paths: Vec::new(),
            delegate_id: ScenePath::root(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse from a JSON reader; missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> StagehandResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| StagehandError::serde(format!("parse orchestrator config JSON: {e}")))
    }

    /// Parse from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> StagehandResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StagehandError::configuration(format!("open config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Builder-style root path override.
    pub fn with_root_path(mut self, root: ScenePath) -> Self {
        self.root_path = root;
        self
    }

    /// Builder-style delegate id override.
    pub fn with_delegate_id(mut self, id: ScenePath) -> Self {
        self.delegate_id = id;
        self
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
