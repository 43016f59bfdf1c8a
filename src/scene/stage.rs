use crate::foundation::core::{Matrix4d, ScenePath};
use crate::foundation::error::{StagehandError, StagehandResult};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Kind of prim. Only `Mesh` and `Points` become rprims; `Camera` is read for scene cameras.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimKind {
    /// Grouping/transform node.
    #[default]
    Xform,
    /// Polygonal surface.
    Mesh,
    /// Point cloud.
    Points,
    /// Scene camera.
    Camera,
}

impl PrimKind {
    /// Return `true` for kinds that are drawn.
    pub fn is_drawable(self) -> bool {
        matches!(self, Self::Mesh | Self::Points)
    }
}

/// Authored purpose; maps one-to-one onto a render tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Always drawn (`geometry` tag).
    #[default]
    Default,
    /// Final-render geometry (`render` tag).
    Render,
    /// Viewport guide (`guide` tag).
    Guide,
    /// Stand-in geometry (`proxy` tag).
    Proxy,
}

/// Procedural draw mode authored on a model prim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Draw the prim's own geometry.
    #[default]
    Default,
    /// Replace the subtree by its bounding box.
    Bounds,
    /// Replace the subtree by textured cards.
    Cards,
}

/// Authored data of one prim.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PrimDesc {
    /// Prim kind.
    pub kind: PrimKind,
    /// Authored visibility.
    pub visible: bool,
    /// Local-to-parent transform.
    pub transform: Matrix4d,
    /// Authored purpose.
    pub purpose: Purpose,
    /// Authored model draw mode.
    pub draw_mode: DrawMode,
    /// Whether a material is bound.
    pub has_material: bool,
    /// Whether any attribute on the prim is time-sampled.
    pub time_varying: bool,
}

impl Default for PrimDesc {
    fn default() -> Self {
        Self {
            kind: PrimKind::Xform,
            visible: true,
            transform: Matrix4d::IDENTITY,
            purpose: Purpose::Default,
            draw_mode: DrawMode::Default,
            has_material: false,
            time_varying: false,
        }
    }
}

impl PrimDesc {
    /// A visible mesh with default settings.
    pub fn mesh() -> Self {
        Self {
            kind: PrimKind::Mesh,
            ..Self::default()
        }
    }

    /// A transform node.
    pub fn xform() -> Self {
        Self::default()
    }

    /// A scene camera.
    pub fn camera() -> Self {
        Self {
            kind: PrimKind::Camera,
            ..Self::default()
        }
    }
}

#[derive(serde::Deserialize)]
struct StageDef {
    prims: Vec<PrimEntry>,
}

#[derive(serde::Deserialize)]
struct PrimEntry {
    path: ScenePath,
    #[serde(flatten)]
    desc: PrimDesc,
}

/// Immutable prim table keyed by path.
///
/// This is the scene-description collaborator the orchestrator reads from. A stage is never
/// mutated after construction; hosts publish changes by building a new snapshot and queueing
/// [`crate::scene::adapter::SceneEdit`]s for the affected paths.
#[derive(Debug, Clone, Default)]
pub struct Stage {
    prims: BTreeMap<ScenePath, PrimDesc>,
}

impl Stage {
    /// Build a stage from `(path, desc)` pairs. Every prim's parent must be present (or `/`).
    pub fn from_prims(
        prims: impl IntoIterator<Item = (ScenePath, PrimDesc)>,
    ) -> StagehandResult<Arc<Self>> {
        let mut map = BTreeMap::new();
        for (path, desc) in prims {
            if path.is_root() {
                return Err(StagehandError::configuration(
                    "the pseudo-root '/' cannot carry prim data",
                ));
            }
            if map.insert(path.clone(), desc).is_some() {
                return Err(StagehandError::configuration(format!(
                    "duplicate prim '{path}'"
                )));
            }
        }
        for path in map.keys() {
            if let Some(parent) = path.parent()
                && !parent.is_root()
                && !map.contains_key(&parent)
            {
                return Err(StagehandError::configuration(format!(
                    "prim '{path}' has no parent prim '{parent}'"
                )));
            }
        }
        Ok(Arc::new(Self { prims: map }))
    }

    /// An empty stage (only the pseudo-root).
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Parse a stage from a JSON reader: `{ "prims": [ { "path": "/A", "kind": "mesh", ... } ] }`.
    pub fn from_reader<R: std::io::Read>(r: R) -> StagehandResult<Arc<Self>> {
        let def: StageDef = serde_json::from_reader(r)
            .map_err(|e| StagehandError::serde(format!("parse stage JSON: {e}")))?;
        Self::from_prims(def.prims.into_iter().map(|p| (p.path, p.desc)))
    }

    /// Parse a stage from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> StagehandResult<Arc<Self>> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            StagehandError::configuration(format!("open stage JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Number of authored prims (the pseudo-root is not counted).
    pub fn len(&self) -> usize {
        self.prims.len()
    }

    /// Return `true` when only the pseudo-root exists.
    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    /// Authored data at `path`; `None` for the pseudo-root and unknown paths.
    pub fn desc(&self, path: &ScenePath) -> Option<&PrimDesc> {
        self.prims.get(path)
    }

    /// Return `true` if `path` names the pseudo-root or an authored prim.
    pub fn contains(&self, path: &ScenePath) -> bool {
        path.is_root() || self.prims.contains_key(path)
    }

    /// `root` (when authored) and every prim beneath it, in path order.
    pub fn subtree(&self, root: &ScenePath) -> Vec<(&ScenePath, &PrimDesc)> {
        let mut out = Vec::new();
        if let Some(own) = self.prims.get_key_value(root) {
            out.push(own);
        }
        // Descendants share the `root/` prefix, which is a contiguous key range.
        let lower = root.descendant_lower_bound();
        out.extend(
            self.prims
                .range(lower.clone()..)
                .take_while(|(p, _)| p.as_str().starts_with(lower.as_str())),
        );
        out
    }

    /// Handle to the prim at `path`; the handle is invalid if no such prim exists.
    pub fn prim_at(self: &Arc<Self>, path: ScenePath) -> Prim {
        Prim {
            stage: Arc::clone(self),
            path,
        }
    }

    /// Handle to the pseudo-root.
    pub fn pseudo_root(self: &Arc<Self>) -> Prim {
        self.prim_at(ScenePath::root())
    }
}

/// Handle to a prim on a particular stage snapshot.
#[derive(Debug, Clone)]
pub struct Prim {
    stage: Arc<Stage>,
    path: ScenePath,
}

impl Prim {
    /// Return `true` if the prim exists on its stage.
    pub fn is_valid(&self) -> bool {
        self.stage.contains(&self.path)
    }

    /// Prim path.
    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    /// Owning stage snapshot.
    pub fn stage(&self) -> &Arc<Stage> {
        &self.stage
    }

    /// Authored data; `None` for the pseudo-root or an invalid handle.
    pub fn desc(&self) -> Option<&PrimDesc> {
        self.stage.desc(&self.path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/stage.rs"]
mod tests;
