//! Stage-to-render-index translation.
//!
//! The adapter owns everything the scene contributes to a session: which prims became rprims,
//! the root transform and visibility applied on top of the stage, the current time sample and
//! refine level, and the batch of edits the host queued since the last prepare. Every setter
//! detects whether its value actually changed before touching the render index, so repeated
//! per-frame calls with the same value are free.

use crate::foundation::core::{Matrix4d, ScenePath, TimeCode, WindowPolicy};
use crate::foundation::error::{StagehandError, StagehandResult};
use crate::foundation::ids::RenderTag;
use crate::render::index::{DirtyBits, RenderIndex, RprimState};
use crate::scene::stage::{DrawMode, Prim, PrimDesc, PrimKind, Purpose, Stage};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A change the host made to the stage, applied on the next prepare.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneEdit {
    /// Prims were added or removed at or below this path; its rprims are rebuilt.
    Resync(ScenePath),
    /// Attribute values changed at or below this path; existing rprims are re-evaluated.
    Refresh(ScenePath),
}

impl SceneEdit {
    fn path(&self) -> &ScenePath {
        match self {
            Self::Resync(p) | Self::Refresh(p) => p,
        }
    }
}

/// Translates a [`Stage`] into rprims of a [`RenderIndex`].
///
/// Rprim ids are index paths: the scene (cache) path re-rooted under the adapter's delegate id.
#[derive(Debug)]
pub struct SceneAdapter {
    delegate_id: ScenePath,
    stage: Option<Arc<Stage>>,
    populated_root: Option<ScenePath>,
    excluded: Vec<ScenePath>,
    invised: Vec<ScenePath>,
    // Cache paths that currently own an rprim.
    rprims: BTreeSet<ScenePath>,
    root_transform: Matrix4d,
    root_visible: bool,
    refine_level_fallback: u32,
    time: TimeCode,
    scene_materials_enabled: bool,
    draw_modes_enabled: bool,
    window_policy: WindowPolicy,
    sampling_camera: Option<ScenePath>,
    pending: Vec<SceneEdit>,
}

impl SceneAdapter {
    pub(crate) fn new(delegate_id: ScenePath) -> Self {
        Self {
            delegate_id,
            stage: None,
            populated_root: None,
            excluded: Vec::new(),
            invised: Vec::new(),
            rprims: BTreeSet::new(),
            root_transform: Matrix4d::IDENTITY,
            root_visible: true,
            refine_level_fallback: 1,
            time: TimeCode::Default,
            scene_materials_enabled: true,
            draw_modes_enabled: true,
            window_policy: WindowPolicy::default(),
            sampling_camera: None,
            pending: Vec::new(),
        }
    }

    /// Path under which rprims are inserted into the render index.
    pub fn delegate_id(&self) -> &ScenePath {
        &self.delegate_id
    }

    /// Return `true` once [`SceneAdapter::populate`] has run.
    pub fn is_populated(&self) -> bool {
        self.populated_root.is_some()
    }

    /// Root the adapter was populated from.
    pub fn populated_root(&self) -> Option<&ScenePath> {
        self.populated_root.as_ref()
    }

    /// Stage snapshot the adapter currently reads from.
    pub fn stage(&self) -> Option<&Arc<Stage>> {
        self.stage.as_ref()
    }

    /// Number of rprims this adapter owns.
    pub fn rprim_count(&self) -> usize {
        self.rprims.len()
    }

    /// Insert an rprim for every drawable prim at or below `root`, skipping `excluded` subtrees.
    ///
    /// May only run once per adapter; a second call fails without touching the index.
    pub(crate) fn populate(
        &mut self,
        index: &mut RenderIndex,
        root: &Prim,
        excluded: &[ScenePath],
    ) -> StagehandResult<usize> {
        if let Some(populated) = &self.populated_root {
            return Err(StagehandError::precondition(format!(
                "scene adapter already populated from '{populated}'"
            )));
        }
        if !root.is_valid() {
            return Err(StagehandError::precondition(format!(
                "cannot populate from invalid prim '{}'",
                root.path()
            )));
        }

        self.stage = Some(Arc::clone(root.stage()));
        self.populated_root = Some(root.path().clone());
        self.excluded = sorted_paths(excluded);
        let n = self.insert_subtree(index, root.path());
        tracing::debug!(root = %root.path(), rprims = n, "populated scene adapter");
        Ok(n)
    }

    /// Hide every rprim at or below `paths` regardless of authored visibility.
    pub(crate) fn set_invised_paths(&mut self, index: &mut RenderIndex, paths: &[ScenePath]) {
        let paths = sorted_paths(paths);
        if paths == self.invised {
            return;
        }
        self.invised = paths;
        self.refresh_all(index);
    }

    /// Paths currently forced invisible.
    pub fn invised_paths(&self) -> &[ScenePath] {
        &self.invised
    }

    /// Refine level applied to every rprim. Returns `true` when the value changed, which dirties
    /// the refine level of every rprim.
    pub(crate) fn set_refine_level_fallback(&mut self, index: &mut RenderIndex, level: u32) -> bool {
        if level == self.refine_level_fallback {
            return false;
        }
        tracing::debug!(
            from = self.refine_level_fallback,
            to = level,
            "refine level fallback changed"
        );
        self.refine_level_fallback = level;
        self.refresh_all(index);
        true
    }

    /// Current refine level fallback.
    pub fn refine_level_fallback(&self) -> u32 {
        self.refine_level_fallback
    }

    /// Advance to `time`. Returns `true` when the value changed. Every rprim is re-evaluated but
    /// only time-varying ones come back dirty.
    pub(crate) fn set_time(&mut self, index: &mut RenderIndex, time: TimeCode) -> bool {
        if time == self.time {
            return false;
        }
        self.time = time;
        self.refresh_all(index);
        true
    }

    /// Current time sample.
    pub fn time(&self) -> TimeCode {
        self.time
    }

    /// Enable or disable authored materials. Returns `true` when the value changed.
    pub(crate) fn set_scene_materials_enabled(&mut self, index: &mut RenderIndex, on: bool) -> bool {
        if on == self.scene_materials_enabled {
            return false;
        }
        self.scene_materials_enabled = on;
        self.refresh_all(index);
        true
    }

    /// Whether authored materials are used.
    pub fn scene_materials_enabled(&self) -> bool {
        self.scene_materials_enabled
    }

    /// Replace model subtrees with stand-ins per their authored draw mode. Read at populate.
    pub(crate) fn set_draw_modes_enabled(&mut self, on: bool) {
        self.draw_modes_enabled = on;
    }

    /// Whether procedural draw modes are honored.
    pub fn draw_modes_enabled(&self) -> bool {
        self.draw_modes_enabled
    }

    /// Policy used to conform scene cameras to the viewport aspect.
    pub fn window_policy(&self) -> WindowPolicy {
        self.window_policy
    }

    pub(crate) fn set_window_policy(&mut self, policy: WindowPolicy) {
        self.window_policy = policy;
    }

    /// Camera whose shutter defines time sampling, if any.
    pub fn sampling_camera(&self) -> Option<&ScenePath> {
        self.sampling_camera.as_ref()
    }

    pub(crate) fn set_camera_for_sampling(&mut self, camera: Option<ScenePath>) {
        self.sampling_camera = camera;
    }

    /// Transform applied above the stage root.
    pub fn root_transform(&self) -> Matrix4d {
        self.root_transform
    }

    /// Replace the root transform; every rprim's world transform is re-evaluated.
    pub(crate) fn set_root_transform(&mut self, index: &mut RenderIndex, xf: Matrix4d) {
        if xf == self.root_transform {
            return;
        }
        self.root_transform = xf;
        self.refresh_all(index);
    }

    /// Visibility applied above the stage root.
    pub fn root_visibility(&self) -> bool {
        self.root_visible
    }

    /// Show or hide the whole scene.
    pub(crate) fn set_root_visibility(&mut self, index: &mut RenderIndex, visible: bool) {
        if visible == self.root_visible {
            return;
        }
        self.root_visible = visible;
        self.refresh_all(index);
    }

    /// Queue an edit for the next [`SceneAdapter::apply_pending_updates`].
    pub fn queue_edit(&mut self, edit: SceneEdit) {
        self.pending.push(edit);
    }

    /// Edits waiting to be applied.
    pub fn pending_edits(&self) -> &[SceneEdit] {
        &self.pending
    }

    /// Switch to a newer snapshot of the populated stage. Queued edits describe what changed.
    pub(crate) fn rebind_stage(&mut self, stage: Arc<Stage>) {
        tracing::debug!("rebinding scene adapter to a new stage snapshot");
        self.stage = Some(stage);
    }

    /// Apply queued edits against the current stage snapshot. Returns the number applied.
    pub(crate) fn apply_pending_updates(&mut self, index: &mut RenderIndex) -> usize {
        let edits = std::mem::take(&mut self.pending);
        let Some(root) = self.populated_root.clone() else {
            // Edits before population are subsumed by the population itself.
            return 0;
        };
        let mut applied = 0;
        for edit in &edits {
            let path = edit.path();
            let target = if path.has_prefix(&root) {
                path.clone()
            } else if root.has_prefix(path) {
                root.clone()
            } else {
                tracing::debug!(path = %path, "ignoring edit outside the populated root");
                continue;
            };
            match edit {
                SceneEdit::Resync(_) => {
                    let target = self.stand_in_ancestor(&target, &root).unwrap_or(target);
                    self.remove_subtree(index, &target);
                    self.insert_subtree(index, &target);
                }
                SceneEdit::Refresh(_) => self.refresh_subtree(index, &target),
            }
            applied += 1;
        }
        applied
    }

    /// Map a scene path to its rprim id.
    pub fn convert_cache_path_to_index_path(&self, cache_path: &ScenePath) -> ScenePath {
        cache_path
            .replace_prefix(&ScenePath::root(), &self.delegate_id)
            .unwrap_or_else(|| cache_path.clone())
    }

    /// Map an rprim id back to its scene path; `None` for ids outside the delegate id.
    pub fn convert_index_path_to_cache_path(&self, index_path: &ScenePath) -> Option<ScenePath> {
        index_path.replace_prefix(&self.delegate_id, &ScenePath::root())
    }

    /// World transform of the camera prim at `path` (camera-to-world), if it exists.
    pub fn camera_world_transform(&self, path: &ScenePath) -> Option<Matrix4d> {
        let stage = self.stage.as_ref()?;
        match stage.desc(path) {
            Some(desc) if desc.kind == PrimKind::Camera => {
                Some(world_transform(stage, path) * self.root_transform)
            }
            _ => None,
        }
    }

    fn is_excluded(&self, path: &ScenePath) -> bool {
        self.excluded.iter().any(|e| path.has_prefix(e))
    }

    fn is_invised(&self, path: &ScenePath) -> bool {
        self.invised.iter().any(|e| path.has_prefix(e))
    }

    // Topmost ancestor of `path` (within `root`) that was replaced by a stand-in.
    fn stand_in_ancestor(&self, path: &ScenePath, root: &ScenePath) -> Option<ScenePath> {
        if !self.draw_modes_enabled {
            return None;
        }
        let stage = self.stage.as_ref()?;
        path.ancestors()
            .filter(|a| a.has_prefix(root))
            .filter(|a| stage.desc(a).is_some_and(|d| d.draw_mode != DrawMode::Default))
            .last()
    }

    fn insert_subtree(&mut self, index: &mut RenderIndex, root: &ScenePath) -> usize {
        let Some(stage) = self.stage.clone() else {
            return 0;
        };
        // Byte order interleaves siblings like `/A-x` between `/A` and `/A/Child`.
        let mut stand_ins: Vec<&ScenePath> = Vec::new();
        let mut n = 0;
        for (path, desc) in stage.subtree(root) {
            if stand_ins.iter().any(|s| path.has_prefix(s)) || self.is_excluded(path) {
                continue;
            }
            let draw_mode = if self.draw_modes_enabled && desc.kind != PrimKind::Camera {
                desc.draw_mode
            } else {
                DrawMode::Default
            };
            if draw_mode != DrawMode::Default {
                stand_ins.push(path);
            } else if !desc.kind.is_drawable() {
                continue;
            }
            let state = self.evaluate(&stage, path, desc, draw_mode);
            index.insert_rprim(self.convert_cache_path_to_index_path(path), state);
            self.rprims.insert(path.clone());
            n += 1;
        }
        n
    }

    fn remove_subtree(&mut self, index: &mut RenderIndex, root: &ScenePath) {
        index.remove_subtree(&self.convert_cache_path_to_index_path(root));
        self.rprims.retain(|p| !p.has_prefix(root));
    }

    fn refresh_all(&mut self, index: &mut RenderIndex) {
        if let Some(root) = self.populated_root.clone() {
            self.refresh_subtree(index, &root);
        }
    }

    fn refresh_subtree(&mut self, index: &mut RenderIndex, root: &ScenePath) {
        let Some(stage) = self.stage.clone() else {
            return;
        };
        let index_root = self.convert_cache_path_to_index_path(root);
        index.update_subtree(&index_root, |id, state| {
            let Some(path) = self.convert_index_path_to_cache_path(id) else {
                return DirtyBits::CLEAN;
            };
            let Some(desc) = stage.desc(&path) else {
                // Removed prims go away on resync, not refresh.
                return DirtyBits::CLEAN;
            };
            let next = self.evaluate(&stage, &path, desc, state.draw_mode);
            let bits = diff_state(state, &next);
            *state = next;
            bits
        });
    }

    fn evaluate(
        &self,
        stage: &Stage,
        path: &ScenePath,
        desc: &PrimDesc,
        draw_mode: DrawMode,
    ) -> RprimState {
        let authored_visible = path
            .ancestors()
            .filter_map(|a| stage.desc(&a))
            .all(|d| d.visible);
        RprimState {
            kind: desc.kind,
            tag: purpose_tag(desc.purpose),
            visible: self.root_visible && authored_visible && !self.is_invised(path),
            world_transform: world_transform(stage, path) * self.root_transform,
            refine_level: self.refine_level_fallback,
            material_enabled: desc.has_material && self.scene_materials_enabled,
            draw_mode,
            time: desc.time_varying.then_some(self.time),
        }
    }
}

/// Render tag an rprim with `purpose` is filed under.
pub fn purpose_tag(purpose: Purpose) -> RenderTag {
    match purpose {
        Purpose::Default => RenderTag::geometry(),
        Purpose::Render => RenderTag::render(),
        Purpose::Guide => RenderTag::guide(),
        Purpose::Proxy => RenderTag::proxy(),
    }
}

// Local-to-world in row-vector order: own transform first, then each ancestor's.
fn world_transform(stage: &Stage, path: &ScenePath) -> Matrix4d {
    path.ancestors()
        .filter_map(|a| stage.desc(&a).map(|d| d.transform))
        .fold(Matrix4d::IDENTITY, |acc, xf| acc * xf)
}

fn diff_state(old: &RprimState, new: &RprimState) -> DirtyBits {
    let mut bits = DirtyBits::CLEAN;
    if old.visible != new.visible {
        bits |= DirtyBits::VISIBILITY;
    }
    if old.world_transform != new.world_transform || old.time != new.time {
        bits |= DirtyBits::TRANSFORM;
    }
    if old.refine_level != new.refine_level {
        bits |= DirtyBits::REFINE_LEVEL;
    }
    if old.material_enabled != new.material_enabled {
        bits |= DirtyBits::MATERIAL;
    }
    if old.kind != new.kind || old.tag != new.tag {
        bits |= DirtyBits::TOPOLOGY;
    }
    bits
}

fn sorted_paths(paths: &[ScenePath]) -> Vec<ScenePath> {
    let mut v = paths.to_vec();
    v.sort_unstable();
    v.dedup();
    v
}

#[cfg(test)]
#[path = "../../tests/unit/scene/adapter.rs"]
mod tests;
