use crate::collection::{compute_render_tags, update_collection};
use crate::config::OrchestratorConfig;
use crate::foundation::core::ScenePath;
use crate::foundation::error::{StagehandError, StagehandResult};
use crate::foundation::ids::{AovId, BackendId, RenderTag};
use crate::params::RenderParams;
use crate::render::aov::ClearValue;
use crate::render::backend::{BackendPlugin, RenderDelegate};
use crate::render::index::RenderIndex;
use crate::render::registry::BackendRegistry;
use crate::scene::adapter::SceneAdapter;
use crate::scene::stage::Prim;
use crate::task::controller::TaskController;
use crate::task::pass::RenderTaskParams;
use std::sync::Arc;

/// One instantiated backend: the plugin handle and the delegate it created.
///
/// Dropping it destroys the delegate through its plugin and then returns the plugin handle to
/// the registry.
pub(crate) struct BackendInstance {
    id: BackendId,
    registry: Arc<dyn BackendRegistry>,
    plugin: Option<Arc<dyn BackendPlugin>>,
    delegate: Option<Box<dyn RenderDelegate>>,
}

impl BackendInstance {
    /// Bring up `plugin` (a handle already resolved from `registry`).
    ///
    /// On failure the handle is released before returning.
    pub(crate) fn instantiate(
        registry: Arc<dyn BackendRegistry>,
        id: BackendId,
        plugin: Arc<dyn BackendPlugin>,
    ) -> StagehandResult<Self> {
        if !plugin.is_supported() {
            registry.release(plugin);
            return Err(StagehandError::configuration(format!(
                "backend '{id}' is not supported on this system"
            )));
        }
        let Some(delegate) = plugin.create_instance() else {
            registry.release(plugin);
            return Err(StagehandError::resource_acquisition(format!(
                "backend '{id}' failed to create a render delegate"
            )));
        };
        tracing::debug!(backend = %id, "acquired backend instance");
        Ok(Self {
            id,
            registry,
            plugin: Some(plugin),
            delegate: Some(delegate),
        })
    }

    pub(crate) fn id(&self) -> &BackendId {
        &self.id
    }

    pub(crate) fn delegate(&self) -> Option<&(dyn RenderDelegate + 'static)> {
        self.delegate.as_deref()
    }

    pub(crate) fn delegate_mut(&mut self) -> StagehandResult<&mut (dyn RenderDelegate + 'static)> {
        self.delegate
            .as_deref_mut()
            .ok_or_else(|| StagehandError::precondition("backend instance has no delegate"))
    }
}

impl Drop for BackendInstance {
    fn drop(&mut self) {
        if let Some(delegate) = self.delegate.take() {
            match &self.plugin {
                Some(plugin) => plugin.destroy_instance(delegate),
                None => drop(delegate),
            }
            tracing::debug!(backend = %self.id, "destroyed render delegate");
        }
        if let Some(plugin) = self.plugin.take() {
            self.registry.release(plugin);
            tracing::debug!(backend = %self.id, "released plugin handle");
        }
    }
}

/// Whether the one-time population has happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Built, scene not yet populated.
    Constructed,
    /// Populated by the first successful prepare.
    Populated,
}

/// Everything bound to one active backend.
///
/// Fields drop in declaration order, which is the required teardown order: the task controller
/// and scene adapter reference the render index, which references the backend.
pub(crate) struct BackendSession {
    pub(crate) task_controller: TaskController,
    pub(crate) scene_adapter: SceneAdapter,
    pub(crate) render_index: RenderIndex,
    pub(crate) backend: BackendInstance,
    state: SessionState,
    generation: u64,
    populations: usize,
}

impl BackendSession {
    pub(crate) fn new(
        backend: BackendInstance,
        delegate_id: ScenePath,
        generation: u64,
    ) -> StagehandResult<Self> {
        let task_id = delegate_id
            .append_child(&task_controller_name(backend.id(), generation))
            .map_err(|e| StagehandError::configuration(format!("task controller id: {e}")))?;
        let delegate = backend
            .delegate()
            .ok_or_else(|| StagehandError::precondition("backend instance has no delegate"))?;
        let task_controller = TaskController::new(task_id, delegate);
        Ok(Self {
            task_controller,
            scene_adapter: SceneAdapter::new(delegate_id),
            render_index: RenderIndex::new(),
            backend,
            state: SessionState::Constructed,
            generation,
            populations: 0,
        })
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn populations(&self) -> usize {
        self.populations
    }

    /// Populate on first use, then advance refine level and time and flush queued edits.
    pub(crate) fn prepare(
        &mut self,
        root: &Prim,
        params: &RenderParams,
        config: &OrchestratorConfig,
    ) -> StagehandResult<()> {
        if !root.is_valid() {
            return Err(StagehandError::precondition(format!(
                "scene root '{}' is not a valid prim",
                root.path()
            )));
        }
        if !root.path().has_prefix(&config.root_path) {
            return Err(StagehandError::precondition(format!(
                "scene root '{}' is outside the configured root '{}'",
                root.path(),
                config.root_path
            )));
        }

        let adapter = &mut self.scene_adapter;
        let index = &mut self.render_index;
        match self.state {
            SessionState::Constructed => {
                let populate_root = root.stage().prim_at(config.root_path.clone());
                adapter.set_draw_modes_enabled(params.enable_procedural_draw_modes);
                adapter.populate(index, &populate_root, &config.excluded_paths)?;
                adapter.set_invised_paths(index, &config.invised_paths);
                self.state = SessionState::Populated;
                self.populations += 1;
            }
            SessionState::Populated => {
                let stale = adapter
                    .stage()
                    .is_some_and(|s| !Arc::ptr_eq(s, root.stage()));
                if stale {
                    adapter.rebind_stage(Arc::clone(root.stage()));
                }
            }
        }

        adapter.set_refine_level_fallback(index, params.level_of_detail_hint);
        adapter.set_time(index, params.time);
        let applied = adapter.apply_pending_updates(index);
        if applied > 0 {
            tracing::debug!(edits = applied, "applied pending scene edits");
        }
        Ok(())
    }

    /// Configure the pass for `paths` (index paths) and execute it.
    pub(crate) fn render_batch(
        &mut self,
        paths: &[ScenePath],
        params: &RenderParams,
        extra_tags: &[RenderTag],
    ) -> StagehandResult<()> {
        let tc = &mut self.task_controller;
        tc.set_free_camera_clip_planes(params.clip_planes.clone());
        if update_collection(tc.collection_mut(), paths, params) {
            tracing::debug!(roots = paths.len(), "rebuilt draw collection");
        }
        tc.set_render_tags(compute_render_tags(extra_tags));
        tc.set_render_params(RenderTaskParams::from(params));
        tc.set_enable_selection(false);

        let color = AovId::color();
        if let Some(mut descriptor) = tc.render_output_settings(&color)
            && descriptor.format.is_valid()
        {
            descriptor.clear_value = ClearValue::Color(params.clear_color);
            tc.set_render_output_settings(&color, descriptor);
        }

        self.scene_adapter
            .set_scene_materials_enabled(&mut self.render_index, params.enable_scene_materials);

        let delegate = self.backend.delegate_mut()?;
        self.task_controller
            .execute(&mut self.render_index, &self.scene_adapter, delegate)
    }

    /// Tear down in dependency order, logging each step.
    pub(crate) fn teardown(self) {
        let Self {
            task_controller,
            scene_adapter,
            render_index,
            backend,
            generation,
            ..
        } = self;
        let id = backend.id().clone();
        drop(task_controller);
        tracing::debug!(backend = %id, generation, "destroyed task controller");
        drop(scene_adapter);
        tracing::debug!(backend = %id, generation, "destroyed scene adapter");
        drop(render_index);
        tracing::debug!(backend = %id, generation, "destroyed render index");
        drop(backend);
    }
}

// Valid path element naming the task controller of one session.
fn task_controller_name(id: &BackendId, generation: u64) -> String {
    let ident: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("_Stagehand_{ident}_{generation}")
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
