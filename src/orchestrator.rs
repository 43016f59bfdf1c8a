use crate::config::OrchestratorConfig;
use crate::foundation::core::{Matrix4d, ScenePath, Viewport, WindowPolicy};
use crate::foundation::error::{StagehandError, StagehandResult};
use crate::foundation::ids::{AovId, BackendId, RenderTag};
use crate::params::RenderParams;
use crate::render::aov::RenderBuffer;
use crate::render::backend::{BackendDesc, RenderDelegate};
use crate::render::index::RenderIndex;
use crate::render::registry::BackendRegistry;
use crate::scene::adapter::SceneAdapter;
use crate::scene::stage::Prim;
use crate::session::{BackendInstance, BackendSession, SessionState};
use crate::task::controller::TaskController;
use crate::task::pass::CameraBinding;
use std::sync::Arc;

/// Drives a swappable render backend over an immutable scene.
///
/// An orchestrator owns at most one backend session. Selecting a backend acquires the new
/// backend first and only then tears the old session down, so a failed selection leaves the
/// previous backend in place. Every mutating call takes `&mut self`; references handed out by
/// accessors cannot outlive the next swap.
///
/// Fallible operations return [`StagehandResult`]; `Ok` corresponds to success and every error
/// leaves the orchestrator in a valid state.
pub struct Orchestrator {
    registry: Arc<dyn BackendRegistry>,
    config: OrchestratorConfig,
    session: Option<BackendSession>,
    generation: u64,

    // Host-side state re-applied to every new session.
    outputs: Vec<AovId>,
    viewport: Option<Viewport>,
    camera: Option<CameraBinding>,
    window_policy: Option<WindowPolicy>,
    extra_render_tags: Vec<RenderTag>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.current_backend_id())
            .field("generation", &self.generation)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator and bring up the registry's default backend.
    ///
    /// Failure to bring up a default backend is logged; the orchestrator is still usable and
    /// [`Orchestrator::select_backend`] can be retried.
    pub fn new(registry: Arc<dyn BackendRegistry>, config: OrchestratorConfig) -> Self {
        let mut orch = Self::unbound(registry, config);
        if let Err(e) = orch.select_backend(&BackendId::default()) {
            tracing::warn!(error = %e, "no default backend available");
        }
        orch
    }

    /// Create an orchestrator with no active backend.
    pub fn unbound(registry: Arc<dyn BackendRegistry>, config: OrchestratorConfig) -> Self {
        Self {
            registry,
            config,
            session: None,
            generation: 0,
            outputs: Vec::new(),
            viewport: None,
            camera: None,
            window_policy: None,
            extra_render_tags: Vec::new(),
        }
    }

    /// Scene-side configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Make `id` the active backend; the empty id selects the registry default.
    ///
    /// Selecting the active backend is a no-op. On any error the current session is untouched.
    pub fn select_backend(&mut self, id: &BackendId) -> StagehandResult<()> {
        let id = if id.is_empty() {
            self.default_backend_id()?
        } else {
            id.clone()
        };

        let Some(plugin) = self.registry.resolve(&id) else {
            tracing::error!(backend = %id, "unknown backend");
            return Err(StagehandError::configuration(format!(
                "no backend plugin named '{id}'"
            )));
        };
        if self.current_backend_id() == Some(&id) {
            self.registry.release(plugin);
            tracing::debug!(backend = %id, "backend already active");
            return Ok(());
        }

        let generation = self.generation + 1;
        let backend = BackendInstance::instantiate(Arc::clone(&self.registry), id.clone(), plugin)
            .inspect_err(|e| {
                tracing::error!(backend = %id, error = %e, "backend selection failed");
            })?;
        let mut session =
            BackendSession::new(backend, self.config.delegate_id.clone(), generation)?;

        let carried = self.session.as_ref().map(|s| {
            (
                s.scene_adapter.root_transform(),
                s.scene_adapter.root_visibility(),
            )
        });
        self.release_backend();

        if let Some((xf, visible)) = carried {
            let s = &mut session;
            s.scene_adapter.set_root_transform(&mut s.render_index, xf);
            s.scene_adapter
                .set_root_visibility(&mut s.render_index, visible);
        }
        self.outputs = self.restore_view_state(&mut session);
        tracing::debug!(backend = %id, generation, "backend session constructed");
        self.generation = generation;
        self.session = Some(session);
        Ok(())
    }

    fn default_backend_id(&self) -> StagehandResult<BackendId> {
        self.registry
            .default_backend_id()
            .or_else(|| self.registry.list().into_iter().next().map(|d| d.id))
            .ok_or_else(|| {
                tracing::error!("registry has no backends");
                StagehandError::configuration("no default backend available")
            })
    }

    // Returns the cached outputs the new backend accepted.
    fn restore_view_state(&self, session: &mut BackendSession) -> Vec<AovId> {
        let tc = &mut session.task_controller;
        if let Some(viewport) = self.viewport {
            tc.set_render_viewport(viewport);
        }
        match &self.camera {
            Some(CameraBinding::Scene(path)) => {
                tc.set_camera_path(path.clone());
                session
                    .scene_adapter
                    .set_camera_for_sampling(Some(path.clone()));
            }
            Some(CameraBinding::Free { view, projection }) => {
                tc.set_free_camera_matrices(*view, *projection);
            }
            None => {}
        }
        if let Some(policy) = self.window_policy {
            session.scene_adapter.set_window_policy(policy);
        }
        if self.outputs.is_empty() {
            return Vec::new();
        }
        let Some(delegate) = session.backend.delegate() else {
            return Vec::new();
        };
        let kept = filter_outputs(&self.outputs, delegate);
        match session.task_controller.set_render_outputs(&kept, delegate) {
            Ok(()) => kept,
            Err(e) => {
                tracing::warn!(error = %e, "could not re-apply outputs to the new backend");
                Vec::new()
            }
        }
    }

    /// Tear down the active session, if any. Idempotent.
    pub fn release_backend(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(backend = %session.backend.id(), "tearing down backend session");
            session.teardown();
        }
    }

    /// Id of the active backend.
    pub fn current_backend_id(&self) -> Option<&BackendId> {
        self.session.as_ref().map(|s| s.backend.id())
    }

    /// Every backend the registry knows, in preference order.
    pub fn list_backends(&self) -> Vec<BackendDesc> {
        self.registry.list()
    }

    /// User-facing name of `id`; empty for the empty id or an unknown backend.
    pub fn display_name(&self, id: &BackendId) -> String {
        if id.is_empty() {
            return String::new();
        }
        self.registry
            .describe(id)
            .map(|d| d.display_name)
            .unwrap_or_default()
    }

    /// Counter bumped every time a new session is constructed.
    pub fn session_generation(&self) -> u64 {
        self.generation
    }

    /// Times the active session populated its scene (0 or 1).
    pub fn population_count(&self) -> usize {
        self.session.as_ref().map_or(0, BackendSession::populations)
    }

    /// Whether the active session has populated its scene.
    pub fn session_state(&self) -> Option<SessionState> {
        self.session.as_ref().map(BackendSession::state)
    }

    /// Scene adapter of the active session.
    pub fn scene_adapter(&self) -> Option<&SceneAdapter> {
        self.session.as_ref().map(|s| &s.scene_adapter)
    }

    /// Mutable scene adapter of the active session, e.g. to queue scene edits.
    pub fn scene_adapter_mut(&mut self) -> Option<&mut SceneAdapter> {
        self.session.as_mut().map(|s| &mut s.scene_adapter)
    }

    /// Render index of the active session.
    pub fn render_index(&self) -> Option<&RenderIndex> {
        self.session.as_ref().map(|s| &s.render_index)
    }

    /// Task controller of the active session.
    pub fn task_controller(&self) -> Option<&TaskController> {
        self.session.as_ref().map(|s| &s.task_controller)
    }

    /// Render delegate of the active session.
    pub fn render_delegate(&self) -> Option<&(dyn RenderDelegate + 'static)> {
        self.session.as_ref().and_then(|s| s.backend.delegate())
    }

    /// Populate the scene on first use, then advance time and refine level and flush queued
    /// scene edits.
    ///
    /// `root` must be a valid prim under the configured root path.
    #[tracing::instrument(skip(self, root, params), fields(root = %root.path()))]
    pub fn prepare(&mut self, root: &Prim, params: &RenderParams) -> StagehandResult<()> {
        let session = require(&mut self.session, "prepare")?;
        session
            .prepare(root, params, &self.config)
            .inspect_err(|e| tracing::error!(error = %e, "prepare failed"))
    }

    /// Draw `paths` (render-index paths) with `params` in one pass.
    #[tracing::instrument(skip(self, paths, params), fields(roots = paths.len()))]
    pub fn render_batch(
        &mut self,
        paths: &[ScenePath],
        params: &RenderParams,
    ) -> StagehandResult<()> {
        let session = require(&mut self.session, "render_batch")?;
        session
            .render_batch(paths, params, &self.extra_render_tags)
            .inspect_err(|e| tracing::error!(error = %e, "render batch failed"))
    }

    /// [`Orchestrator::prepare`] followed by a batch over `root` alone.
    pub fn render(&mut self, root: &Prim, params: &RenderParams) -> StagehandResult<()> {
        self.prepare(root, params)?;
        let path = require(&mut self.session, "render")?
            .scene_adapter
            .convert_cache_path_to_index_path(root.path());
        self.render_batch(&[path], params)
    }

    /// Return `true` when further render calls would not refine the image.
    pub fn is_converged(&self) -> StagehandResult<bool> {
        let session = self.session.as_ref().ok_or_else(|| {
            tracing::error!("is_converged without an active backend");
            StagehandError::precondition("is_converged requires an active backend")
        })?;
        Ok(session
            .backend
            .delegate()
            .is_some_and(|d| session.task_controller.is_converged(d)))
    }

    /// Draw through the scene camera at `path` (a scene path). It also becomes the
    /// time-sampling camera.
    pub fn set_camera_path(&mut self, path: ScenePath) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_camera_path")?;
        session.task_controller.set_camera_path(path.clone());
        session
            .scene_adapter
            .set_camera_for_sampling(Some(path.clone()));
        self.camera = Some(CameraBinding::Scene(path));
        Ok(())
    }

    /// Draw through a free camera. `projection` must already match the viewport aspect.
    pub fn set_camera_state(
        &mut self,
        view: Matrix4d,
        projection: Matrix4d,
    ) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_camera_state")?;
        session
            .task_controller
            .set_free_camera_matrices(view, projection);
        self.camera = Some(CameraBinding::Free { view, projection });
        Ok(())
    }

    /// Set the viewport; output buffers follow its size.
    pub fn set_render_viewport(&mut self, viewport: Viewport) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_render_viewport")?;
        session.task_controller.set_render_viewport(viewport);
        self.viewport = Some(viewport);
        Ok(())
    }

    /// Set how scene cameras are conformed to the viewport. Free cameras are unaffected.
    pub fn set_window_policy(&mut self, policy: WindowPolicy) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_window_policy")?;
        session.scene_adapter.set_window_policy(policy);
        self.window_policy = Some(policy);
        Ok(())
    }

    /// Request outputs. Ids the backend cannot produce are dropped with a warning.
    ///
    /// Fails only when the backend does not support output buffers at all.
    pub fn set_outputs(&mut self, ids: &[AovId]) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_outputs")?;
        let Some(delegate) = session.backend.delegate() else {
            return Err(StagehandError::precondition("backend instance has no delegate"));
        };
        if !delegate.supports_output_buffers() {
            tracing::error!(
                backend = %session.backend.id(),
                "backend does not support output buffers"
            );
            return Err(StagehandError::configuration(format!(
                "backend '{}' does not support output buffers",
                session.backend.id()
            )));
        }
        let kept = filter_outputs(ids, delegate);
        session.task_controller.set_render_outputs(&kept, delegate)?;
        self.outputs = kept;
        Ok(())
    }

    /// Outputs accepted by the last successful [`Orchestrator::set_outputs`].
    pub fn outputs(&self) -> &[AovId] {
        &self.outputs
    }

    /// Buffer for `id`; `None` when it is not a bound output.
    pub fn output_buffer(&self, id: &AovId) -> Option<&RenderBuffer> {
        self.session
            .as_ref()
            .and_then(|s| s.task_controller.render_output(id))
    }

    /// Draw these tags in addition to `geometry` and `render`.
    pub fn set_extra_render_tags(&mut self, tags: Vec<RenderTag>) {
        self.extra_render_tags = tags;
    }

    /// Transform applied above the scene root; carried across backend swaps.
    pub fn set_root_transform(&mut self, xf: Matrix4d) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_root_transform")?;
        session
            .scene_adapter
            .set_root_transform(&mut session.render_index, xf);
        Ok(())
    }

    /// Visibility applied above the scene root; carried across backend swaps.
    pub fn set_root_visibility(&mut self, visible: bool) -> StagehandResult<()> {
        let session = require(&mut self.session, "set_root_visibility")?;
        session
            .scene_adapter
            .set_root_visibility(&mut session.render_index, visible);
        Ok(())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.release_backend();
    }
}

fn require<'a>(
    session: &'a mut Option<BackendSession>,
    op: &str,
) -> StagehandResult<&'a mut BackendSession> {
    session.as_mut().ok_or_else(|| {
        tracing::error!(op, "no active backend");
        StagehandError::precondition(format!("{op} requires an active backend"))
    })
}

fn filter_outputs(ids: &[AovId], delegate: &dyn RenderDelegate) -> Vec<AovId> {
    let mut kept: Vec<AovId> = Vec::with_capacity(ids.len());
    for id in ids {
        if kept.contains(id) {
            continue;
        }
        if delegate.default_output_descriptor(id).format.is_valid() {
            kept.push(id.clone());
        } else {
            tracing::warn!(aov = %id, "backend cannot produce output, dropping it");
        }
    }
    kept
}

#[cfg(test)]
#[path = "../tests/unit/orchestrator.rs"]
mod tests;
