use crate::collection::{DrawCollection, RenderTags, compute_render_tags};
use crate::foundation::core::{Matrix4d, ScenePath, Viewport};
use crate::foundation::error::{StagehandError, StagehandResult};
use crate::foundation::ids::AovId;
use crate::params::ClipPlane;
use crate::render::aov::{AovBinding, OutputDescriptor, RenderBuffer};
use crate::render::backend::RenderDelegate;
use crate::render::index::RenderIndex;
use crate::scene::adapter::SceneAdapter;
use crate::task::fingerprint::{PassInputs, fingerprint_pass};
use crate::task::pass::{CameraBinding, CameraState, RenderPassState, RenderTaskParams};

/// Sequences and parameterizes the render pass of one session.
///
/// Holds the pass configuration (collection, tags, camera, viewport, outputs) and the output
/// buffers. Each [`TaskController::execute`] syncs dirty rprims into the delegate and runs one
/// pass.
#[derive(Debug)]
pub struct TaskController {
    id: ScenePath,
    collection: DrawCollection,
    render_tags: RenderTags,
    task_params: RenderTaskParams,
    selection_enabled: bool,
    camera: CameraBinding,
    clip_planes: Vec<ClipPlane>,
    viewport: Viewport,
    bindings: Vec<AovBinding>,
    buffers: Vec<RenderBuffer>,
    executions: u64,
}

impl TaskController {
    /// A controller with a `color` output when `delegate` supports it.
    pub(crate) fn new(id: ScenePath, delegate: &dyn RenderDelegate) -> Self {
        let mut tc = Self {
            id,
            collection: DrawCollection::default(),
            render_tags: compute_render_tags(&[]),
            task_params: RenderTaskParams::default(),
            selection_enabled: true,
            camera: CameraBinding::default(),
            clip_planes: Vec::new(),
            viewport: Viewport::default(),
            bindings: Vec::new(),
            buffers: Vec::new(),
            executions: 0,
        };
        if delegate.supports_output_buffers() {
            let color = AovId::color();
            if delegate.default_output_descriptor(&color).format.is_valid() {
                tc.bind_outputs(&[color], delegate);
            }
        }
        tc
    }

    /// Controller id, rooted under the scene adapter's delegate id.
    pub fn id(&self) -> &ScenePath {
        &self.id
    }

    /// Request `aovs`. Ids without a valid default descriptor are skipped.
    pub(crate) fn set_render_outputs(
        &mut self,
        aovs: &[AovId],
        delegate: &dyn RenderDelegate,
    ) -> StagehandResult<()> {
        if !delegate.supports_output_buffers() {
            return Err(StagehandError::configuration(
                "backend does not support output buffers",
            ));
        }
        self.bind_outputs(aovs, delegate);
        Ok(())
    }

    fn bind_outputs(&mut self, aovs: &[AovId], delegate: &dyn RenderDelegate) {
        let mut bindings = Vec::with_capacity(aovs.len());
        let mut buffers = Vec::with_capacity(aovs.len());
        for aov in aovs {
            if bindings.iter().any(|b: &AovBinding| &b.aov == aov) {
                continue;
            }
            let descriptor = delegate.default_output_descriptor(aov);
            if !descriptor.format.is_valid() {
                tracing::warn!(aov = %aov, "skipping output without a valid format");
                continue;
            }
            // Keep pixels of outputs that stay bound with the same format.
            let kept = self
                .buffers
                .iter()
                .position(|b| b.aov() == aov && b.format() == descriptor.format);
            let buffer = match kept {
                Some(i) => self.buffers.swap_remove(i),
                None => RenderBuffer::new(aov.clone(), descriptor.format),
            };
            buffers.push(buffer);
            bindings.push(AovBinding {
                aov: aov.clone(),
                descriptor,
            });
        }
        self.bindings = bindings;
        self.buffers = buffers;
    }

    /// Bound outputs, in request order.
    pub fn outputs(&self) -> Vec<AovId> {
        self.bindings.iter().map(|b| b.aov.clone()).collect()
    }

    /// Descriptor `aov` is rendered with, if bound.
    pub fn render_output_settings(&self, aov: &AovId) -> Option<OutputDescriptor> {
        self.bindings
            .iter()
            .find(|b| &b.aov == aov)
            .map(|b| b.descriptor)
    }

    /// Replace the descriptor of a bound output. Returns `false` when `aov` is not bound.
    pub(crate) fn set_render_output_settings(
        &mut self,
        aov: &AovId,
        descriptor: OutputDescriptor,
    ) -> bool {
        match self.bindings.iter_mut().find(|b| &b.aov == aov) {
            Some(b) => {
                b.descriptor = descriptor;
                true
            }
            None => false,
        }
    }

    /// Buffer of a bound output.
    pub fn render_output(&self, aov: &AovId) -> Option<&RenderBuffer> {
        self.buffers.iter().find(|b| b.aov() == aov)
    }

    pub(crate) fn set_free_camera_clip_planes(&mut self, planes: Vec<ClipPlane>) {
        self.clip_planes = planes;
    }

    /// Current collection.
    pub fn collection(&self) -> &DrawCollection {
        &self.collection
    }

    pub(crate) fn collection_mut(&mut self) -> &mut DrawCollection {
        &mut self.collection
    }

    /// Current render tags.
    pub fn render_tags(&self) -> &RenderTags {
        &self.render_tags
    }

    pub(crate) fn set_render_tags(&mut self, tags: RenderTags) {
        self.render_tags = tags;
    }

    /// Current render-task parameters.
    pub fn render_params(&self) -> RenderTaskParams {
        self.task_params
    }

    pub(crate) fn set_render_params(&mut self, params: RenderTaskParams) {
        self.task_params = params;
    }

    /// Whether the selection highlight pass runs.
    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    pub(crate) fn set_enable_selection(&mut self, on: bool) {
        self.selection_enabled = on;
    }

    /// Current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub(crate) fn set_render_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Camera driving the pass.
    pub fn camera(&self) -> &CameraBinding {
        &self.camera
    }

    pub(crate) fn set_camera_path(&mut self, path: ScenePath) {
        self.camera = CameraBinding::Scene(path);
    }

    pub(crate) fn set_free_camera_matrices(&mut self, view: Matrix4d, projection: Matrix4d) {
        self.camera = CameraBinding::Free { view, projection };
    }

    /// Number of passes executed.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    /// Sync dirty rprims into `delegate` and execute one pass.
    pub(crate) fn execute(
        &mut self,
        index: &mut RenderIndex,
        adapter: &SceneAdapter,
        delegate: &mut dyn RenderDelegate,
    ) -> StagehandResult<()> {
        let (w, h) = self.viewport.pixel_dims();
        for buf in &mut self.buffers {
            buf.allocate(w, h);
        }

        let batch = index.sync(&self.collection, &self.render_tags);
        if !batch.is_empty() {
            tracing::debug!(
                synced = batch.synced.len(),
                removed = batch.removed.len(),
                "syncing rprims"
            );
        }
        delegate.sync(&batch)?;

        let drawn = index.drawn(&self.collection, &self.render_tags);
        let camera = self.resolve_camera(adapter);
        let fingerprint = fingerprint_pass(&PassInputs {
            collection: &self.collection,
            render_tags: &self.render_tags,
            params: self.task_params,
            camera: &camera,
            viewport: self.viewport,
            selection_enabled: self.selection_enabled,
            aov_bindings: &self.bindings,
            drawn: &drawn,
        });
        let pass = RenderPassState {
            fingerprint,
            collection: self.collection.clone(),
            render_tags: self.render_tags.clone(),
            params: self.task_params,
            camera,
            viewport: self.viewport,
            selection_enabled: self.selection_enabled,
            aov_bindings: self.bindings.clone(),
            drawn,
        };
        delegate.execute(&pass, &mut self.buffers)?;
        self.executions += 1;
        Ok(())
    }

    /// Return `true` once a pass has run and the delegate reports no further refinement.
    pub(crate) fn is_converged(&self, delegate: &dyn RenderDelegate) -> bool {
        self.executions > 0 && delegate.is_converged()
    }

    fn resolve_camera(&self, adapter: &SceneAdapter) -> CameraState {
        match &self.camera {
            CameraBinding::Free { view, projection } => CameraState {
                view: *view,
                projection: *projection,
                scene_camera: None,
                window_policy: None,
                clip_planes: self.clip_planes.clone(),
            },
            CameraBinding::Scene(path) => {
                let view = adapter.camera_world_transform(path).unwrap_or_else(|| {
                    tracing::warn!(camera = %path, "camera prim not found, using identity");
                    Matrix4d::IDENTITY
                });
                CameraState {
                    view,
                    projection: Matrix4d::IDENTITY,
                    scene_camera: Some(path.clone()),
                    window_policy: Some(adapter.window_policy()),
                    clip_planes: self.clip_planes.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/controller.rs"]
mod tests;
