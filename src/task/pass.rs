use crate::collection::{DrawCollection, RenderTags};
use crate::foundation::core::{Matrix4d, ScenePath, Viewport, WindowPolicy};
use crate::params::{ClipPlane, RenderParams};
use crate::render::aov::AovBinding;
use crate::task::fingerprint::PassFingerprint;

/// Render-task parameters derived from [`RenderParams`].
///
/// Camera and viewport are deliberately absent: the task controller owns those.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTaskParams {
    /// Apply scene lighting.
    pub enable_lighting: bool,
    /// Use authored scene materials.
    pub enable_scene_materials: bool,
}

impl Default for RenderTaskParams {
    fn default() -> Self {
        Self {
            enable_lighting: true,
            enable_scene_materials: true,
        }
    }
}

impl From<&RenderParams> for RenderTaskParams {
    fn from(params: &RenderParams) -> Self {
        Self {
            enable_lighting: true,
            enable_scene_materials: params.enable_scene_materials,
        }
    }
}

/// Which camera drives the pass.
#[derive(Clone, Debug, PartialEq)]
pub enum CameraBinding {
    /// Host-supplied matrices; the projection is already conformed to the viewport.
    Free {
        /// World-to-view matrix.
        view: Matrix4d,
        /// Projection matrix.
        projection: Matrix4d,
    },
    /// A camera prim in the scene, conformed with the adapter's window policy.
    Scene(ScenePath),
}

impl Default for CameraBinding {
    fn default() -> Self {
        Self::Free {
            view: Matrix4d::IDENTITY,
            projection: Matrix4d::IDENTITY,
        }
    }
}

/// Camera as resolved for one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    /// World-to-view (free camera) or camera-to-world (scene camera) matrix.
    pub view: Matrix4d,
    /// Projection matrix; identity for scene cameras.
    pub projection: Matrix4d,
    /// Scene camera path, if any.
    pub scene_camera: Option<ScenePath>,
    /// Window policy; only meaningful for scene cameras.
    pub window_policy: Option<WindowPolicy>,
    /// Free-camera clip planes.
    pub clip_planes: Vec<ClipPlane>,
}

/// Everything a backend needs to execute one pass.
#[derive(Clone, Debug)]
pub struct RenderPassState {
    /// Stable hash of every field below; changes whenever the image must restart.
    pub fingerprint: PassFingerprint,
    /// Collection being drawn.
    pub collection: DrawCollection,
    /// Render tags being drawn.
    pub render_tags: RenderTags,
    /// Task parameters.
    pub params: RenderTaskParams,
    /// Resolved camera.
    pub camera: CameraState,
    /// Viewport rectangle.
    pub viewport: Viewport,
    /// Selection highlighting pass enabled.
    pub selection_enabled: bool,
    /// Outputs, in the same order as the buffers passed to `execute`.
    pub aov_bindings: Vec<AovBinding>,
    /// Visible rprims inside the collection, in path order.
    pub drawn: Vec<ScenePath>,
}
