use crate::foundation::error::StagehandResult;
use crate::foundation::ids::{AovId, BackendId};
use crate::render::aov::{OutputDescriptor, RenderBuffer};
use crate::render::index::SyncBatch;
use crate::task::pass::RenderPassState;

/// Registry-facing description of a backend plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendDesc {
    /// Plugin id.
    pub id: BackendId,
    /// User-facing name.
    pub display_name: String,
    /// Higher priority plugins are preferred as the default.
    pub priority: i32,
}

/// A loadable renderer plugin: knows whether it runs on this system and how to create and
/// destroy its render delegates.
pub trait BackendPlugin: Send + Sync {
    /// Plugin id.
    fn id(&self) -> &BackendId;

    /// User-facing name.
    fn display_name(&self) -> &str;

    /// Return `false` if the plugin cannot run on the current system.
    fn is_supported(&self) -> bool {
        true
    }

    /// Instantiate a render delegate; `None` when the backend cannot be brought up.
    fn create_instance(&self) -> Option<Box<dyn RenderDelegate>>;

    /// Destroy a delegate created by [`BackendPlugin::create_instance`].
    fn destroy_instance(&self, delegate: Box<dyn RenderDelegate>) {
        drop(delegate);
    }
}

/// One instantiated backend.
///
/// The task controller calls [`RenderDelegate::sync`] with the rprims that changed and then
/// [`RenderDelegate::execute`] once per render call. Execution is blocking; progressive backends
/// report more work through [`RenderDelegate::is_converged`].
pub trait RenderDelegate {
    /// Default descriptor for `aov`; `Format::Invalid` when unsupported.
    fn default_output_descriptor(&self, aov: &AovId) -> OutputDescriptor;

    /// Return `false` if this backend cannot produce output buffers at all.
    fn supports_output_buffers(&self) -> bool {
        true
    }

    /// Apply rprim changes.
    fn sync(&mut self, batch: &SyncBatch) -> StagehandResult<()>;

    /// Render `pass` into `outputs` (same order as `pass.aov_bindings`).
    fn execute(
        &mut self,
        pass: &RenderPassState,
        outputs: &mut [RenderBuffer],
    ) -> StagehandResult<()>;

    /// Return `true` when further executions would not change the image.
    fn is_converged(&self) -> bool;
}
