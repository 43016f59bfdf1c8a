//! Stagehand orchestrates rendering of an immutable scene through a swappable backend.
//!
//! The public API is orchestrator-oriented:
//!
//! - Register backend plugins in a [`BackendRegistry`] (or use [`PluginRegistry::with_builtin`])
//! - Create an [`Orchestrator`] and select a backend
//! - [`Orchestrator::prepare`] a [`Stage`] root, then [`Orchestrator::render_batch`] until
//!   [`Orchestrator::is_converged`]
//! - Read results back with [`Orchestrator::output_buffer`]
//!
//! Backends can be swapped at any time with [`Orchestrator::select_backend`]; the new backend is
//! brought up before the old one is torn down.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod collection;
pub(crate) mod config;
pub(crate) mod orchestrator;
pub(crate) mod params;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod session;
pub(crate) mod task;

pub use crate::foundation::core::{Matrix4d, ScenePath, TimeCode, Viewport, WindowPolicy};
pub use crate::foundation::error::{StagehandError, StagehandResult};
pub use crate::foundation::ids::{AovId, BackendId, RenderTag};

pub use crate::collection::{
    DrawCollection, GEOMETRY_COLLECTION, RenderTags, ReprStyle, compute_render_tags,
    needs_rebuild, update_collection,
};
pub use crate::config::OrchestratorConfig;
pub use crate::orchestrator::Orchestrator;
pub use crate::params::{ClipPlane, RenderParams};
pub use crate::render::aov::{
    AovBinding, BufferData, ClearValue, Format, OutputDescriptor, RenderBuffer,
};
pub use crate::render::backend::{BackendDesc, BackendPlugin, RenderDelegate};
pub use crate::render::index::{DirtyBits, RenderIndex, RprimState, RprimSync, SyncBatch};
pub use crate::render::reference::{ReferenceBackendOpts, ReferenceBackendPlugin};
pub use crate::render::registry::{BackendRegistry, DEFAULT_RENDERER_ENV, PluginRegistry};
pub use crate::scene::adapter::{SceneAdapter, SceneEdit, purpose_tag};
pub use crate::scene::stage::{DrawMode, Prim, PrimDesc, PrimKind, Purpose, Stage};
pub use crate::session::SessionState;
pub use crate::task::controller::TaskController;
pub use crate::task::fingerprint::PassFingerprint;
pub use crate::task::pass::{CameraBinding, CameraState, RenderPassState, RenderTaskParams};
