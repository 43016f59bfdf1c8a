//! Reference backend.
//!
//! A small progressive renderer used to exercise the orchestrator end to end. Each rprim in the
//! pass covers a vertical band of the image; every execute adds one jittered sample per pixel
//! and the image converges after `max_samples` executions (one for an empty pass). Any change
//! to the pass fingerprint or to synced rprims restarts accumulation.

use crate::foundation::core::ScenePath;
use crate::foundation::error::{StagehandError, StagehandResult};
use crate::foundation::ids::{AovId, BackendId};
use crate::render::aov::{AovBinding, BufferData, ClearValue, Format, OutputDescriptor, RenderBuffer};
use crate::render::backend::{BackendPlugin, RenderDelegate};
use crate::render::index::{RprimState, SyncBatch};
use crate::task::fingerprint::PassFingerprint;
use crate::task::pass::RenderPassState;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const DEFAULT_COLOR_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const COVERED_DEPTH: f32 = 0.5;

/// Options for the reference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceBackendOpts {
    /// Samples per pixel before a non-empty pass converges.
    pub max_samples: u32,
}

impl Default for ReferenceBackendOpts {
    fn default() -> Self {
        Self { max_samples: 8 }
    }
}

/// Plugin for the reference backend.
#[derive(Debug)]
pub struct ReferenceBackendPlugin {
    id: BackendId,
    display_name: String,
    opts: ReferenceBackendOpts,
    live: Arc<AtomicUsize>,
}

impl ReferenceBackendPlugin {
    /// Plugin registered as `reference` / "Reference".
    pub fn new(opts: ReferenceBackendOpts) -> Self {
        Self::named("reference", "Reference", opts)
    }

    /// Plugin with a custom id and display name, for registering several configurations.
    pub fn named(
        id: impl Into<BackendId>,
        display_name: impl Into<String>,
        opts: ReferenceBackendOpts,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            opts,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delegates created by this plugin that have not been dropped yet.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl BackendPlugin for ReferenceBackendPlugin {
    fn id(&self) -> &BackendId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn create_instance(&self) -> Option<Box<dyn RenderDelegate>> {
        Some(Box::new(ReferenceDelegate::new(
            self.opts,
            InstanceGuard::new(Arc::clone(&self.live)),
        )))
    }
}

struct InstanceGuard(Arc<AtomicUsize>);

impl InstanceGuard {
    fn new(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ReferenceDelegate {
    opts: ReferenceBackendOpts,
    rprims: BTreeMap<ScenePath, RprimState>,
    samples: u32,
    target: u32,
    last_fingerprint: Option<PassFingerprint>,
    scene_changed: bool,
    _instance: InstanceGuard,
}

impl ReferenceDelegate {
    fn new(opts: ReferenceBackendOpts, instance: InstanceGuard) -> Self {
        Self {
            opts,
            rprims: BTreeMap::new(),
            samples: 0,
            target: 0,
            last_fingerprint: None,
            scene_changed: false,
            _instance: instance,
        }
    }

    fn band_tints(&self, pass: &RenderPassState) -> Vec<[f32; 4]> {
        pass.drawn
            .iter()
            .map(|id| match self.rprims.get(id) {
                Some(s) if s.material_enabled && pass.params.enable_scene_materials => {
                    [0.7, 0.45, 0.3, 1.0]
                }
                Some(s) if s.refine_level > 1 => [0.85, 0.85, 0.85, 1.0],
                Some(_) => [0.75, 0.75, 0.75, 1.0],
                None => [1.0, 0.0, 1.0, 1.0],
            })
            .collect()
    }
}

impl RenderDelegate for ReferenceDelegate {
    fn default_output_descriptor(&self, aov: &AovId) -> OutputDescriptor {
        match aov.as_str() {
            "color" => OutputDescriptor::new(
                Format::Float32Vec4,
                ClearValue::Color(DEFAULT_COLOR_CLEAR),
            ),
            "depth" => OutputDescriptor::new(Format::Float32, ClearValue::Depth(1.0)),
            "primId" => OutputDescriptor::new(Format::Int32, ClearValue::Id(-1)),
            _ => OutputDescriptor::invalid(),
        }
    }

    fn sync(&mut self, batch: &SyncBatch) -> StagehandResult<()> {
        for id in &batch.removed {
            self.rprims.remove(id);
        }
        for s in &batch.synced {
            self.rprims.insert(s.id.clone(), s.state.clone());
        }
        if !batch.is_empty() {
            self.scene_changed = true;
        }
        Ok(())
    }

    fn execute(
        &mut self,
        pass: &RenderPassState,
        outputs: &mut [RenderBuffer],
    ) -> StagehandResult<()> {
        if outputs.len() != pass.aov_bindings.len() {
            return Err(StagehandError::backend(format!(
                "reference backend got {} buffers for {} bindings",
                outputs.len(),
                pass.aov_bindings.len()
            )));
        }

        if self.scene_changed || self.last_fingerprint != Some(pass.fingerprint) {
            self.samples = 0;
            self.target = if pass.drawn.is_empty() {
                1
            } else {
                self.opts.max_samples.max(1)
            };
            for (buf, binding) in outputs.iter_mut().zip(&pass.aov_bindings) {
                buf.clear(binding.descriptor.clear_value);
            }
            self.last_fingerprint = Some(pass.fingerprint);
            self.scene_changed = false;
        }
        if self.samples >= self.target {
            return Ok(());
        }
        self.samples += 1;

        let tints = self.band_tints(pass);
        for (buf, binding) in outputs.iter_mut().zip(&pass.aov_bindings) {
            shade_buffer(buf, binding, &tints, self.samples);
        }
        Ok(())
    }

    fn is_converged(&self) -> bool {
        self.last_fingerprint.is_some() && !self.scene_changed && self.samples >= self.target
    }
}

fn band_of(x: usize, width: usize, bands: usize) -> Option<usize> {
    if bands == 0 || width == 0 {
        None
    } else {
        Some((x * bands / width).min(bands - 1))
    }
}

// Cheap deterministic per-pixel jitter in [0.75, 1.0].
fn jitter(x: usize, y: usize, sample: u32) -> f32 {
    let mut h = (x as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (y as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f)
        ^ u64::from(sample).wrapping_mul(0x1656_67b1_9e37_79f9);
    h ^= h >> 29;
    h = h.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h ^= h >> 32;
    0.75 + 0.25 * ((h & 0xffff) as f32 / 65535.0)
}

fn shade_buffer(buf: &mut RenderBuffer, binding: &AovBinding, tints: &[[f32; 4]], sample: u32) {
    let width = buf.width() as usize;
    let format = buf.format();
    if width == 0 || tints.is_empty() {
        return;
    }
    let bands = tints.len();
    let n = sample as f32;

    match (buf.data_mut(), format) {
        (BufferData::F32(data), Format::Float32Vec4) => {
            data.par_chunks_mut(width * 4)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, px) in row.chunks_exact_mut(4).enumerate() {
                        let Some(b) = band_of(x, width, bands) else {
                            continue;
                        };
                        let j = jitter(x, y, sample);
                        for (c, (dst, tint)) in px.iter_mut().zip(tints[b]).enumerate() {
                            let v = if c == 3 { 1.0 } else { tint * j };
                            *dst += (v - *dst) / n;
                        }
                    }
                });
        }
        (BufferData::U8(data), Format::UNorm8Vec4) => {
            data.par_chunks_mut(width * 4).for_each(|row| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    if let Some(b) = band_of(x, width, bands) {
                        let c8 = tints[b].map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8);
                        px.copy_from_slice(&c8);
                    }
                }
            });
        }
        (BufferData::F32(data), Format::Float32) if binding.aov == AovId::depth() => {
            data.fill(COVERED_DEPTH);
        }
        (BufferData::I32(data), Format::Int32) if binding.aov == AovId::prim_id() => {
            data.par_chunks_mut(width).for_each(|row| {
                for (x, px) in row.iter_mut().enumerate() {
                    if let Some(b) = band_of(x, width, bands) {
                        *px = b as i32;
                    }
                }
            });
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/reference.rs"]
mod tests;
