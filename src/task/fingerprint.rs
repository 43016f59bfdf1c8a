use crate::collection::{DrawCollection, RenderTags};
use crate::foundation::core::{Matrix4d, ScenePath, Viewport, WindowPolicy};
use crate::render::aov::{AovBinding, ClearValue, Format};
use crate::task::pass::{CameraState, RenderTaskParams};
use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5f3a_91c2_07e4_b6d8;

/// Stable fingerprint of a pass description. Progressive backends restart accumulation when it
/// changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassFingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

pub(crate) struct PassInputs<'a> {
    pub(crate) collection: &'a DrawCollection,
    pub(crate) render_tags: &'a RenderTags,
    pub(crate) params: RenderTaskParams,
    pub(crate) camera: &'a CameraState,
    pub(crate) viewport: Viewport,
    pub(crate) selection_enabled: bool,
    pub(crate) aov_bindings: &'a [AovBinding],
    pub(crate) drawn: &'a [ScenePath],
}

pub(crate) fn fingerprint_pass(inputs: &PassInputs<'_>) -> PassFingerprint {
    let mut h = StableHasher::new();

    h.write_str(inputs.collection.name());
    h.write_str(inputs.collection.style().as_str());
    h.write_u32(inputs.collection.root_paths().len() as u32);
    for p in inputs.collection.root_paths() {
        h.write_str(p.as_str());
    }

    h.write_u32(inputs.render_tags.len() as u32);
    for t in inputs.render_tags {
        h.write_str(t.as_str());
    }

    h.write_bool(inputs.params.enable_lighting);
    h.write_bool(inputs.params.enable_scene_materials);

    write_matrix(&mut h, &inputs.camera.view);
    write_matrix(&mut h, &inputs.camera.projection);
    match &inputs.camera.scene_camera {
        Some(p) => {
            h.write_u8(1);
            h.write_str(p.as_str());
        }
        None => h.write_u8(0),
    }
    h.write_u8(match inputs.camera.window_policy {
        None => 0,
        Some(WindowPolicy::MatchVertically) => 1,
        Some(WindowPolicy::MatchHorizontally) => 2,
        Some(WindowPolicy::Fit) => 3,
        Some(WindowPolicy::Crop) => 4,
        Some(WindowPolicy::DontConform) => 5,
    });
    h.write_u32(inputs.camera.clip_planes.len() as u32);
    for plane in &inputs.camera.clip_planes {
        for c in plane {
            h.write_f64(*c);
        }
    }

    h.write_f64(inputs.viewport.x);
    h.write_f64(inputs.viewport.y);
    h.write_f64(inputs.viewport.width);
    h.write_f64(inputs.viewport.height);
    h.write_bool(inputs.selection_enabled);

    h.write_u32(inputs.aov_bindings.len() as u32);
    for b in inputs.aov_bindings {
        h.write_str(b.aov.as_str());
        h.write_u8(format_tag(b.descriptor.format));
        h.write_bool(b.descriptor.multi_sampled);
        write_clear_value(&mut h, b.descriptor.clear_value);
    }

    h.write_u32(inputs.drawn.len() as u32);
    for p in inputs.drawn {
        h.write_str(p.as_str());
    }

    h.finish()
}

fn write_matrix(h: &mut StableHasher, m: &Matrix4d) {
    for c in m.coeffs() {
        h.write_f64(c);
    }
}

fn format_tag(f: Format) -> u8 {
    match f {
        Format::Invalid => 0,
        Format::UNorm8Vec4 => 1,
        Format::Float32 => 2,
        Format::Float32Vec4 => 3,
        Format::Int32 => 4,
    }
}

fn write_clear_value(h: &mut StableHasher, v: ClearValue) {
    match v {
        ClearValue::None => h.write_u8(0),
        ClearValue::Color(c) => {
            h.write_u8(1);
            for x in c {
                h.write_f32(x);
            }
        }
        ClearValue::Depth(d) => {
            h.write_u8(2);
            h.write_f32(d);
        }
        ClearValue::Id(id) => {
            h.write_u8(3);
            h.write_u32(id as u32);
        }
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    // Length-prefixed so adjacent strings cannot alias.
    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> PassFingerprint {
        let v = self.inner.digest128();
        PassFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/task/fingerprint.rs"]
mod tests;
