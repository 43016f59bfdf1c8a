use crate::foundation::core::TimeCode;

/// Clip plane as `(a, b, c, d)` coefficients of `ax + by + cz + d = 0`.
pub type ClipPlane = [f64; 4];

/// Per-frame rendering parameters.
///
/// Two values are equal iff every field is equal. Hosts use equality to decide whether to call
/// render again; the orchestrator itself never caches on it and relies on the collection differ
/// and backend dirty tracking instead.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Scene time to sample.
    pub time: TimeCode,
    /// Level-of-detail hint (`>= 1`); values above 1 select refined geometry.
    pub level_of_detail_hint: u32,
    /// Free-camera clip planes, in order.
    pub clip_planes: Vec<ClipPlane>,
    /// Use materials authored in the scene.
    pub enable_scene_materials: bool,
    /// Honor procedural draw modes (bounds/cards stand-ins) authored on prims.
    pub enable_procedural_draw_modes: bool,
    /// Clear color applied to the color output every frame.
    pub clear_color: [f32; 4],
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            time: TimeCode::Default,
            level_of_detail_hint: 1,
            clip_planes: Vec::new(),
            enable_scene_materials: true,
            enable_procedural_draw_modes: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RenderParams {
    /// Return params sampled at `t`.
    pub fn at_time(mut self, t: f64) -> Self {
        self.time = TimeCode::Sample(t);
        self
    }

    /// Return params with a level-of-detail hint (clamped to `>= 1`).
    pub fn with_level_of_detail(mut self, hint: u32) -> Self {
        self.level_of_detail_hint = hint.max(1);
        self
    }

    /// Return params with a clear color.
    pub fn with_clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }
}

#[cfg(test)]
#[path = "../tests/unit/params.rs"]
mod tests;
