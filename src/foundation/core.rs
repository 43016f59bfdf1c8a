use crate::foundation::error::{StagehandError, StagehandResult};
use std::fmt;

/// Absolute, `/`-separated path naming a prim in a scene or an rprim in a render index.
///
/// Paths order lexicographically by their string form, which is what sorted root lists and
/// binary-search membership tests rely on.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ScenePath(String);

impl ScenePath {
    /// Parse and validate an absolute path.
    pub fn new(s: impl Into<String>) -> StagehandResult<Self> {
        let s = s.into();
        if !s.starts_with('/') {
            return Err(StagehandError::configuration(format!(
                "scene path '{s}' must be absolute"
            )));
        }
        if s.len() > 1 {
            if s.ends_with('/') {
                return Err(StagehandError::configuration(format!(
                    "scene path '{s}' must not end with '/'"
                )));
            }
            for elem in s[1..].split('/') {
                validate_element(elem).map_err(|e| {
                    StagehandError::configuration(format!("scene path '{s}': {e}"))
                })?;
            }
        }
        Ok(Self(s))
    }

    /// The absolute root path `/`.
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Borrow the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return `true` for `/`.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last path element, or `""` for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(i) => &self.0[i + 1..],
            None => "",
        }
    }

    /// Number of elements below the root.
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// Return `true` when `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self) -> Option<ScenePath> {
        if self.is_root() {
            return None;
        }
        let i = self.0.rfind('/')?;
        if i == 0 {
            Some(Self::root())
        } else {
            Some(Self(self.0[..i].to_owned()))
        }
    }

    /// Append a single child element.
    pub fn append_child(&self, name: &str) -> StagehandResult<ScenePath> {
        validate_element(name).map_err(|e| {
            StagehandError::configuration(format!("child of '{}': {e}", self.0))
        })?;
        if self.is_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Re-root this path from `old` onto `new`; `None` if `old` is not a prefix.
    pub fn replace_prefix(&self, old: &ScenePath, new: &ScenePath) -> Option<ScenePath> {
        if !self.has_prefix(old) {
            return None;
        }
        let rest = if old.is_root() {
            &self.0[..]
        } else {
            &self.0[old.0.len()..]
        };
        if rest.is_empty() || rest == "/" {
            return Some(new.clone());
        }
        if new.is_root() {
            Some(Self(rest.to_owned()))
        } else {
            Some(Self(format!("{}{rest}", new.0)))
        }
    }

    /// Smallest key that sorts before every descendant of this path (`/a/` for `/a`, `/` for the
    /// root). Not itself a valid path.
    pub(crate) fn descendant_lower_bound(&self) -> ScenePath {
        if self.is_root() {
            Self::root()
        } else {
            Self(format!("{}/", self.0))
        }
    }

    /// This path followed by each of its ancestors up to and including the root.
    pub fn ancestors(&self) -> impl Iterator<Item = ScenePath> + '_ {
        std::iter::successors(Some(self.clone()), ScenePath::parent)
    }
}

fn validate_element(elem: &str) -> Result<(), String> {
    if elem.is_empty() {
        return Err("empty path element".to_owned());
    }
    if elem == "." || elem == ".." {
        return Err(format!("relative element '{elem}' is not allowed"));
    }
    if elem.contains('/') {
        return Err(format!("element '{elem}' contains '/'"));
    }
    Ok(())
}

impl TryFrom<String> for ScenePath {
    type Error = StagehandError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScenePath> for String {
    fn from(value: ScenePath) -> Self {
        value.0
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row-major 4x4 double-precision matrix (row vectors, translation in the last row).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix4d(pub [[f64; 4]; 4]);

impl Matrix4d {
    /// Identity matrix.
    pub const IDENTITY: Self = Self([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    /// Uniform scale.
    pub fn scale(s: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0][0] = s;
        m.0[1][1] = s;
        m.0[2][2] = s;
        m
    }

    /// Translation by `(x, y, z)`.
    pub fn translate(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[3][0] = x;
        m.0[3][1] = y;
        m.0[3][2] = z;
        m
    }

    /// Iterate coefficients in row-major order.
    pub fn coeffs(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }
}

impl std::ops::Mul for Matrix4d {
    type Output = Matrix4d;

    fn mul(self, rhs: Matrix4d) -> Matrix4d {
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Matrix4d(out)
    }
}

impl Default for Matrix4d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Viewport rectangle `(x, y, width, height)` in pixels; `(x, y)` is the lower-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Lower-left x.
    pub x: f64,
    /// Lower-left y.
    pub y: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Viewport {
    /// Create a viewport rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pixel dimensions used for output buffers (non-positive extents map to 0).
    pub fn pixel_dims(&self) -> (u32, u32) {
        let px = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 };
        (px(self.width), px(self.height))
    }
}

/// How a scene camera's frustum is conformed to the viewport aspect ratio.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Keep the vertical aperture, adjust horizontal.
    MatchVertically,
    /// Keep the horizontal aperture, adjust vertical.
    MatchHorizontally,
    /// Grow the frustum so the whole aperture stays visible.
    #[default]
    Fit,
    /// Shrink the frustum so the viewport is filled.
    Crop,
    /// Leave the frustum untouched.
    DontConform,
}

/// Time at which the scene is sampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeCode {
    /// The scene's default (non-animated) values.
    #[default]
    Default,
    /// A specific time sample.
    Sample(f64),
}

impl TimeCode {
    /// Numeric value used for hashing; `Default` maps to NaN.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Default => f64::NAN,
            Self::Sample(t) => t,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
