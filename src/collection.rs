//! Draw-collection diffing and render-tag policy.
//!
//! The task controller is handed a [`DrawCollection`] every frame. Rebuilding one means sorting
//! the root paths and dirtying the backend's view of which rprims to draw, so
//! [`update_collection`] only does that when the new description actually differs.

use crate::foundation::core::ScenePath;
use crate::foundation::ids::RenderTag;
use crate::params::RenderParams;
use smallvec::SmallVec;

/// Name of the main draw collection.
pub const GEOMETRY_COLLECTION: &str = "geometry";

/// Render tags for one pass. Nearly always two to four entries.
pub type RenderTags = SmallVec<[RenderTag; 4]>;

/// Representation style used to draw the collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReprStyle {
    /// Smooth-shaded hull (unrefined).
    #[default]
    SmoothHull,
    /// Refined (subdivided) surfaces.
    Refined,
}

impl ReprStyle {
    /// Style selected by a level-of-detail hint: `Refined` above 1, else `SmoothHull`.
    pub fn from_level_of_detail(hint: u32) -> Self {
        if hint > 1 {
            Self::Refined
        } else {
            Self::SmoothHull
        }
    }

    /// Stable token for this style.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmoothHull => "smoothHull",
            Self::Refined => "refined",
        }
    }
}

/// Which scene roots to draw and in which style.
///
/// `root_paths` is always sorted and de-duplicated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawCollection {
    name: String,
    style: ReprStyle,
    root_paths: Vec<ScenePath>,
}

impl Default for DrawCollection {
    fn default() -> Self {
        Self::new(ReprStyle::SmoothHull, Vec::new())
    }
}

impl DrawCollection {
    /// Build a `geometry` collection, sorting and de-duplicating `roots`.
    pub fn new(style: ReprStyle, mut roots: Vec<ScenePath>) -> Self {
        roots.sort_unstable();
        roots.dedup();
        Self {
            name: GEOMETRY_COLLECTION.to_owned(),
            style,
            root_paths: roots,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Representation style.
    pub fn style(&self) -> ReprStyle {
        self.style
    }

    /// Sorted, de-duplicated root paths.
    pub fn root_paths(&self) -> &[ScenePath] {
        &self.root_paths
    }

    /// Return `true` when `path` is one of the roots or lies under one.
    pub fn contains(&self, path: &ScenePath) -> bool {
        path.ancestors()
            .any(|p| self.root_paths.binary_search(&p).is_ok())
    }
}

/// Decide whether `old` must be rebuilt to draw `roots` with `params`.
///
/// Checks run cheapest first and stop at the first mismatch: name and root count, then style,
/// then root membership. Membership walks both lists by position and only binary-searches `old`
/// for entries that differ, so the common "same roots, same order" frame costs one linear pass.
pub fn needs_rebuild(old: &DrawCollection, roots: &[ScenePath], params: &RenderParams) -> bool {
    if old.name != GEOMETRY_COLLECTION || old.root_paths.len() != roots.len() {
        return true;
    }
    if old.style != ReprStyle::from_level_of_detail(params.level_of_detail_hint) {
        return true;
    }

    let old_roots = &old.root_paths;
    // Only allocated once a positional mismatch forces the membership path; it catches
    // duplicate entries in `roots` that would otherwise make a smaller set look equal.
    let mut seen: Option<Vec<bool>> = None;
    for (i, root) in roots.iter().enumerate() {
        if old_roots[i] == *root && seen.is_none() {
            continue;
        }
        let Ok(at) = old_roots.binary_search(root) else {
            return true;
        };
        let seen = seen.get_or_insert_with(|| {
            let mut v = vec![false; old_roots.len()];
            // Everything before `i` matched positionally.
            v[..i].iter_mut().for_each(|s| *s = true);
            v
        });
        if seen[at] {
            return true;
        }
        seen[at] = true;
    }
    false
}

/// Replace `collection` when [`needs_rebuild`] says so. Returns `true` if it was rebuilt.
pub fn update_collection(
    collection: &mut DrawCollection,
    roots: &[ScenePath],
    params: &RenderParams,
) -> bool {
    if !needs_rebuild(collection, roots, params) {
        return false;
    }
    *collection = DrawCollection::new(
        ReprStyle::from_level_of_detail(params.level_of_detail_hint),
        roots.to_vec(),
    );
    true
}

/// Render tags for a pass: `geometry` and `render`, followed by any caller extras.
pub fn compute_render_tags(extra: &[RenderTag]) -> RenderTags {
    let mut tags = RenderTags::new();
    tags.push(RenderTag::geometry());
    tags.push(RenderTag::render());
    for tag in extra {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

#[cfg(test)]
#[path = "../tests/unit/collection.rs"]
mod tests;
