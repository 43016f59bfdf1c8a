use crate::collection::DrawCollection;
use crate::foundation::core::{Matrix4d, ScenePath, TimeCode};
use crate::foundation::ids::RenderTag;
use crate::scene::stage::{DrawMode, PrimKind};
use std::collections::{BTreeMap, BTreeSet};

/// Per-rprim change flags accumulated between syncs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirtyBits(u32);

impl DirtyBits {
    /// Nothing changed.
    pub const CLEAN: Self = Self(0);
    /// Effective visibility changed.
    pub const VISIBILITY: Self = Self(1 << 0);
    /// World transform (or its time sample) changed.
    pub const TRANSFORM: Self = Self(1 << 1);
    /// Refine level changed.
    pub const REFINE_LEVEL: Self = Self(1 << 2);
    /// Material binding or material enablement changed.
    pub const MATERIAL: Self = Self(1 << 3);
    /// The rprim is new or was resynced from the scene.
    pub const TOPOLOGY: Self = Self(1 << 4);
    /// Everything.
    pub const ALL: Self = Self(0x1f);

    /// Return `true` if no bit is set.
    pub fn is_clean(self) -> bool {
        self.0 == 0
    }

    /// Return `true` if every bit in `other` is set.
    pub fn contains(self, other: DirtyBits) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit pattern.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for DirtyBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for DirtyBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Backend-facing state of one renderable primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct RprimState {
    /// Source prim kind.
    pub kind: PrimKind,
    /// Render tag derived from the prim's purpose.
    pub tag: RenderTag,
    /// Effective visibility (authored, ancestors, root visibility, invised paths).
    pub visible: bool,
    /// World transform including the adapter's root transform.
    pub world_transform: Matrix4d,
    /// Refine level (the adapter's fallback).
    pub refine_level: u32,
    /// Material bound and scene materials enabled.
    pub material_enabled: bool,
    /// Stand-in draw mode when the rprim replaces a model subtree.
    pub draw_mode: DrawMode,
    /// Time the rprim was last evaluated at, for time-varying prims.
    pub time: Option<TimeCode>,
}

/// One rprim handed to a backend during sync.
#[derive(Clone, Debug, PartialEq)]
pub struct RprimSync {
    /// Rprim id (index path).
    pub id: ScenePath,
    /// Current state.
    pub state: RprimState,
    /// What changed since the previous sync.
    pub dirty: DirtyBits,
}

/// Changes a backend must apply before executing a pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncBatch {
    /// Dirty rprims inside the pass's collection and tags.
    pub synced: Vec<RprimSync>,
    /// Rprims removed from the index since the previous sync.
    pub removed: Vec<ScenePath>,
}

impl SyncBatch {
    /// Return `true` when nothing needs applying.
    pub fn is_empty(&self) -> bool {
        self.synced.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug)]
struct RprimEntry {
    state: RprimState,
    dirty: DirtyBits,
}

/// Registry of rprims shared by the scene adapter (writer) and task controller (reader).
///
/// Dirty rprims outside the current collection stay dirty until a pass includes them.
#[derive(Debug, Default)]
pub struct RenderIndex {
    rprims: BTreeMap<ScenePath, RprimEntry>,
    dirty: BTreeSet<ScenePath>,
    removed: Vec<ScenePath>,
}

impl RenderIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of rprims.
    pub fn len(&self) -> usize {
        self.rprims.len()
    }

    /// Return `true` when no rprims are registered.
    pub fn is_empty(&self) -> bool {
        self.rprims.is_empty()
    }

    /// State of `id`.
    pub fn rprim(&self, id: &ScenePath) -> Option<&RprimState> {
        self.rprims.get(id).map(|e| &e.state)
    }

    /// Pending dirty bits of `id`.
    pub fn dirty_bits(&self, id: &ScenePath) -> Option<DirtyBits> {
        self.rprims.get(id).map(|e| e.dirty)
    }

    /// All rprim ids in path order.
    pub fn rprim_ids(&self) -> impl Iterator<Item = &ScenePath> {
        self.rprims.keys()
    }

    /// Insert (or replace) an rprim; it starts fully dirty.
    pub(crate) fn insert_rprim(&mut self, id: ScenePath, state: RprimState) {
        self.removed.retain(|r| r != &id);
        self.dirty.insert(id.clone());
        self.rprims.insert(
            id,
            RprimEntry {
                state,
                dirty: DirtyBits::ALL,
            },
        );
    }

    /// Remove `root` and every rprim beneath it. Returns the number removed.
    pub(crate) fn remove_subtree(&mut self, root: &ScenePath) -> usize {
        let doomed: Vec<ScenePath> = self
            .rprims
            .keys()
            .filter(|id| id.has_prefix(root))
            .cloned()
            .collect();
        for id in &doomed {
            self.rprims.remove(id);
            self.dirty.remove(id);
        }
        let n = doomed.len();
        self.removed.extend(doomed);
        n
    }

    /// Apply `f` to every rprim under `root`, marking the bits it returns.
    pub(crate) fn update_subtree(
        &mut self,
        root: &ScenePath,
        mut f: impl FnMut(&ScenePath, &mut RprimState) -> DirtyBits,
    ) {
        for (id, entry) in self.rprims.iter_mut().filter(|(id, _)| id.has_prefix(root)) {
            let bits = f(id, &mut entry.state);
            if !bits.is_clean() {
                entry.dirty |= bits;
                self.dirty.insert(id.clone());
            }
        }
    }

    /// Collect dirty rprims visible to `collection`/`tags` plus pending removals, and clear their
    /// dirty state.
    pub(crate) fn sync(&mut self, collection: &DrawCollection, tags: &[RenderTag]) -> SyncBatch {
        let mut batch = SyncBatch {
            synced: Vec::new(),
            removed: std::mem::take(&mut self.removed),
        };
        let rprims = &mut self.rprims;
        self.dirty.retain(|id| {
            let Some(entry) = rprims.get_mut(id) else {
                return false;
            };
            if !collection.contains(id) || !tags.contains(&entry.state.tag) {
                return true;
            }
            batch.synced.push(RprimSync {
                id: id.clone(),
                state: entry.state.clone(),
                dirty: entry.dirty,
            });
            entry.dirty = DirtyBits::CLEAN;
            false
        });
        batch
    }

    /// Ids of visible rprims drawn by `collection` with `tags`, in path order.
    pub(crate) fn drawn(&self, collection: &DrawCollection, tags: &[RenderTag]) -> Vec<ScenePath> {
        self.rprims
            .iter()
            .filter(|(id, e)| {
                e.state.visible && tags.contains(&e.state.tag) && collection.contains(id)
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/index.rs"]
mod tests;
