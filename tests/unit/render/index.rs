use super::*;
use crate::collection::ReprStyle;

fn p(s: &str) -> ScenePath {
    ScenePath::new(s).unwrap()
}

fn state(tag: RenderTag) -> RprimState {
    RprimState {
        kind: PrimKind::Mesh,
        tag,
        visible: true,
        world_transform: Matrix4d::IDENTITY,
        refine_level: 1,
        material_enabled: false,
        draw_mode: DrawMode::Default,
        time: None,
    }
}

fn collection(roots: &[&str]) -> DrawCollection {
    DrawCollection::new(ReprStyle::SmoothHull, roots.iter().map(|s| p(s)).collect())
}

fn default_tags() -> Vec<RenderTag> {
    vec![RenderTag::geometry(), RenderTag::render()]
}

#[test]
fn dirty_bits_combine() {
    let bits = DirtyBits::VISIBILITY | DirtyBits::TRANSFORM;
    assert!(bits.contains(DirtyBits::VISIBILITY));
    assert!(!bits.contains(DirtyBits::MATERIAL));
    assert!(DirtyBits::ALL.contains(bits | DirtyBits::TOPOLOGY));
    assert!(DirtyBits::CLEAN.is_clean());
    assert_eq!(DirtyBits::default(), DirtyBits::CLEAN);
}

#[test]
fn inserted_rprims_start_fully_dirty_and_sync_once() {
    let mut index = RenderIndex::new();
    index.insert_rprim(p("/A"), state(RenderTag::geometry()));
    index.insert_rprim(p("/B"), state(RenderTag::geometry()));
    assert_eq!(index.dirty_bits(&p("/A")), Some(DirtyBits::ALL));

    let batch = index.sync(&collection(&["/"]), &default_tags());
    assert_eq!(batch.synced.len(), 2);
    assert!(batch.synced.iter().all(|s| s.dirty == DirtyBits::ALL));
    assert_eq!(index.dirty_bits(&p("/A")), Some(DirtyBits::CLEAN));

    assert!(index.sync(&collection(&["/"]), &default_tags()).is_empty());
}

#[test]
fn rprims_outside_the_pass_stay_dirty() {
    let mut index = RenderIndex::new();
    index.insert_rprim(p("/In/Mesh"), state(RenderTag::geometry()));
    index.insert_rprim(p("/Out/Mesh"), state(RenderTag::geometry()));
    index.insert_rprim(p("/In/Guide"), state(RenderTag::guide()));

    let batch = index.sync(&collection(&["/In"]), &default_tags());
    let ids: Vec<&str> = batch.synced.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["/In/Mesh"]);
    assert_eq!(index.dirty_bits(&p("/Out/Mesh")), Some(DirtyBits::ALL));
    assert_eq!(index.dirty_bits(&p("/In/Guide")), Some(DirtyBits::ALL));

    let mut tags = default_tags();
    tags.push(RenderTag::guide());
    let batch = index.sync(&collection(&["/"]), &tags);
    assert_eq!(batch.synced.len(), 2);
}

#[test]
fn update_subtree_marks_returned_bits() {
    let mut index = RenderIndex::new();
    index.insert_rprim(p("/A/One"), state(RenderTag::geometry()));
    index.insert_rprim(p("/B/Two"), state(RenderTag::geometry()));
    index.sync(&collection(&["/"]), &default_tags());

    index.update_subtree(&p("/A"), |_, s| {
        s.visible = false;
        DirtyBits::VISIBILITY
    });
    assert_eq!(index.dirty_bits(&p("/A/One")), Some(DirtyBits::VISIBILITY));
    assert_eq!(index.dirty_bits(&p("/B/Two")), Some(DirtyBits::CLEAN));
    assert!(!index.rprim(&p("/A/One")).unwrap().visible);

    index.update_subtree(&p("/"), |_, _| DirtyBits::CLEAN);
    let batch = index.sync(&collection(&["/"]), &default_tags());
    assert_eq!(batch.synced.len(), 1);
    assert_eq!(batch.synced[0].dirty, DirtyBits::VISIBILITY);
}

#[test]
fn removals_are_reported_once() {
    let mut index = RenderIndex::new();
    index.insert_rprim(p("/A"), state(RenderTag::geometry()));
    index.insert_rprim(p("/A/B"), state(RenderTag::geometry()));
    index.insert_rprim(p("/AB"), state(RenderTag::geometry()));
    index.sync(&collection(&["/"]), &default_tags());

    assert_eq!(index.remove_subtree(&p("/A")), 2);
    assert_eq!(index.len(), 1);
    let batch = index.sync(&collection(&["/"]), &default_tags());
    assert_eq!(batch.removed, vec![p("/A"), p("/A/B")]);
    assert!(index.sync(&collection(&["/"]), &default_tags()).is_empty());
}

#[test]
fn drawn_filters_visibility_tags_and_collection() {
    let mut index = RenderIndex::new();
    index.insert_rprim(p("/A"), state(RenderTag::geometry()));
    let mut hidden = state(RenderTag::geometry());
    hidden.visible = false;
    index.insert_rprim(p("/B"), hidden);
    index.insert_rprim(p("/C"), state(RenderTag::proxy()));
    index.insert_rprim(p("/D"), state(RenderTag::render()));

    assert_eq!(
        index.drawn(&collection(&["/"]), &default_tags()),
        vec![p("/A"), p("/D")]
    );
    assert_eq!(
        index.drawn(&collection(&["/D"]), &default_tags()),
        vec![p("/D")]
    );
}
