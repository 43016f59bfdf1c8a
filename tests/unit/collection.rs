use super::*;

fn paths(v: &[&str]) -> Vec<ScenePath> {
    v.iter().map(|s| ScenePath::new(*s).unwrap()).collect()
}

fn lod(hint: u32) -> RenderParams {
    RenderParams::default().with_level_of_detail(hint)
}

#[test]
fn style_selector_splits_at_one() {
    assert_eq!(ReprStyle::from_level_of_detail(1), ReprStyle::SmoothHull);
    assert_eq!(ReprStyle::from_level_of_detail(2), ReprStyle::Refined);
    assert_eq!(
        ReprStyle::from_level_of_detail(2),
        ReprStyle::from_level_of_detail(5)
    );
    assert_ne!(
        ReprStyle::from_level_of_detail(1),
        ReprStyle::from_level_of_detail(2)
    );
    assert_eq!(ReprStyle::Refined.as_str(), "refined");
    assert_eq!(ReprStyle::SmoothHull.as_str(), "smoothHull");
}

#[test]
fn collection_sorts_and_dedups_roots() {
    let c = DrawCollection::new(ReprStyle::SmoothHull, paths(&["/b", "/a", "/b"]));
    assert_eq!(c.name(), GEOMETRY_COLLECTION);
    assert_eq!(c.root_paths(), paths(&["/a", "/b"]).as_slice());
    assert!(c.contains(&ScenePath::new("/a/x/y").unwrap()));
    assert!(c.contains(&ScenePath::new("/b").unwrap()));
    assert!(!c.contains(&ScenePath::new("/c").unwrap()));
    assert!(!c.contains(&ScenePath::root()));
}

#[test]
fn decide_is_reflexive() {
    let roots = paths(&["/a", "/b", "/c"]);
    let mut c = DrawCollection::default();
    assert!(update_collection(&mut c, &roots, &lod(1)));
    assert!(!needs_rebuild(&c, &roots, &lod(1)));
    assert!(!update_collection(&mut c, &roots, &lod(1)));
}

#[test]
fn decide_detects_a_single_changed_root() {
    let c = DrawCollection::new(ReprStyle::SmoothHull, paths(&["/a", "/b", "/c", "/d"]));
    assert!(needs_rebuild(&c, &paths(&["/a", "/b", "/x", "/d"]), &lod(1)));
    assert!(needs_rebuild(&c, &paths(&["/z", "/b", "/c", "/d"]), &lod(1)));
    assert!(needs_rebuild(&c, &paths(&["/a", "/b", "/c", "/e"]), &lod(1)));
}

#[test]
fn decide_ignores_insertion_order() {
    let c = DrawCollection::new(ReprStyle::SmoothHull, paths(&["/a", "/b", "/c"]));
    assert!(!needs_rebuild(&c, &paths(&["/c", "/a", "/b"]), &lod(1)));
    assert!(!needs_rebuild(&c, &paths(&["/a", "/c", "/b"]), &lod(1)));
}

#[test]
fn decide_rebuilds_on_count_or_style_change() {
    let c = DrawCollection::new(ReprStyle::SmoothHull, paths(&["/a", "/b"]));
    assert!(needs_rebuild(&c, &paths(&["/a"]), &lod(1)));
    assert!(needs_rebuild(&c, &paths(&["/a", "/b", "/c"]), &lod(1)));
    assert!(needs_rebuild(&c, &paths(&["/a", "/b"]), &lod(2)));

    let refined = DrawCollection::new(ReprStyle::Refined, paths(&["/a", "/b"]));
    assert!(!needs_rebuild(&refined, &paths(&["/a", "/b"]), &lod(2)));
    assert!(!needs_rebuild(&refined, &paths(&["/a", "/b"]), &lod(5)));
}

#[test]
fn decide_treats_duplicate_roots_as_a_different_set() {
    let c = DrawCollection::new(ReprStyle::SmoothHull, paths(&["/a", "/b"]));
    assert!(needs_rebuild(&c, &paths(&["/b", "/b"]), &lod(1)));
    assert!(needs_rebuild(&c, &paths(&["/a", "/a"]), &lod(1)));
}

#[test]
fn update_replaces_the_collection_when_needed() {
    let mut c = DrawCollection::new(ReprStyle::SmoothHull, paths(&["/a"]));
    assert!(update_collection(&mut c, &paths(&["/c", "/b"]), &lod(3)));
    assert_eq!(c.style(), ReprStyle::Refined);
    assert_eq!(c.root_paths(), paths(&["/b", "/c"]).as_slice());
}

#[test]
fn render_tags_always_lead_with_geometry_and_render() {
    let tags = compute_render_tags(&[]);
    assert_eq!(tags.as_slice(), &[RenderTag::geometry(), RenderTag::render()]);

    let tags = compute_render_tags(&[RenderTag::guide(), RenderTag::render(), RenderTag::guide()]);
    assert_eq!(
        tags.as_slice(),
        &[RenderTag::geometry(), RenderTag::render(), RenderTag::guide()]
    );
}
