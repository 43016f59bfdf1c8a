use super::*;

fn p(s: &str) -> ScenePath {
    ScenePath::new(s).unwrap()
}

#[test]
fn scene_path_validation_rejects_relative_and_malformed_paths() {
    assert!(ScenePath::new("/").is_ok());
    assert!(ScenePath::new("/World/Mesh").is_ok());
    assert!(ScenePath::new("World").is_err());
    assert!(ScenePath::new("/World/").is_err());
    assert!(ScenePath::new("/World//Mesh").is_err());
    assert!(ScenePath::new("/World/../Mesh").is_err());
    assert!(ScenePath::new("/./World").is_err());
}

#[test]
fn scene_path_prefix_respects_element_boundaries() {
    let a = p("/World/Mesh");
    assert!(a.has_prefix(&p("/World")));
    assert!(a.has_prefix(&a));
    assert!(a.has_prefix(&ScenePath::root()));
    assert!(!p("/WorldX/Mesh").has_prefix(&p("/World")));
    assert!(!p("/World").has_prefix(&a));
}

#[test]
fn scene_path_parent_name_and_depth() {
    let a = p("/World/Mesh");
    assert_eq!(a.name(), "Mesh");
    assert_eq!(a.depth(), 2);
    assert_eq!(a.parent(), Some(p("/World")));
    assert_eq!(p("/World").parent(), Some(ScenePath::root()));
    assert_eq!(ScenePath::root().parent(), None);
    assert_eq!(ScenePath::root().name(), "");
    assert_eq!(ScenePath::root().depth(), 0);

    let up: Vec<String> = a.ancestors().map(String::from).collect();
    assert_eq!(up, vec!["/World/Mesh", "/World", "/"]);
}

#[test]
fn scene_path_append_child_validates_the_element() {
    assert_eq!(ScenePath::root().append_child("A").unwrap(), p("/A"));
    assert_eq!(p("/A").append_child("B").unwrap(), p("/A/B"));
    assert!(p("/A").append_child("").is_err());
    assert!(p("/A").append_child("B/C").is_err());
    assert!(p("/A").append_child("..").is_err());
}

#[test]
fn scene_path_replace_prefix_reroots_both_directions() {
    let delegate = p("/Stagehand");
    let root = ScenePath::root();

    assert_eq!(
        p("/World/Mesh").replace_prefix(&root, &delegate),
        Some(p("/Stagehand/World/Mesh"))
    );
    assert_eq!(root.replace_prefix(&root, &delegate), Some(delegate.clone()));
    assert_eq!(
        p("/Stagehand/World/Mesh").replace_prefix(&delegate, &root),
        Some(p("/World/Mesh"))
    );
    assert_eq!(delegate.replace_prefix(&delegate, &root), Some(root.clone()));
    assert_eq!(p("/Other/Mesh").replace_prefix(&delegate, &root), None);
}

#[test]
fn scene_path_order_is_lexicographic() {
    let mut v = vec![p("/b"), p("/a/c"), p("/a"), p("/")];
    v.sort();
    let s: Vec<&str> = v.iter().map(ScenePath::as_str).collect();
    assert_eq!(s, vec!["/", "/a", "/a/c", "/b"]);
}

#[test]
fn scene_path_serde_goes_through_validation() {
    let ok: ScenePath = serde_json::from_str("\"/World\"").unwrap();
    assert_eq!(ok, p("/World"));
    assert!(serde_json::from_str::<ScenePath>("\"World\"").is_err());
    assert_eq!(serde_json::to_string(&ok).unwrap(), "\"/World\"");
}

#[test]
fn matrix_multiplication_composes_row_vector_transforms() {
    let m = Matrix4d::scale(2.0) * Matrix4d::translate(1.0, 2.0, 3.0);
    assert_eq!(m.0[0][0], 2.0);
    assert_eq!(m.0[3], [1.0, 2.0, 3.0, 1.0]);
    assert_eq!(Matrix4d::IDENTITY * m, m);
    assert_eq!(Matrix4d::default(), Matrix4d::IDENTITY);
}

#[test]
fn viewport_pixel_dims_clamp_degenerate_extents() {
    assert_eq!(Viewport::new(0.0, 0.0, 64.0, 32.0).pixel_dims(), (64, 32));
    assert_eq!(Viewport::new(0.0, 0.0, -1.0, f64::NAN).pixel_dims(), (0, 0));
    assert_eq!(Viewport::default().pixel_dims(), (0, 0));
}

#[test]
fn time_code_default_maps_to_nan() {
    assert!(TimeCode::Default.as_f64().is_nan());
    assert_eq!(TimeCode::Sample(2.5).as_f64(), 2.5);
    assert_eq!(WindowPolicy::default(), WindowPolicy::Fit);
}
