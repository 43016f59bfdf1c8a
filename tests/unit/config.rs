use super::*;

fn p(s: &str) -> ScenePath {
    ScenePath::new(s).unwrap()
}

#[test]
fn defaults_root_everything_at_the_pseudo_root() {
    let c = OrchestratorConfig::default();
    assert!(c.root_path.is_root());
    assert!(c.delegate_id.is_root());
    assert!(c.excluded_paths.is_empty());
    assert!(c.invised_paths.is_empty());
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let c = OrchestratorConfig::from_reader(
        r#"{ "root_path": "/World", "excluded_paths": ["/World/Lights"] }"#.as_bytes(),
    )
    .unwrap();
    assert_eq!(c.root_path, p("/World"));
    assert_eq!(c.excluded_paths, vec![p("/World/Lights")]);
    assert!(c.invised_paths.is_empty());
    assert!(c.delegate_id.is_root());

    let empty = OrchestratorConfig::from_reader("{}".as_bytes()).unwrap();
    assert_eq!(empty, OrchestratorConfig::default());
}

#[test]
fn json_rejects_invalid_paths() {
    let err = OrchestratorConfig::from_reader(r#"{ "delegate_id": "Stagehand" }"#.as_bytes())
        .unwrap_err();
    assert!(matches!(err, StagehandError::Serde(_)));
}

#[test]
fn missing_files_are_configuration_errors() {
    let err = OrchestratorConfig::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, StagehandError::Configuration(_)));
}

#[test]
fn builders_override_fields() {
    let c = OrchestratorConfig::default()
        .with_root_path(p("/World"))
        .with_delegate_id(p("/Stagehand"));
    assert_eq!(c.root_path, p("/World"));
    assert_eq!(c.delegate_id, p("/Stagehand"));
}
