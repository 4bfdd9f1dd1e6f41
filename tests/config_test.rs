// tests/config_test.rs
use git_semrel::config::{load_config, Config, HvcsKind};
use git_semrel::SemrelError;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_default_config() {
    let config = Config::default();
    assert_eq!(config.tags.tag_prefix, "v");
    assert!(!config.tags.enable_convenience_tags);
    assert_eq!(config.publish.commit_message, "chore(release): {version}");
    assert!(config.publish.version_variables.is_empty());
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[tags]
tag_prefix = "release-"

[commit_parser]
minor_types = ["feat", "feature"]
patch_types = ["fix"]
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.tags.tag_prefix, "release-");
    assert!(config
        .commit_parser
        .minor_types
        .contains(&"feature".to_string()));
    assert_eq!(config.commit_parser.patch_types, vec!["fix".to_string()]);
    // Untouched sections keep their defaults
    assert_eq!(config.publish.remote, "origin");
    assert_eq!(config.hvcs.kind, HvcsKind::None);
}

#[test]
fn test_default_values() {
    let config = Config::default();
    assert!(config
        .commit_parser
        .breaking_change_indicators
        .contains(&"BREAKING CHANGE:".to_string()));
    assert!(config
        .commit_parser
        .breaking_change_indicators
        .contains(&"BREAKING-CHANGE:".to_string()));
    assert!(config.publish.push);
    assert!(config.publish.vcs_release);
    assert!(!config.hvcs.allow_insecure);
}

#[test]
fn test_gitlab_config_from_fixture() {
    let config = load_config(Some("tests/fixtures/semrel_gitlab.toml"))
        .expect("Failed to load test config");
    assert!(config.tags.enable_convenience_tags);
    assert_eq!(config.publish.remote, "upstream");
    assert_eq!(
        config.publish.commit_message_for("2.0.0"),
        "release: 2.0.0 [skip ci]"
    );
    assert_eq!(config.publish.version_variables.len(), 2);
    assert_eq!(config.hvcs.kind, HvcsKind::Gitlab);
    assert_eq!(config.hvcs.project.as_deref(), Some("platform/tools"));
    assert_eq!(config.hvcs.token_env, "CI_JOB_TOKEN");
}

#[test]
fn test_missing_explicit_file_is_error() {
    let err = load_config(Some("tests/fixtures/does_not_exist.toml")).unwrap_err();
    assert!(matches!(err, SemrelError::Config(_)));
}

#[test]
fn test_invalid_toml_is_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[tags\nprefix = ").unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}
