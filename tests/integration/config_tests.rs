use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use templopt::actions::EliminationMode;
use templopt::compliance::ComponentType;
use templopt::config::{Config, ENV_PREFIX};
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Figment without Env so other tests' variables cannot interfere
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.report_dir, PathBuf::from(".templopt/reports"));
    assert_eq!(config.qa.min_pass_rate, 70.0);
    assert!(config.pipeline.stop_on_critical_failure);
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("templopt.toml");
    let toml_content = r#"
templates_root = "registry"
ignore_patterns = ["*.bak"]

[dedupe]
deep_scan = true
near_duplicate_extensions = ["md"]

[pipeline]
elimination_mode = "preview"
backup_checkpoints = false

[pipeline.critical]
elimination = true

[[install]]
component_type = "skills"
category = "docs"
name = "summarize-pr"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.templates_root, PathBuf::from("registry"));
    assert_eq!(config.ignore_patterns, vec!["*.bak".to_string()]);
    assert!(config.dedupe.deep_scan);
    assert!(config.dedupe.backup_required);
    assert_eq!(config.dedupe.near_duplicate_extensions, vec!["md".to_string()]);
    assert_eq!(config.pipeline.elimination_mode, EliminationMode::Preview);
    assert!(!config.pipeline.backup_checkpoints);
    assert!(config.pipeline.critical.elimination);
    assert!(config.pipeline.critical.analysis);
    assert_eq!(config.install.len(), 1);
    assert_eq!(config.install[0].component_type, ComponentType::Skills);
    assert!(config.install[0].description.is_empty());
}

#[test]
fn test_config_load_from_env() {
    // Double underscore separates nested keys
    std::env::set_var("TEMPLOPT_QA__MAX_NAME_LENGTH", "12");
    std::env::set_var("TEMPLOPT_PIPELINE__CRITICAL__INSTALLATION", "true");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .unwrap();

    assert_eq!(config.qa.max_name_length, 12);
    assert_eq!(config.score_options().max_name_length, 12);
    assert!(config.pipeline.critical.installation);

    std::env::remove_var("TEMPLOPT_QA__MAX_NAME_LENGTH");
    std::env::remove_var("TEMPLOPT_PIPELINE__CRITICAL__INSTALLATION");
}

#[test]
fn test_config_invalid_value_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("templopt.toml");
    fs::write(&config_path, "[qa]\nmin_pass_rate = \"high\"\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();

    assert!(err.to_string().contains("invalid configuration"));
}

#[test]
fn test_config_serializes_to_toml() {
    let mut config = Config::default();
    config.qa.min_pass_rate = 85.0;

    let content = toml::to_string_pretty(&config).unwrap();

    assert!(content.contains("min_pass_rate = 85.0"));
    assert!(content.contains("elimination_mode = \"execute\""));
}
