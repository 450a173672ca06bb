use std::fs;
use std::path::Path;

use templopt::compliance::{
    score_component, test_all, test_type, validate_naming, validate_structure, ComplianceLevel,
    ComponentType, QaError, ScoreOptions,
};
use tempfile::tempdir;

fn write_agent(root: &Path, category: &str, name: &str) {
    let dir = root.join("agents").join(category).join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("agent.json"),
        format!(
            r#"{{"name":"{}","description":"Reviews pull requests","timeout":30}}"#,
            name
        ),
    )
    .unwrap();
    fs::write(dir.join("implementation.py"), "def run():\n    return 0\n").unwrap();
    fs::write(dir.join("README.md"), "# Reviewer\n\nUsage notes.\n").unwrap();
}

#[test]
fn test_skill_without_implementation_fails() {
    let dir = tempdir().unwrap();
    let component = dir.path().join("skills/foo/bar");
    fs::create_dir_all(&component).unwrap();
    fs::write(
        component.join("skill.json"),
        r#"{"name":"bar","description":"A skill"}"#,
    )
    .unwrap();
    fs::write(component.join("SKILL.md"), "# bar

Summarizes things.
").unwrap();

    let result = score_component(&component, ComponentType::Skills, &ScoreOptions::default());

    assert_eq!(
        result.checks.structure.missing_files,
        vec!["implementation.*".to_string()]
    );
    assert!(!result.checks.structure.outcome.passed);
    assert_eq!(result.checks.integration.outcome.score, 50.0);
    assert!(result.aggregate_score < 70.0);
    assert!(!result.passed);
    assert_eq!(result.compliance_level, ComplianceLevel::Poor);
}

#[test]
fn test_skill_missing_documentation_and_implementation() {
    let dir = tempdir().unwrap();
    let component = dir.path().join("skills/foo/bar");
    fs::create_dir_all(&component).unwrap();
    fs::write(
        component.join("skill.json"),
        r#"{"name":"bar","description":"A skill"}"#,
    )
    .unwrap();

    let check = validate_structure(&component, ComponentType::Skills);

    assert!(!check.outcome.passed);
    assert_eq!(
        check.missing_files,
        vec!["implementation.*".to_string(), "SKILL.md".to_string()]
    );
}

#[test]
fn test_complete_agent_scores_high() {
    let dir = tempdir().unwrap();
    write_agent(dir.path(), "review", "code-reviewer");

    let result = score_component(
        &dir.path().join("agents/review/code-reviewer"),
        ComponentType::Agents,
        &ScoreOptions::default(),
    );

    assert!(result.passed);
    assert_eq!(result.checks.naming.score, 100.0);
    assert_eq!(result.checks.structure.outcome.score, 100.0);
    assert_eq!(result.checks.integration.outcome.score, 100.0);
    assert!(result.aggregate_score >= 90.0);
    assert!(result.compliance_level >= ComplianceLevel::Good);
}

#[test]
fn test_missing_component_scores_zero() {
    let dir = tempdir().unwrap();

    let result = score_component(
        &dir.path().join("agents/x/ghost"),
        ComponentType::Agents,
        &ScoreOptions::default(),
    );

    assert_eq!(result.aggregate_score, 0.0);
    assert_eq!(result.compliance_level, ComplianceLevel::Poor);
    assert!(!result.passed);
}

#[test]
fn test_naming_rules() {
    let options = ScoreOptions::default();

    assert_eq!(validate_naming("code-reviewer", &options).score, 100.0);
    assert_eq!(validate_naming("reviewer", &options).score, 80.0);
    let bad = validate_naming("Bad_Name", &options);
    assert_eq!(bad.score, 30.0);
    assert!(!bad.passed);
    assert_eq!(bad.issues.len(), 2);

    let short = ScoreOptions { max_name_length: 5 };
    assert_eq!(validate_naming("code-reviewer", &short).score, 70.0);
}

#[test]
fn test_all_discovers_every_type() {
    let dir = tempdir().unwrap();
    write_agent(dir.path(), "review", "code-reviewer");
    let skill = dir.path().join("skills/foo/bar");
    fs::create_dir_all(&skill).unwrap();
    fs::write(skill.join("skill.json"), r#"{"name":"bar","description":"d"}"#).unwrap();
    fs::create_dir_all(dir.path().join("widgets/x/y")).unwrap();

    let run = test_all(dir.path(), &ScoreOptions::default()).unwrap();

    assert_eq!(run.summary.total_components, 2);
    assert_eq!(run.results[0].component_type, ComponentType::Agents);
    assert_eq!(run.results[1].component_type, ComponentType::Skills);
    assert_eq!(run.summary.passed, 1);
    assert_eq!(run.summary.pass_rate, 50.0);

    let report = run.report();
    assert_eq!(report.passed_components.len(), 1);
    assert_eq!(report.failed_components[0].component_name, "bar");
}

#[test]
fn test_type_filters_components() {
    let dir = tempdir().unwrap();
    write_agent(dir.path(), "review", "code-reviewer");
    write_agent(dir.path(), "review", "test-writer");
    let skill = dir.path().join("skills/foo/bar");
    fs::create_dir_all(&skill).unwrap();

    let run = test_type(dir.path(), ComponentType::Agents, &ScoreOptions::default()).unwrap();

    assert_eq!(run.summary.total_components, 2);
    assert!(run
        .results
        .iter()
        .all(|r| r.component_type == ComponentType::Agents));
    assert_eq!(run.results[0].component_name, "code-reviewer");
}

#[test]
fn test_empty_root_has_zero_pass_rate() {
    let dir = tempdir().unwrap();

    let run = test_all(dir.path(), &ScoreOptions::default()).unwrap();

    assert_eq!(run.summary.total_components, 0);
    assert_eq!(run.summary.pass_rate, 0.0);
    assert_eq!(run.poor_components().count(), 0);
}

#[test]
fn test_missing_root_is_error() {
    let dir = tempdir().unwrap();

    let err = test_all(&dir.path().join("nope"), &ScoreOptions::default()).unwrap_err();

    assert!(matches!(err, QaError::RootNotFound(_)));
}

#[test]
fn test_invalid_config_lowers_integration() {
    let dir = tempdir().unwrap();
    write_agent(dir.path(), "review", "code-reviewer");
    let component = dir.path().join("agents/review/code-reviewer");
    fs::write(component.join("agent.json"), r#"{"name":"code-reviewer"}"#).unwrap();

    let result = score_component(&component, ComponentType::Agents, &ScoreOptions::default());

    assert_eq!(result.checks.integration.outcome.score, 70.0);
    assert_eq!(result.checks.integration.conflicts.len(), 1);
    assert!(result.checks.performance.load_time_ms.is_none());
}
