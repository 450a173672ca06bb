use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use templopt::cli::{Cli, Commands, PipelineAction, PipelineArgs};
use templopt::error::ExitCode;
use templopt::orchestrator::PhaseKind;
use templopt::output::{read_report, OptimizationReport, OPTIMIZATION_REPORT_FILE};
use tempfile::{tempdir, TempDir};

/// Temp workspace with a config file pointing reports and backups into it.
struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        let config = dir.path().join("templopt.toml");
        fs::write(
            &config,
            format!(
                "report_dir = '{}'\nbackup_dir = '{}'\n",
                dir.path().join("reports").display(),
                dir.path().join("backups").display()
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("templates")
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<ExitCode> {
        let root = self.root();
        let mut argv = vec![
            "templopt",
            "--quiet",
            "--no-color",
            "--config",
            self.config.to_str().unwrap(),
            "--root",
            root.to_str().unwrap(),
        ];
        argv.extend_from_slice(args);
        templopt::run_app(Cli::try_parse_from(argv).unwrap())
    }

    fn reports(&self) -> PathBuf {
        self.dir.path().join("reports")
    }
}

fn exists(path: &Path) -> bool {
    path.exists()
}

#[test]
fn test_scan_without_duplicates() {
    let ws = Workspace::new();
    ws.write("settings/core/base/A.json", "{}");
    ws.write("settings/core/base/C.json", r#"{"x":1}"#);

    let code = ws.run(&["dedupe", "scan"]).unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_scan_with_duplicates_as_json() {
    let ws = Workspace::new();
    ws.write("settings/core/base/A.json", "{}");
    ws.write("settings/core/base/B.json", "{}");

    let code = ws.run(&["dedupe", "scan", "--output", "json"]).unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_execute_requires_confirmation() {
    let ws = Workspace::new();
    ws.write("settings/core/base/A.json", "{}");
    ws.write("settings/core/base/B.json", "{}");

    let err = ws.run(&["dedupe", "execute"]).unwrap_err();

    assert!(err.to_string().contains("--yes"));
    assert!(exists(&ws.root().join("settings/core/base/B.json")));
}

#[test]
fn test_execute_writes_report_and_backup() {
    let ws = Workspace::new();
    ws.write("settings/core/base/A.json", "{}");
    ws.write("settings/core/base/B.json", "{}");
    ws.write("settings/core/base/C.json", r#"{"x":1}"#);

    let code = ws.run(&["dedupe", "execute", "--yes"]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(!exists(&ws.root().join("settings/core/base/B.json")));
    let report: OptimizationReport =
        read_report(&ws.reports().join(OPTIMIZATION_REPORT_FILE)).unwrap();
    let elimination = report.elimination_results.unwrap();
    assert_eq!(elimination.files_removed.len(), 1);
    assert!(elimination.backup_location.unwrap().starts_with(ws.dir.path().join("backups")));
}

#[test]
fn test_preview_changes_nothing() {
    let ws = Workspace::new();
    ws.write("agents/a/x/notes.txt", "same");
    ws.write("agents/a/y/notes.txt", "same");

    let code = ws.run(&["dedupe", "preview"]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(exists(&ws.root().join("agents/a/y/notes.txt")));
    assert!(!exists(&ws.dir.path().join("backups")));
}

#[test]
fn test_dashboards_without_reports() {
    let ws = Workspace::new();

    assert_eq!(ws.run(&["dedupe"]).unwrap(), ExitCode::Success);
    assert_eq!(ws.run(&["qa"]).unwrap(), ExitCode::Success);
    assert_eq!(ws.run(&["pipeline", "dashboard"]).unwrap(), ExitCode::Success);
}

#[test]
fn test_validate_naming_exit_codes() {
    let ws = Workspace::new();

    assert_eq!(
        ws.run(&["qa", "validate-naming", "code-reviewer"]).unwrap(),
        ExitCode::Success
    );
    assert_eq!(
        ws.run(&["qa", "validate-naming", "Bad_Name"]).unwrap(),
        ExitCode::PartialSuccess
    );
}

#[test]
fn test_validate_structure_reports_missing_files() {
    let ws = Workspace::new();
    ws.write("skills/foo/bar/skill.json", r#"{"name":"bar","description":"d"}"#);
    let component = ws.root().join("skills/foo/bar");

    let code = ws
        .run(&[
            "qa",
            "validate-structure",
            component.to_str().unwrap(),
            "--type",
            "skills",
        ])
        .unwrap();

    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_missing_root_is_error() {
    let ws = Workspace::new();
    fs::remove_dir(ws.root()).unwrap();

    assert!(ws.run(&["dedupe", "scan"]).is_err());
    assert!(ws.run(&["qa", "test-all"]).is_err());
}

#[test]
fn test_pipeline_abort_exit_code() {
    let ws = Workspace::new();
    fs::remove_dir(ws.root()).unwrap();

    let code = ws.run(&["pipeline", "analysis"]).unwrap();

    assert_eq!(code, ExitCode::Aborted);
    assert!(ws.reports().join("execution-report.json").is_file());
}

#[test]
fn test_missing_config_file_is_error() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("missing.toml");
    let cli = Cli::try_parse_from([
        "templopt",
        "--quiet",
        "--config",
        missing.to_str().unwrap(),
        "qa",
    ])
    .unwrap();

    let err = templopt::run_app(cli).unwrap_err();

    assert!(format!("{:#}", err).contains("config file not found"));
}

#[test]
fn test_custom_phase_aliases() {
    let cli = Cli::try_parse_from([
        "templopt",
        "pipeline",
        "custom",
        "--phases",
        "analysis,elimination,validation",
    ])
    .unwrap();

    match cli.command {
        Commands::Pipeline(PipelineArgs {
            action: Some(PipelineAction::Custom(args)),
        }) => assert_eq!(
            args.phases,
            vec![
                PhaseKind::Analysis,
                PhaseKind::Elimination,
                PhaseKind::FinalValidation
            ]
        ),
        _ => panic!("Expected pipeline custom"),
    }
}
