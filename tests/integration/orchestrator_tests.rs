use std::fs;
use std::path::{Path, PathBuf};

use templopt::config::Config;
use templopt::orchestrator::{
    OrchestrationReport, Orchestrator, PhaseKind, PhaseStatus, RunMode, RunState,
};
use templopt::output::read_report;
use tempfile::{tempdir, TempDir};

struct Workspace {
    _dir: TempDir,
    root: PathBuf,
    config: Config,
}

fn complete_component(root: &Path, name: &str) {
    let dir = root.join("agents/review").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("agent.json"),
        format!(r#"{{"name":"{}","description":"Reviews code","timeout":30}}"#, name),
    )
    .unwrap();
    fs::write(
        dir.join("implementation.py"),
        format!("def {}():\n    return 0\n", name.replace('-', "_")),
    )
    .unwrap();
    fs::write(dir.join("README.md"), format!("# {}\n", name)).unwrap();
    fs::write(dir.join("notes.txt"), "shared notes").unwrap();
}

fn workspace() -> Workspace {
    let dir = tempdir().unwrap();
    let root = dir.path().join("templates");
    complete_component(&root, "code-reviewer");
    complete_component(&root, "test-writer");

    let mut config = Config::default();
    config.templates_root = root.clone();
    config.report_dir = dir.path().join("reports");
    config.backup_dir = dir.path().join("backups");
    Workspace {
        _dir: dir,
        root,
        config,
    }
}

fn status_of(report: &OrchestrationReport, kind: PhaseKind) -> PhaseStatus {
    report
        .phase_results
        .iter()
        .find(|p| p.name == kind)
        .map(|p| p.status)
        .unwrap()
}

#[test]
fn test_noncritical_elimination_failure_continues() {
    let mut ws = workspace();
    let blocker = ws.root.parent().unwrap().join("blocker");
    fs::write(&blocker, "regular file").unwrap();
    ws.config.pipeline.backup_checkpoints = false;
    ws.config.backup_dir = blocker.join("backups");

    let mut orchestrator = Orchestrator::new(ws.config.clone(), &ws.root);
    let report = orchestrator.run(&RunMode::Full);

    assert_eq!(status_of(&report, PhaseKind::Elimination), PhaseStatus::Failed);
    assert_eq!(status_of(&report, PhaseKind::Analysis), PhaseStatus::Completed);
    assert_eq!(status_of(&report, PhaseKind::Installation), PhaseStatus::Completed);
    assert_eq!(
        status_of(&report, PhaseKind::QualityAssurance),
        PhaseStatus::Completed
    );
    assert_eq!(
        status_of(&report, PhaseKind::FinalValidation),
        PhaseStatus::Completed
    );
    assert_eq!(report.execution_summary.overall_status, RunState::Completed);
    assert_eq!(report.execution_summary.success_rate, 80.0);
    assert_eq!(orchestrator.state(), RunState::Completed);
    // The failed backup must leave both copies in place.
    assert!(ws.root.join("agents/review/code-reviewer/notes.txt").exists());
    assert!(ws.root.join("agents/review/test-writer/notes.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_read_only_backup_dir_fails_elimination_only() {
    use std::os::unix::fs::PermissionsExt;

    let mut ws = workspace();
    let locked = ws.root.parent().unwrap().join("locked");
    fs::create_dir_all(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
    if fs::create_dir(locked.join("writable-check")).is_ok() {
        // Permissions are not enforced for this user.
        return;
    }
    ws.config.pipeline.backup_checkpoints = false;
    ws.config.backup_dir = locked.join("backups");

    let report = Orchestrator::new(ws.config.clone(), &ws.root).run(&RunMode::Full);

    assert_eq!(status_of(&report, PhaseKind::Elimination), PhaseStatus::Failed);
    assert_eq!(report.execution_summary.overall_status, RunState::Completed);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_undeletable_duplicate_fails_elimination_with_checkpoints() {
    use std::os::unix::fs::PermissionsExt;

    let ws = workspace();
    assert!(ws.config.pipeline.backup_checkpoints);
    fs::write(
        ws.root.join("agents/review/code-reviewer/style.txt"),
        "shared style guide",
    )
    .unwrap();
    let locked = ws.root.join("locked");
    fs::create_dir_all(&locked).unwrap();
    fs::write(locked.join("style.txt"), "shared style guide").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
    if fs::create_dir(locked.join("writable-check")).is_ok() {
        // Permissions are not enforced for this user.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = Orchestrator::new(ws.config.clone(), &ws.root).run(&RunMode::Full);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(status_of(&report, PhaseKind::Elimination), PhaseStatus::Failed);
    let elimination = report
        .phase_results
        .iter()
        .find(|p| p.name == PhaseKind::Elimination)
        .unwrap();
    assert!(elimination
        .errors
        .iter()
        .any(|e| e.contains("locked/style.txt")));
    assert!(locked.join("style.txt").exists());
    assert!(!ws.root.join("agents/review/test-writer/notes.txt").exists());
    assert!(ws.root.join("agents/review/code-reviewer/notes.txt").exists());
    assert_eq!(report.statistics.files_removed, 1);
    assert_eq!(status_of(&report, PhaseKind::Installation), PhaseStatus::Completed);
    assert_eq!(
        status_of(&report, PhaseKind::QualityAssurance),
        PhaseStatus::Completed
    );
    assert_eq!(
        status_of(&report, PhaseKind::FinalValidation),
        PhaseStatus::Completed
    );
    assert_eq!(report.execution_summary.overall_status, RunState::Completed);
}

#[test]
fn test_full_run_persists_execution_report() {
    let ws = workspace();

    let report = Orchestrator::new(ws.config.clone(), &ws.root).run(&RunMode::Full);

    assert_eq!(report.execution_summary.overall_status, RunState::Completed);
    assert_eq!(report.statistics.files_removed, 1);
    assert_eq!(report.statistics.checkpoints, 5);
    let saved: OrchestrationReport =
        read_report(&OrchestrationReport::path_in(&ws.config.report_dir)).unwrap();
    assert_eq!(saved.execution_summary.mode, "full");
    assert_eq!(saved.execution_summary.completed_phases, 5);
    assert_eq!(saved.statistics, report.statistics);
    assert_eq!(saved.phase_results.len(), 5);
    assert!(ws.config.report_dir.join("duplicate-database.json").is_file());
    assert!(ws.config.report_dir.join("qa-report.json").is_file());
}

#[test]
fn test_phase_order_is_fixed() {
    let ws = workspace();
    let mode = RunMode::Custom(vec![PhaseKind::FinalValidation, PhaseKind::Analysis]);

    let report = Orchestrator::new(ws.config.clone(), &ws.root)
        .with_dry_run(true)
        .run(&mode);

    let names: Vec<PhaseKind> = report.phase_results.iter().map(|p| p.name).collect();
    assert_eq!(names, vec![PhaseKind::Analysis, PhaseKind::FinalValidation]);
}

#[test]
fn test_abort_skips_every_later_phase() {
    let ws = workspace();
    let missing = ws.root.join("does-not-exist");

    let report = Orchestrator::new(ws.config.clone(), &missing).run(&RunMode::Full);

    assert!(report.is_aborted());
    assert_eq!(report.execution_summary.aborted_at, Some(PhaseKind::Analysis));
    assert_eq!(report.execution_summary.skipped_phases, 4);
    assert!(report.phase_results[1..]
        .iter()
        .all(|p| p.status == PhaseStatus::Skipped));
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.contains("aborted")));
}

#[test]
fn test_dry_run_leaves_tree_untouched() {
    let ws = workspace();

    let report = Orchestrator::new(ws.config.clone(), &ws.root)
        .with_dry_run(true)
        .run(&RunMode::Full);

    assert!(report.execution_summary.dry_run);
    assert_eq!(report.statistics.checkpoints, 0);
    assert_eq!(report.statistics.files_removed, 1);
    assert!(ws.root.join("agents/review/test-writer/notes.txt").exists());
    assert!(!ws.config.backup_dir.exists());
}

#[test]
fn test_qa_mode_with_low_pass_rate_fails_noncritical() {
    let mut ws = workspace();
    ws.config.qa.min_pass_rate = 100.0;
    let broken = ws.root.join("agents/review/bad");
    fs::create_dir_all(&broken).unwrap();

    let report = Orchestrator::new(ws.config.clone(), &ws.root).run(&RunMode::Qa);

    assert_eq!(
        status_of(&report, PhaseKind::QualityAssurance),
        PhaseStatus::Failed
    );
    // Final validation is critical and the empty component is incomplete.
    assert_eq!(
        status_of(&report, PhaseKind::FinalValidation),
        PhaseStatus::Failed
    );
    assert_eq!(report.execution_summary.overall_status, RunState::Aborted);
    assert_eq!(report.statistics.poor_components, 1);
}
