use std::fs;
use std::path::{Path, PathBuf};

use templopt::actions::{
    apply, build_plan, clean, execute, preview, Backup, EliminationError, EliminationMode,
    ExecuteOptions,
};
use templopt::duplicates::group_duplicates;
use templopt::scanner::{scan, WalkerConfig};
use tempfile::{tempdir, TempDir};

fn settings_fixture() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().join("templates");
    let leaf = root.join("settings/core/base");
    fs::create_dir_all(&leaf).unwrap();
    fs::write(leaf.join("A.json"), "{}").unwrap();
    fs::write(leaf.join("B.json"), "{}").unwrap();
    fs::write(leaf.join("C.json"), r#"{"x":1}"#).unwrap();
    (dir, root, leaf)
}

fn plan_for(root: &Path, mode: EliminationMode) -> templopt::actions::EliminationPlan {
    let outcome = scan(root, &WalkerConfig::default()).unwrap();
    let (groups, _) = group_duplicates(&outcome.records);
    build_plan(groups, mode)
}

fn tree_listing(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect();
    files.sort();
    files
}

#[test]
fn test_preview_reports_without_mutating() {
    let (_dir, root, leaf) = settings_fixture();
    let before = tree_listing(&root);
    let plan = plan_for(&root, EliminationMode::Preview);

    let result = preview(&plan, &root, &WalkerConfig::default());

    assert_eq!(result.mode, EliminationMode::Preview);
    assert_eq!(result.files_removed.len(), 1);
    assert_eq!(result.files_removed[0].path, leaf.join("B.json"));
    assert_eq!(result.files_removed[0].kept_as, leaf.join("A.json"));
    assert_eq!(result.space_reclaimed, 2);
    assert_eq!(result.directories_cleaned, 0);
    assert!(result.backup_location.is_none());
    assert_eq!(tree_listing(&root), before);
}

#[test]
fn test_execute_with_backup_keeps_canonical() {
    let (dir, root, leaf) = settings_fixture();
    let backups = dir.path().join("backups");
    let plan = plan_for(&root, EliminationMode::Execute);

    let result = execute(&plan, &root, &ExecuteOptions::new(&backups)).unwrap();

    assert!(leaf.join("A.json").exists());
    assert!(!leaf.join("B.json").exists());
    assert!(leaf.join("C.json").exists());
    assert_eq!(result.space_reclaimed, 2);
    assert!(result.all_succeeded());

    let location = result.backup_location.unwrap();
    assert!(location.starts_with(&backups));
    let backup = Backup::open(&location).unwrap();
    assert!(backup.verify().is_empty());
    assert_eq!(
        fs::read_to_string(location.join("settings/core/base/B.json")).unwrap(),
        "{}"
    );
}

#[test]
fn test_execute_rejects_preview_plan() {
    let (dir, root, _leaf) = settings_fixture();
    let plan = plan_for(&root, EliminationMode::Preview);

    let err = execute(&plan, &root, &ExecuteOptions::new(dir.path().join("b"))).unwrap_err();

    assert!(matches!(err, EliminationError::PreviewPlan));
}

#[test]
fn test_apply_follows_plan_mode() {
    let (dir, root, leaf) = settings_fixture();
    let options = ExecuteOptions::new(dir.path().join("backups"));

    let previewed = apply(&plan_for(&root, EliminationMode::Preview), &root, &options).unwrap();
    assert!(leaf.join("B.json").exists());
    assert_eq!(previewed.files_removed.len(), 1);

    let executed = apply(&plan_for(&root, EliminationMode::Execute), &root, &options).unwrap();
    assert!(!leaf.join("B.json").exists());
    assert_eq!(executed.mode, EliminationMode::Execute);
}

#[test]
fn test_backup_failure_deletes_nothing() {
    let (dir, root, leaf) = settings_fixture();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let plan = plan_for(&root, EliminationMode::Execute);

    let err = execute(&plan, &root, &ExecuteOptions::new(blocker.join("backups"))).unwrap_err();

    assert!(matches!(err, EliminationError::BackupFailed(_)));
    assert!(leaf.join("A.json").exists());
    assert!(leaf.join("B.json").exists());
}

#[test]
fn test_missing_canonical_leaves_group_untouched() {
    let (dir, root, leaf) = settings_fixture();
    let plan = plan_for(&root, EliminationMode::Execute);
    fs::remove_file(leaf.join("A.json")).unwrap();

    let result = execute(
        &plan,
        &root,
        &ExecuteOptions::new(dir.path().join("backups")).with_backup(false),
    )
    .unwrap();

    assert!(leaf.join("B.json").exists());
    assert!(result.files_removed.is_empty());
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_modified_duplicate_is_not_deleted() {
    let (dir, root, leaf) = settings_fixture();
    let plan = plan_for(&root, EliminationMode::Execute);
    fs::write(leaf.join("B.json"), "{ }").unwrap();

    let result = execute(
        &plan,
        &root,
        &ExecuteOptions::new(dir.path().join("backups")).with_backup(false),
    )
    .unwrap();

    assert!(leaf.join("B.json").exists());
    assert!(result.files_removed.is_empty());
    assert!(!result.all_succeeded());
}

#[test]
fn test_execute_prunes_emptied_directories() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("templates");
    fs::create_dir_all(root.join("agents/a")).unwrap();
    fs::create_dir_all(root.join("agents/b/deep")).unwrap();
    fs::write(root.join("agents/a/notes.txt"), "same").unwrap();
    fs::write(root.join("agents/b/deep/notes.txt"), "same").unwrap();
    let plan = plan_for(&root, EliminationMode::Execute);

    let result = execute(
        &plan,
        &root,
        &ExecuteOptions::new(dir.path().join("backups")).with_backup(false),
    )
    .unwrap();

    assert_eq!(result.directories_cleaned, 2);
    assert!(!root.join("agents/b").exists());
    assert!(root.join("agents/a/notes.txt").exists());
}

#[test]
fn test_clean_keeps_root_and_nonempty_directories() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
    fs::create_dir_all(dir.path().join("full")).unwrap();
    fs::write(dir.path().join("full/file.md"), "# x").unwrap();

    let result = clean(dir.path(), &WalkerConfig::default());

    assert_eq!(result.count(), 2);
    assert!(dir.path().exists());
    assert!(dir.path().join("full/file.md").exists());
    assert!(!dir.path().join("empty").exists());
}

#[test]
fn test_empty_plan_takes_no_backup() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("templates");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("only.json"), "{}").unwrap();
    let backups = dir.path().join("backups");
    let plan = plan_for(&root, EliminationMode::Execute);

    let result = execute(&plan, &root, &ExecuteOptions::new(&backups)).unwrap();

    assert!(result.files_removed.is_empty());
    assert!(result.backup_location.is_none());
    assert!(!backups.exists());
}

#[test]
fn test_execute_prunes_only_scanned_directories() {
    let (dir, root, leaf) = settings_fixture();
    fs::create_dir_all(root.join(".git/refs/heads")).unwrap();
    fs::create_dir_all(root.join(".git/refs/tags")).unwrap();
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
    let walker = WalkerConfig::new(false, vec![".git".to_string()]);
    let outcome = scan(&root, &walker).unwrap();
    let (groups, _) = group_duplicates(&outcome.records);
    let plan = build_plan(groups, EliminationMode::Execute);
    let options = ExecuteOptions::new(dir.path().join("backups"))
        .with_backup(false)
        .with_walker(walker.clone());

    let previewed = preview(&plan, &root, &walker);
    let result = execute(&plan, &root, &options).unwrap();

    assert_eq!(previewed.directories_cleaned, 0);
    assert_eq!(result.directories_cleaned, 0);
    assert!(!leaf.join("B.json").exists());
    assert!(root.join(".git/refs/heads").is_dir());
    assert!(root.join(".git/refs/tags").is_dir());
}
