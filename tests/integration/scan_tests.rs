use std::fs;
use std::path::PathBuf;

use templopt::duplicates::{find_near_duplicates, group_duplicates, Classification};
use templopt::scanner::{fingerprint, scan, WalkerConfig, SAMPLE_WINDOW, SAMPLING_THRESHOLD};
use tempfile::tempdir;

#[test]
fn test_scenario_one_grouping() {
    let dir = tempdir().unwrap();
    let leaf = dir.path().join("settings/core/base");
    fs::create_dir_all(&leaf).unwrap();
    fs::write(leaf.join("A.json"), "{}").unwrap();
    fs::write(leaf.join("B.json"), "{}").unwrap();
    fs::write(leaf.join("C.json"), r#"{"x":1}"#).unwrap();

    let outcome = scan(dir.path(), &WalkerConfig::default()).unwrap();
    let (groups, stats) = group_duplicates(&outcome.records);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].canonical().path, leaf.join("A.json"));
    let duplicates: Vec<PathBuf> = groups[0].duplicates().iter().map(|r| r.path.clone()).collect();
    assert_eq!(duplicates, vec![leaf.join("B.json")]);
    assert!(groups[0].members().all(|r| r.path != leaf.join("C.json")));
    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.reclaimable_bytes, 2);
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let outcome = scan(dir.path(), &WalkerConfig::default()).unwrap();
    let (groups, stats) = group_duplicates(&outcome.records);

    assert!(groups.is_empty());
    assert_eq!(stats.total_files, 0);
}

#[test]
fn test_directories_before_files_order() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.md"), "same").unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("b/z.md"), "same").unwrap();

    let outcome = scan(dir.path(), &WalkerConfig::default()).unwrap();
    let (groups, _) = group_duplicates(&outcome.records);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].canonical().path, dir.path().join("b/z.md"));
}

#[test]
fn test_repeated_scans_are_identical() {
    let dir = tempdir().unwrap();
    for (i, name) in ["q", "c", "x", "a"].iter().enumerate() {
        let sub = dir.path().join(name);
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("one.txt"), "shared").unwrap();
        fs::write(sub.join("two.txt"), format!("unique {}", i)).unwrap();
    }

    let first = scan(dir.path(), &WalkerConfig::default()).unwrap();
    let second = scan(dir.path(), &WalkerConfig::default()).unwrap();
    let (g1, _) = group_duplicates(&first.records);
    let (g2, _) = group_duplicates(&second.records);

    let paths = |records: &[templopt::scanner::FileRecord]| -> Vec<(PathBuf, String)> {
        records
            .iter()
            .map(|r| (r.path.clone(), r.fingerprint.to_string()))
            .collect()
    };
    assert_eq!(paths(&first.records), paths(&second.records));
    assert_eq!(g1.len(), 1);
    assert_eq!(g1[0].canonical().path, g2[0].canonical().path);
    assert_eq!(g1[0].canonical().path, dir.path().join("a/one.txt"));
}

#[test]
fn test_ignore_patterns_and_exclusions() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::create_dir_all(dir.path().join("backups")).unwrap();
    fs::write(dir.path().join(".git/config"), "same").unwrap();
    fs::write(dir.path().join("backups/copy"), "same").unwrap();
    fs::write(dir.path().join("keep"), "same").unwrap();

    let config = WalkerConfig::new(false, vec![".git".to_string()])
        .with_excluded(dir.path().join("backups"));
    let outcome = scan(dir.path(), &config).unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].path, dir.path().join("keep"));
}

#[test]
fn test_small_identical_files_share_fingerprint() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    let content = vec![7u8; (SAMPLING_THRESHOLD - 1) as usize];
    fs::write(&a, &content).unwrap();
    fs::write(&b, &content).unwrap();

    let fa = fingerprint(&a).unwrap();
    assert_eq!(fa, fingerprint(&b).unwrap());
    assert!(!fa.is_sampled());
}

#[test]
fn test_large_files_are_sampled() {
    let dir = tempdir().unwrap();
    let len = SAMPLING_THRESHOLD as usize + 4096;
    let mut a = vec![0u8; len];
    let mut b = vec![0u8; len];
    // Differ outside every sampled window.
    let off = SAMPLE_WINDOW as usize + 10;
    a[off] = 1;
    b[off] = 2;
    fs::write(dir.path().join("a.bin"), &a).unwrap();
    fs::write(dir.path().join("b.bin"), &b).unwrap();

    let fa = fingerprint(&dir.path().join("a.bin")).unwrap();
    let fb = fingerprint(&dir.path().join("b.bin")).unwrap();

    assert!(fa.is_sampled());
    assert_eq!(fa, fb);
    assert!(fa.as_str().starts_with("sampled:"));
}

#[test]
fn test_near_duplicates_found_by_line_overlap() {
    let dir = tempdir().unwrap();
    let base: Vec<String> = (0..20).map(|i| format!("line {}", i)).collect();
    let mut edited = base.clone();
    edited[19] = "changed".to_string();
    fs::write(dir.path().join("a.md"), base.join("\n")).unwrap();
    fs::write(dir.path().join("b.md"), edited.join("\n")).unwrap();
    fs::write(dir.path().join("c.md"), "something else entirely").unwrap();

    let outcome = scan(dir.path(), &WalkerConfig::default()).unwrap();
    let (groups, _) = group_duplicates(&outcome.records);
    let edges = find_near_duplicates(&outcome.records, &groups, &["md".to_string()]);

    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].file_a, dir.path().join("a.md"));
    assert_eq!(edges[0].file_b, dir.path().join("b.md"));
    assert_eq!(edges[0].similarity_percent, 95.0);
    assert_eq!(edges[0].classification, Classification::NearDuplicate);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_becomes_warning() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let secret = dir.path().join("secret.json");
    fs::write(&secret, "{}").unwrap();
    fs::write(dir.path().join("open.json"), "{}").unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&secret).is_ok() {
        // Running with elevated privileges; permissions are not enforced.
        return;
    }

    let outcome = scan(dir.path(), &WalkerConfig::default()).unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.warnings.len(), 1);
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();
}
