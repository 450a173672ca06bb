//! Empty-directory pruning.
//!
//! Directories are visited contents-first so a parent is only checked after
//! all of its children were handled. The root itself is never removed, and
//! subtrees the scan skips (ignore patterns, excluded paths) are left alone.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::scanner::{PathFilter, WalkerConfig};

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResult {
    /// Removed directories, deepest first
    pub removed: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl CleanResult {
    #[must_use]
    pub fn count(&self) -> usize {
        self.removed.len()
    }
}

/// Remove every visited directory under `root` that holds no files, bottom-up.
#[must_use]
pub fn clean(root: &Path, walker: &WalkerConfig) -> CleanResult {
    let mut result = CleanResult::default();
    let filter = PathFilter::new(root, walker);

    let entries = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !filter.is_skipped(e.path(), e.file_type().is_dir()));

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                result.errors.push(err.to_string());
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let is_empty = match fs::read_dir(path) {
            Ok(mut entries) => entries.next().is_none(),
            Err(err) => {
                result.errors.push(format!("{}: {}", path.display(), err));
                continue;
            }
        };
        if !is_empty {
            continue;
        }
        match fs::remove_dir(path) {
            Ok(()) => {
                log::debug!("Removed empty directory {}", path.display());
                result.removed.push(path.to_path_buf());
            }
            Err(err) => result.errors.push(format!("{}: {}", path.display(), err)),
        }
    }

    if !result.removed.is_empty() {
        log::info!("Removed {} empty director(ies)", result.removed.len());
    }
    result
}

/// Directories under `root` that would be empty once `removed` files are
/// gone. Read-only.
#[must_use]
pub fn prunable_after_removal(
    root: &Path,
    removed: &HashSet<PathBuf>,
    walker: &WalkerConfig,
) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut occupied: HashSet<PathBuf> = HashSet::new();
    let filter = PathFilter::new(root, walker);

    let entries = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !filter.is_skipped(e.path(), e.file_type().is_dir()));

    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
            continue;
        }
        if removed.contains(entry.path()) {
            continue;
        }
        let mut parent = entry.path().parent();
        while let Some(dir) = parent {
            if dir == root || !occupied.insert(dir.to_path_buf()) {
                break;
            }
            parent = dir.parent();
        }
    }

    dirs.retain(|d| !occupied.contains(d));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_nested_empty_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join("keep/file.md"), "# x").unwrap();

        let result = clean(root, &WalkerConfig::default());

        assert_eq!(result.count(), 3);
        assert_eq!(result.removed[0], root.join("a/b/c"));
        assert!(!root.join("a").exists());
        assert!(root.join("keep/file.md").exists());
        assert!(root.exists());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_clean_keeps_empty_root() {
        let dir = TempDir::new().unwrap();
        let result = clean(dir.path(), &WalkerConfig::default());
        assert_eq!(result.count(), 0);
        assert!(dir.path().exists());
    }

    #[test]
    fn test_prunable_after_removal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("x/y")).unwrap();
        fs::create_dir_all(root.join("z")).unwrap();
        fs::write(root.join("x/y/dup.json"), "{}").unwrap();
        fs::write(root.join("z/keep.json"), "{}").unwrap();

        let removed: HashSet<PathBuf> = [root.join("x/y/dup.json")].into_iter().collect();
        let prunable = prunable_after_removal(root, &removed, &WalkerConfig::default());

        assert_eq!(prunable, vec![root.join("x"), root.join("x/y")]);
        assert!(root.join("x/y/dup.json").exists());
    }

    #[test]
    fn test_prunable_counts_already_empty_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        let prunable = prunable_after_removal(dir.path(), &HashSet::new(), &WalkerConfig::default());
        assert_eq!(prunable, vec![dir.path().join("empty")]);
    }

    fn git_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git/refs/heads")).unwrap();
        fs::create_dir_all(root.join(".git/refs/tags")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::create_dir_all(root.join("agents/core/empty")).unwrap();
        fs::write(root.join("agents/core/a.md"), "# a").unwrap();
        dir
    }

    #[test]
    fn test_clean_leaves_ignored_dirs() {
        let dir = git_fixture();
        let root = dir.path();
        let walker = WalkerConfig::new(false, vec![".git".to_string()]);

        let result = clean(root, &walker);

        assert_eq!(result.removed, vec![root.join("agents/core/empty")]);
        assert!(root.join(".git/refs/heads").is_dir());
        assert!(root.join(".git/refs/tags").is_dir());
    }

    #[test]
    fn test_clean_leaves_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".templopt/backups")).unwrap();
        let walker = WalkerConfig::default().with_excluded(root.join("x/../.templopt"));
        fs::create_dir_all(root.join("x")).unwrap();

        let result = clean(root, &walker);

        assert_eq!(result.removed, vec![root.join("x")]);
        assert!(root.join(".templopt/backups").is_dir());
    }

    #[test]
    fn test_prunable_skips_ignored_dirs() {
        let dir = git_fixture();
        let walker = WalkerConfig::new(false, vec![".git".to_string()]);

        let prunable = prunable_after_removal(dir.path(), &HashSet::new(), &walker);

        assert_eq!(
            prunable,
            vec![dir.path().join("agents/core/empty")]
        );
    }
}
