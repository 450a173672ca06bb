//! Deterministic directory walker.
//!
//! # Overview
//!
//! The [`Walker`] visits every regular file under a root depth-first.
//! Within a directory, subdirectories come before files and each kind is
//! ordered lexicographically by file name. Canonical selection in duplicate
//! groups depends on this order, so the walk is single-threaded and sorted.
//!
//! # Features
//!
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Explicit excluded path prefixes (engine backups and reports)
//! - Configurable symlink following
//! - Errors are yielded, never raised, so one bad entry cannot stop a walk
//!
//! # Example
//!
//! ```no_run
//! use templopt::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("templates"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{FileEntry, ScanError, WalkerConfig};

/// Skip rules shared by every walk over a templates tree.
///
/// Excluded prefixes are compared in absolute form, so `--root .` and a
/// relative `backup_dir` still match. Ignore patterns apply to the path
/// relative to the root.
#[derive(Debug)]
pub struct PathFilter {
    root: PathBuf,
    anchored_root: PathBuf,
    gitignore: Option<Gitignore>,
    excluded: Vec<PathBuf>,
}

impl PathFilter {
    #[must_use]
    pub fn new(root: &Path, config: &WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            anchored_root: anchor(root),
            gitignore: build_gitignore(root, &config.ignore_patterns),
            excluded: config.exclude_paths.iter().map(|p| anchor(p)).collect(),
        }
    }

    /// Whether `path`, yielded by a walk of the root, must not be visited.
    #[must_use]
    pub fn is_skipped(&self, path: &Path, is_dir: bool) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }

        let anchored = self.anchored_root.join(relative);
        if self.excluded.iter().any(|excluded| anchored.starts_with(excluded)) {
            return true;
        }

        let Some(gi) = &self.gitignore else {
            return false;
        };
        let path_str = relative.to_string_lossy();
        let normalized = if cfg!(windows) {
            path_str.replace('\\', "/")
        } else {
            path_str.into_owned()
        };
        gi.matched(normalized, is_dir).is_ignore()
    }
}

/// Absolute form of `path` for prefix comparison.
fn anchor(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn build_gitignore(root: &Path, patterns: &[String]) -> Option<Gitignore> {
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        if let Err(e) = builder.add_line(None, pattern) {
            log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
        }
    }

    match builder.build() {
        Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Failed to build ignore patterns: {}", e);
            None
        }
    }
}

/// Directory walker for deterministic file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Walk the directory tree, yielding file entries in traversal order.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let filter = PathFilter::new(&self.root, &self.config);

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by(traversal_order);

        walk_dir
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0 || !filter.is_skipped(entry.path(), entry.file_type().is_dir())
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => self.process_entry(entry),
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(self.walk_error(path, e)))
                }
            })
    }

    /// Turn a walked entry into a FileEntry if it is a regular file.
    fn process_entry(&self, entry: DirEntry) -> Option<Result<FileEntry, ScanError>> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }
        if file_type.is_symlink() && !self.config.follow_symlinks {
            log::trace!("Skipping symlink: {}", entry.path().display());
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                let path = entry.path().to_path_buf();
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("metadata unavailable"));
                return Some(Err(unreadable(&path, io)));
            }
        };

        if !metadata.is_file() {
            return None;
        }

        let path = entry.into_path();
        let relative_path = path
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Some(Ok(FileEntry::new(
            path,
            relative_path,
            metadata.len(),
            modified,
        )))
    }

    fn walk_error(&self, path: PathBuf, error: walkdir::Error) -> ScanError {
        if error.loop_ancestor().is_some() {
            log::warn!("Not following symlink loop at {}", path.display());
            return ScanError::SymlinkLoop(path);
        }
        match error.into_io_error() {
            Some(io) => unreadable(&path, io),
            None => ScanError::SymlinkLoop(path),
        }
    }
}

/// Directories before files, then lexicographic by file name.
fn traversal_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir
        .cmp(&a_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn unreadable(path: &Path, source: std::io::Error) -> ScanError {
    if source.kind() == std::io::ErrorKind::NotFound {
        log::debug!("{} vanished during the walk", path.display());
    } else {
        log::warn!("Cannot read {}: {}", path.display(), source);
    }
    ScanError::Unreadable {
        path: path.to_path_buf(),
        source,
    }
}
