//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Deterministic depth-first directory walking using walkdir
//! - Content fingerprinting with BLAKE3 (full or sampled)
//! - Gitignore-style exclusion of engine artifacts
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`fingerprint`]: Content identity for a single file
//!
//! # Example
//!
//! ```no_run
//! use templopt::scanner::{scan, WalkerConfig};
//! use std::path::Path;
//!
//! let outcome = scan(Path::new("templates"), &WalkerConfig::default()).unwrap();
//! for record in &outcome.records {
//!     println!("{}: {}", record.relative_path.display(), record.fingerprint);
//! }
//! for warning in &outcome.warnings {
//!     eprintln!("Warning: {}", warning);
//! }
//! ```

pub mod fingerprint;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::progress::ProgressCallback;

// Re-export main types
pub use fingerprint::{fingerprint, Fingerprint, SAMPLE_WINDOW, SAMPLING_THRESHOLD};
pub use walker::{PathFilter, Walker};

/// Metadata for a discovered file, before fingerprinting.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute (or root-joined) path to the file
    pub path: PathBuf,
    /// Path relative to the scan root
    pub relative_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileEntry {
    /// Create a new FileEntry.
    #[must_use]
    pub fn new(path: PathBuf, relative_path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            relative_path,
            size,
            modified,
        }
    }
}

/// A fingerprinted file produced by a scan.
///
/// Records are immutable value objects; the position of a record in the
/// scan output is its traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path to the file
    pub path: PathBuf,
    /// Path relative to the scan root
    pub relative_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
    /// Content identity
    pub fingerprint: Fingerprint,
}

impl FileRecord {
    /// Attach a fingerprint to a discovered file.
    #[must_use]
    pub fn from_entry(entry: FileEntry, fingerprint: Fingerprint) -> Self {
        Self {
            path: entry.path,
            relative_path: entry.relative_path,
            size: entry.size,
            last_modified: entry.modified.into(),
            fingerprint,
        }
    }

    /// Lowercased file extension, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }
}

/// Configuration for directory walking.
///
/// Controls filtering and symlink handling.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,

    /// Paths that are never descended into (backup and report directories).
    pub exclude_paths: Vec<PathBuf>,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(follow_symlinks: bool, ignore_patterns: Vec<String>) -> Self {
        Self {
            follow_symlinks,
            ignore_patterns,
            exclude_paths: Vec::new(),
        }
    }

    /// Add a path prefix that the walker must skip.
    #[must_use]
    pub fn with_excluded(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude_paths.push(path.into());
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("templates root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("templates root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// An entry below the root could not be listed or stat'ed.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symlink loop at {0}")]
    SymlinkLoop(PathBuf),

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

/// A file whose content could not be hashed.
#[derive(thiserror::Error, Debug)]
#[error("cannot fingerprint {path}: {source}")]
pub struct FingerprintError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FingerprintError {
    pub(crate) fn from_io(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> std::io::ErrorKind {
        self.source.kind()
    }
}

/// Result of scanning a directory tree.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// The scanned root
    pub root: PathBuf,
    /// Fingerprinted files, in traversal order
    pub records: Vec<FileRecord>,
    /// Files or directories that were skipped, with the reason
    pub warnings: Vec<String>,
}

impl ScanOutcome {
    /// Total size of all scanned files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

/// Scan a tree: walk it in traversal order and fingerprint every regular file.
///
/// Per-file failures never abort the scan; they are returned as warnings.
///
/// # Errors
///
/// Returns [`ScanError::RootMissing`] or [`ScanError::RootNotDirectory`] when
/// the root itself is unusable.
pub fn scan(root: &Path, config: &WalkerConfig) -> Result<ScanOutcome, ScanError> {
    scan_with_progress(root, config, None)
}

/// Same as [`scan`], reporting progress to an optional callback.
///
/// # Errors
///
/// See [`scan`].
pub fn scan_with_progress(
    root: &Path,
    config: &WalkerConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<ScanOutcome, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootMissing(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::RootNotDirectory(root.to_path_buf()));
    }

    let mut warnings = Vec::new();
    let mut entries = Vec::new();

    if let Some(cb) = &progress {
        cb.on_phase_start("walking", 0);
    }
    let walker = Walker::new(root, config.clone());
    for (idx, result) in walker.walk().enumerate() {
        match result {
            Ok(entry) => {
                if let Some(cb) = &progress {
                    cb.on_progress(idx + 1, &entry.relative_path.to_string_lossy());
                }
                entries.push(entry);
            }
            Err(e) => warnings.push(e.to_string()),
        }
    }
    if let Some(cb) = &progress {
        cb.on_phase_end("walking");
        cb.on_phase_start("fingerprint", entries.len());
    }

    // Indexed parallel collect keeps traversal order.
    let fingerprints: Vec<Result<Fingerprint, FingerprintError>> = entries
        .par_iter()
        .map(|entry| {
            let result = fingerprint(&entry.path);
            if let Some(cb) = &progress {
                cb.on_item_completed(entry.size);
            }
            result
        })
        .collect();

    let mut records = Vec::with_capacity(entries.len());
    for (entry, result) in entries.into_iter().zip(fingerprints) {
        match result {
            Ok(fp) => records.push(FileRecord::from_entry(entry, fp)),
            Err(e) => {
                log::warn!("Skipping unreadable file: {}", e);
                warnings.push(e.to_string());
            }
        }
    }
    if let Some(cb) = &progress {
        cb.on_phase_end("fingerprint");
    }

    log::info!(
        "Scanned {}: {} files, {} warning(s)",
        root.display(),
        records.len(),
        warnings.len()
    );

    Ok(ScanOutcome {
        root: root.to_path_buf(),
        records,
        warnings,
    })
}
