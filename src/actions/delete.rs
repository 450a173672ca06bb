//! Verified permanent deletion of duplicate templates.
//!
//! # Overview
//!
//! A group is deleted through [`delete_group`], which first confirms that
//! the canonical is still on disk and is not itself a target. Each
//! duplicate is then checked against the size recorded at scan time before
//! `remove_file` runs, so a file edited after the scan survives.
//!
//! Failures are collected per file; the rest of the group is still
//! processed unless [`DeleteConfig::continue_on_error`] is off.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scanner::FileRecord;

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("file modified since scan: {path} (size {expected} -> {actual})")]
    Modified {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The kept copy of a group disappeared; its duplicates are left alone.
    #[error("canonical copy missing: {0}")]
    CanonicalMissing(PathBuf),

    /// The canonical was listed among the files to delete.
    #[error("refusing to delete the canonical copy {0}")]
    CanonicalTargeted(PathBuf),

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteConfig {
    /// Compare the current size against the scanned size before deleting.
    pub verify_size: bool,
    pub continue_on_error: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            verify_size: true,
            continue_on_error: true,
        }
    }
}

impl DeleteConfig {
    #[must_use]
    pub fn with_verify_size(mut self, verify: bool) -> Self {
        self.verify_size = verify;
        self
    }

    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// A file queued for deletion with the size it had when scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget {
    pub path: PathBuf,
    pub expected_size: u64,
}

impl From<&FileRecord> for DeleteTarget {
    fn from(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            expected_size: record.size,
        }
    }
}

impl DeleteTarget {
    /// Current size of the file, checked against the scan when `verify`.
    fn current_size(&self, verify: bool) -> Result<u64, DeleteError> {
        let actual = fs::metadata(&self.path)
            .map_err(|e| DeleteError::io(&self.path, e))?
            .len();
        if verify && actual != self.expected_size {
            return Err(DeleteError::Modified {
                path: self.path.clone(),
                expected: self.expected_size,
                actual,
            });
        }
        Ok(actual)
    }

    /// Delete the file and return the bytes freed.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Modified` or `Io`; the file is untouched in every case.
    pub fn remove(&self, config: &DeleteConfig) -> Result<u64, DeleteError> {
        let size = self.current_size(config.verify_size)?;
        fs::remove_file(&self.path).map_err(|e| DeleteError::io(&self.path, e))?;
        log::info!("Deleted {} ({} bytes)", self.path.display(), size);
        Ok(size)
    }
}

/// Outcome of deleting the duplicates of one group.
#[derive(Debug, Clone, Default)]
pub struct GroupDeletion {
    /// Deleted paths with their sizes, in target order
    pub removed: Vec<(PathBuf, u64)>,
    pub failures: Vec<(PathBuf, String)>,
    pub bytes_freed: u64,
}

impl GroupDeletion {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete every target, keeping going past failures when configured to.
#[must_use]
pub fn delete_batch(targets: &[DeleteTarget], config: &DeleteConfig) -> GroupDeletion {
    let mut outcome = GroupDeletion::default();

    for target in targets {
        match target.remove(config) {
            Ok(size) => {
                outcome.bytes_freed += size;
                outcome.removed.push((target.path.clone(), size));
            }
            Err(e) => {
                log::warn!("Not deleting {}: {}", target.path.display(), e);
                outcome.failures.push((target.path.clone(), e.to_string()));
                if !config.continue_on_error {
                    break;
                }
            }
        }
    }
    outcome
}

/// Delete the duplicates of a group while its canonical stays.
///
/// # Errors
///
/// `CanonicalMissing` when the canonical is gone and `CanonicalTargeted`
/// when it appears among the duplicates; nothing is deleted in either case.
pub fn delete_group(
    canonical: &FileRecord,
    duplicates: &[FileRecord],
    config: &DeleteConfig,
) -> Result<GroupDeletion, DeleteError> {
    if duplicates.iter().any(|d| d.path == canonical.path) {
        return Err(DeleteError::CanonicalTargeted(canonical.path.clone()));
    }
    if !canonical.path.is_file() {
        return Err(DeleteError::CanonicalMissing(canonical.path.clone()));
    }

    let targets: Vec<DeleteTarget> = duplicates.iter().map(DeleteTarget::from).collect();
    Ok(delete_batch(&targets, config))
}
