//! Snapshot backups and scoped checkpoints.
//!
//! A backup is a plain directory under the configured backup root:
//!
//! ```text
//! <backup_dir>/<timestamp>-<label>/
//!     manifest.json
//!     <relative dir>/<file>
//! ```
//!
//! `manifest.json` lists every copied file with its size and SHA-256
//! digest so a snapshot can be checked before it is restored by hand.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

use crate::scanner::{PathFilter, WalkerConfig};

/// Manifest file name inside every snapshot.
pub const MANIFEST_FILE: &str = "manifest.json";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Errors raised while taking a snapshot.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to create backup directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a snapshot covers.
#[derive(Debug, Clone, Copy)]
pub enum BackupScope<'a> {
    /// Regular files directly inside each listed directory
    Directories(&'a [PathBuf]),
    /// Every regular file under the root that a scan with this config would visit
    Tree(&'a WalkerConfig),
}

/// One copied file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub relative_path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub created_at: DateTime<Utc>,
    pub label: String,
    pub source_root: PathBuf,
    pub files: Vec<ManifestEntry>,
}

impl BackupManifest {
    /// Total bytes held by the snapshot.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// A completed snapshot on disk.
#[derive(Debug, Clone)]
pub struct Backup {
    pub location: PathBuf,
    pub manifest: BackupManifest,
}

impl Backup {
    /// Load a snapshot from its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is missing or malformed.
    pub fn open(location: &Path) -> anyhow::Result<Self> {
        let path = location.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest = serde_json::from_str(&text)
            .with_context(|| format!("malformed manifest {}", path.display()))?;
        Ok(Self {
            location: location.to_path_buf(),
            manifest,
        })
    }

    /// Re-hash every copied file and return the ones that no longer match.
    #[must_use]
    pub fn verify(&self) -> Vec<PathBuf> {
        self.manifest
            .files
            .iter()
            .filter(|entry| {
                let copy = self.location.join(&entry.relative_path);
                match digest_file(&copy) {
                    Ok((size, digest)) => size != entry.size || digest != entry.sha256,
                    Err(_) => true,
                }
            })
            .map(|entry| entry.relative_path.clone())
            .collect()
    }
}

/// Copy the files covered by `scope` into a new snapshot directory.
///
/// # Errors
///
/// Any failure to read a source or write a copy fails the whole backup.
pub fn create_backup(
    root: &Path,
    scope: BackupScope<'_>,
    backup_dir: &Path,
    label: &str,
) -> Result<Backup, BackupError> {
    let created_at = Utc::now();
    let location = unique_location(backup_dir, &created_at, label);
    fs::create_dir_all(&location).map_err(|e| BackupError::CreateDir {
        path: location.clone(),
        source: e,
    })?;

    let sources = match scope {
        BackupScope::Directories(dirs) => files_in_directories(dirs)?,
        BackupScope::Tree(walker) => files_in_tree(root, walker),
    };

    let mut files = Vec::with_capacity(sources.len());
    for source in sources {
        let relative = relative_to(root, &source);
        let target = location.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let (size, sha256) = copy_with_digest(&source, &target).map_err(|e| BackupError::Copy {
            path: source.clone(),
            source: e,
        })?;
        files.push(ManifestEntry {
            relative_path: relative,
            size,
            sha256,
        });
    }

    let manifest = BackupManifest {
        created_at,
        label: label.to_string(),
        source_root: root.to_path_buf(),
        files,
    };
    let manifest_path = location.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&manifest_path, json).map_err(|e| BackupError::Manifest {
        path: manifest_path,
        source: e,
    })?;

    log::info!(
        "Backup '{}' written to {} ({} file(s), {} bytes)",
        label,
        location.display(),
        manifest.files.len(),
        manifest.total_size()
    );

    Ok(Backup { location, manifest })
}

/// Scoped snapshot guard.
///
/// The snapshot is taken by [`Checkpoint::acquire`] and is never removed by
/// the engine. Dropping the guard, on any exit path, logs where it lives.
#[derive(Debug)]
pub struct Checkpoint {
    label: String,
    backup: Backup,
}

impl Checkpoint {
    /// Take a snapshot before a mutating operation.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`BackupError`]; nothing was mutated yet.
    pub fn acquire(
        root: &Path,
        scope: BackupScope<'_>,
        backup_dir: &Path,
        label: &str,
    ) -> Result<Self, BackupError> {
        let backup = create_backup(root, scope, backup_dir, label)?;
        Ok(Self {
            label: label.to_string(),
            backup,
        })
    }

    #[must_use]
    pub fn location(&self) -> &Path {
        &self.backup.location
    }

    #[must_use]
    pub fn manifest(&self) -> &BackupManifest {
        &self.backup.manifest
    }

    /// Release the guard and hand back the snapshot location.
    #[must_use]
    pub fn retain(self) -> PathBuf {
        self.backup.location.clone()
    }
}

impl Drop for Checkpoint {
    fn drop(&mut self) {
        log::info!(
            "Checkpoint '{}' retained at {}",
            self.label,
            self.backup.location.display()
        );
    }
}

fn unique_location(backup_dir: &Path, created_at: &DateTime<Utc>, label: &str) -> PathBuf {
    let stem = format!("{}-{}", created_at.format("%Y%m%dT%H%M%S%3fZ"), sanitize(label));
    let mut candidate = backup_dir.join(&stem);
    let mut n = 1;
    while candidate.exists() {
        candidate = backup_dir.join(format!("{}-{}", stem, n));
        n += 1;
    }
    candidate
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn files_in_directories(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, BackupError> {
    let mut files = Vec::new();
    for dir in dirs {
        let entries = fs::read_dir(dir).map_err(|e| BackupError::ReadDir {
            path: dir.clone(),
            source: e,
        })?;
        let mut in_dir = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BackupError::ReadDir {
                path: dir.clone(),
                source: e,
            })?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                in_dir.push(entry.path());
            }
        }
        in_dir.sort();
        files.extend(in_dir);
    }
    Ok(files)
}

fn files_in_tree(root: &Path, walker: &WalkerConfig) -> Vec<PathBuf> {
    // Built after the snapshot directory exists so it anchors like the walk.
    let filter = PathFilter::new(root, walker);
    WalkDir::new(root)
        .follow_links(walker.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !filter.is_skipped(e.path(), e.file_type().is_dir()))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Backup skipped an entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Path of `path` below `root`, or its normal components when outside it.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect(),
    }
}

fn copy_with_digest(source: &Path, target: &Path) -> io::Result<(u64, String)> {
    let mut reader = File::open(source)?;
    let mut writer = File::create(target)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }
    writer.flush()?;

    Ok((total, format!("{:x}", hasher.finalize())))
}

fn digest_file(path: &Path) -> io::Result<(u64, String)> {
    let mut reader = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total += n as u64;
    }
    Ok((total, format!("{:x}", hasher.finalize())))
}
