//! Persisted duplicate database.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "scanTimestamp": "2026-01-01T00:00:00Z",
//!   "scanPath": "templates",
//!   "duplicateGroups": {
//!     "full:af13...": {
//!       "original": "agents/core/a/agent.json",
//!       "duplicates": ["agents/core/b/agent.json"],
//!       "totalSize": 84
//!     }
//!   },
//!   "fileRegistry": {
//!     "agents/core/a/agent.json": {
//!       "size": 42,
//!       "lastModified": "2026-01-01T00:00:00Z",
//!       "fingerprint": "full:af13..."
//!     }
//!   },
//!   "nearDuplicates": []
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::groups::DuplicateGroup;
use super::similarity::SimilarityEdge;
use crate::scanner::{FileRecord, ScanOutcome};

/// File name of the database inside the report directory.
pub const DATABASE_FILE: &str = "duplicate-database.json";

/// One group in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    /// Relative path of the canonical file
    pub original: String,
    /// Relative paths of the duplicates
    pub duplicates: Vec<String>,
    /// Bytes held by every member of the group
    pub total_size: u64,
}

/// One scanned file in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub fingerprint: String,
}

/// Snapshot of a scan for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDatabase {
    pub scan_timestamp: DateTime<Utc>,
    pub scan_path: PathBuf,
    pub duplicate_groups: BTreeMap<String, GroupEntry>,
    pub file_registry: BTreeMap<String, RegistryEntry>,
    #[serde(default)]
    pub near_duplicates: Vec<SimilarityEdge>,
}

impl DuplicateDatabase {
    /// Build the database from a scan, its groups and optional edges.
    #[must_use]
    pub fn build(
        outcome: &ScanOutcome,
        groups: &[DuplicateGroup],
        near_duplicates: &[SimilarityEdge],
    ) -> Self {
        let duplicate_groups = groups
            .iter()
            .map(|group| {
                (
                    group.fingerprint().to_string(),
                    GroupEntry {
                        original: relative_key(group.canonical()),
                        duplicates: group.duplicates().iter().map(relative_key).collect(),
                        total_size: group.total_size(),
                    },
                )
            })
            .collect();

        let file_registry = outcome
            .records
            .iter()
            .map(|record| {
                (
                    relative_key(record),
                    RegistryEntry {
                        size: record.size,
                        last_modified: record.last_modified,
                        fingerprint: record.fingerprint.to_string(),
                    },
                )
            })
            .collect();

        Self {
            scan_timestamp: Utc::now(),
            scan_path: outcome.root.clone(),
            duplicate_groups,
            file_registry,
            near_duplicates: near_duplicates.to_vec(),
        }
    }

    /// Number of duplicate files across all groups.
    #[must_use]
    pub fn duplicate_file_count(&self) -> usize {
        self.duplicate_groups
            .values()
            .map(|g| g.duplicates.len())
            .sum()
    }

    /// Bytes held by duplicates, according to the registry.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.duplicate_groups
            .values()
            .flat_map(|g| g.duplicates.iter())
            .filter_map(|path| self.file_registry.get(path))
            .map(|entry| entry.size)
            .sum()
    }

    /// Path of the database inside a report directory.
    #[must_use]
    pub fn path_in(report_dir: &Path) -> PathBuf {
        report_dir.join(DATABASE_FILE)
    }
}

/// Forward-slash relative path used as a stable key.
fn relative_key(record: &FileRecord) -> String {
    record.relative_path.to_string_lossy().replace('\\', "/")
}
