//! Fingerprint grouping and canonical selection.
//!
//! # Overview
//!
//! [`group_duplicates`] partitions scanned records by fingerprint. Every
//! partition with two or more members becomes a [`DuplicateGroup`] whose
//! canonical is the member seen first in traversal order; the remaining
//! members, still in traversal order, are its duplicates. Singleton
//! partitions are not duplicates and are dropped.
//!
//! # Example
//!
//! ```no_run
//! use templopt::duplicates::group_duplicates;
//! use templopt::scanner::{scan, WalkerConfig};
//! use std::path::Path;
//!
//! let outcome = scan(Path::new("templates"), &WalkerConfig::default()).unwrap();
//! let (groups, stats) = group_duplicates(&outcome.records);
//!
//! println!("{} groups, {} reclaimable bytes", groups.len(), stats.reclaimable_bytes);
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::scanner::{FileRecord, Fingerprint};

/// Confirmed group of files sharing one fingerprint.
///
/// A group always has exactly one canonical record and at least one
/// duplicate; the constructor refuses anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    fingerprint: Fingerprint,
    canonical: FileRecord,
    duplicates: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a group from members listed in traversal order.
    ///
    /// Returns `None` when fewer than two members are given.
    #[must_use]
    pub fn from_members(mut members: Vec<FileRecord>) -> Option<Self> {
        if members.len() < 2 {
            return None;
        }
        let canonical = members.remove(0);
        Some(Self {
            fingerprint: canonical.fingerprint.clone(),
            canonical,
            duplicates: members,
        })
    }

    /// Shared fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The record that is kept.
    #[must_use]
    pub fn canonical(&self) -> &FileRecord {
        &self.canonical
    }

    /// The redundant copies, in traversal order.
    #[must_use]
    pub fn duplicates(&self) -> &[FileRecord] {
        &self.duplicates
    }

    /// Number of files in this group, canonical included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.duplicates.len() + 1
    }

    /// Groups are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.canonical.size + self.wasted_space()
    }

    /// Bytes held by duplicates.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.duplicates.iter().map(|d| d.size).sum()
    }

    /// Iterate over all members, canonical first.
    pub fn members(&self) -> impl Iterator<Item = &FileRecord> {
        std::iter::once(&self.canonical).chain(self.duplicates.iter())
    }
}

/// Statistics from the grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingStats {
    /// Total number of records processed
    pub total_files: usize,
    /// Total size of all records in bytes
    pub total_size: u64,
    /// Number of distinct fingerprints
    pub unique_fingerprints: usize,
    /// Number of groups with 2+ members
    pub duplicate_groups: usize,
    /// Number of duplicate files (canonicals excluded)
    pub duplicate_files: usize,
    /// Bytes that removing every duplicate would free
    pub reclaimable_bytes: u64,
    /// Number of records whose fingerprint was sampled
    pub sampled_fingerprints: usize,
}

impl GroupingStats {
    /// Percentage of scanned files that are redundant copies.
    #[must_use]
    pub fn redundancy_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.duplicate_files as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group records by fingerprint.
///
/// Records must be supplied in traversal order. The returned groups are
/// ordered by the traversal position of their canonical.
#[must_use]
pub fn group_duplicates(records: &[FileRecord]) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut stats = GroupingStats::default();
    let mut order: Vec<&Fingerprint> = Vec::new();
    let mut partitions: HashMap<&Fingerprint, Vec<&FileRecord>> = HashMap::new();

    for record in records {
        stats.total_files += 1;
        stats.total_size += record.size;
        if record.fingerprint.is_sampled() {
            stats.sampled_fingerprints += 1;
        }

        let members = partitions.entry(&record.fingerprint).or_default();
        if members.is_empty() {
            order.push(&record.fingerprint);
        }
        members.push(record);
    }

    stats.unique_fingerprints = order.len();

    let mut groups = Vec::new();
    for fingerprint in order {
        let Some(members) = partitions.remove(fingerprint) else {
            continue;
        };
        let owned: Vec<FileRecord> = members.into_iter().cloned().collect();
        if let Some(group) = DuplicateGroup::from_members(owned) {
            log::debug!(
                "Group {}: keeping {}, {} duplicate(s)",
                group.fingerprint(),
                group.canonical().relative_path.display(),
                group.duplicates().len()
            );
            stats.duplicate_groups += 1;
            stats.duplicate_files += group.duplicates().len();
            stats.reclaimable_bytes += group.wasted_space();
            groups.push(group);
        }
    }

    if stats.sampled_fingerprints > 0 {
        log::warn!(
            "{} file(s) at or above 1 MiB were fingerprinted by sampling; equal fingerprints are not proof of equal content",
            stats.sampled_fingerprints
        );
    }

    log::info!(
        "Grouping complete: {} files -> {} group(s), {} duplicate(s)",
        stats.total_files,
        stats.duplicate_groups,
        stats.duplicate_files
    );

    (groups, stats)
}
