//! Elimination plans and their non-mutating preview.
//!
//! A plan is built once from the duplicate groups of a scan and never
//! changes afterwards. [`preview`] reports exactly what executing the plan
//! would remove without touching the filesystem.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::prune::prunable_after_removal;
use crate::duplicates::DuplicateGroup;
use crate::scanner::WalkerConfig;

/// Whether a plan may mutate the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EliminationMode {
    /// Report only
    Preview,
    /// Back up, delete and prune
    #[default]
    Execute,
}

impl std::fmt::Display for EliminationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preview => write!(f, "preview"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Immutable removal plan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminationPlan {
    mode: EliminationMode,
    groups: Vec<DuplicateGroup>,
    estimated_space_reclaimed: u64,
}

impl EliminationPlan {
    #[must_use]
    pub fn mode(&self) -> EliminationMode {
        self.mode
    }

    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Sum of duplicate sizes across all groups.
    #[must_use]
    pub fn estimated_space_reclaimed(&self) -> u64 {
        self.estimated_space_reclaimed
    }

    /// Number of files the plan would remove.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Paths of every file the plan would remove.
    pub fn removal_paths(&self) -> impl Iterator<Item = &Path> {
        self.groups
            .iter()
            .flat_map(|g| g.duplicates().iter().map(|d| d.path.as_path()))
    }

    /// Directories holding at least one file referenced by the plan, sorted.
    #[must_use]
    pub fn affected_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .groups
            .iter()
            .flat_map(DuplicateGroup::members)
            .filter_map(|record| record.path.parent().map(Path::to_path_buf))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        dirs.sort();
        dirs
    }
}

/// Build a plan from duplicate groups.
#[must_use]
pub fn build_plan(groups: Vec<DuplicateGroup>, mode: EliminationMode) -> EliminationPlan {
    let estimated_space_reclaimed = groups.iter().map(DuplicateGroup::wasted_space).sum();
    log::debug!(
        "Built {} plan: {} group(s), {} bytes reclaimable",
        mode,
        groups.len(),
        estimated_space_reclaimed
    );
    EliminationPlan {
        mode,
        groups,
        estimated_space_reclaimed,
    }
}

/// A file removed (or, in a preview, to be removed) by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Canonical path that keeps the content
    pub kept_as: PathBuf,
}

/// Outcome of previewing or executing a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EliminationResult {
    pub mode: EliminationMode,
    pub files_removed: Vec<RemovedFile>,
    pub space_reclaimed: u64,
    pub errors: Vec<String>,
    pub backup_location: Option<PathBuf>,
    pub directories_cleaned: usize,
}

impl EliminationResult {
    /// Whether every planned removal succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = match self.mode {
            EliminationMode::Preview => "Would remove",
            EliminationMode::Execute => "Removed",
        };
        let mut text = format!(
            "{} {} file(s), {} reclaimed, {} director(ies) cleaned",
            verb,
            self.files_removed.len(),
            bytesize::ByteSize::b(self.space_reclaimed),
            self.directories_cleaned
        );
        if !self.errors.is_empty() {
            text.push_str(&format!(", {} error(s)", self.errors.len()));
        }
        text
    }
}

/// Compute the result of executing a plan without mutating anything.
///
/// `walker` holds the skip rules the scan used; pruning honours the same.
#[must_use]
pub fn preview(plan: &EliminationPlan, root: &Path, walker: &WalkerConfig) -> EliminationResult {
    let mut result = EliminationResult {
        mode: EliminationMode::Preview,
        ..EliminationResult::default()
    };

    for group in plan.groups() {
        for duplicate in group.duplicates() {
            result.space_reclaimed += duplicate.size;
            result.files_removed.push(RemovedFile {
                path: duplicate.path.clone(),
                size_bytes: duplicate.size,
                kept_as: group.canonical().path.clone(),
            });
        }
    }

    let removed: HashSet<PathBuf> = plan.removal_paths().map(Path::to_path_buf).collect();
    result.directories_cleaned = prunable_after_removal(root, &removed, walker).len();

    log::info!("Preview: {}", result.summary());
    result
}
