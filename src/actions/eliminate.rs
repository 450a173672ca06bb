//! Plan execution: backup, verified deletion, pruning.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::backup::{BackupError, BackupScope, Checkpoint};
use super::delete::{delete_group, DeleteConfig};
use super::plan::{preview, EliminationMode, EliminationPlan, EliminationResult, RemovedFile};
use super::prune::clean;
use crate::scanner::WalkerConfig;

/// Errors that stop execution before anything is deleted.
#[derive(Debug, Error)]
pub enum EliminationError {
    #[error("backup failed, nothing was deleted: {0}")]
    BackupFailed(#[from] BackupError),

    #[error("plan was built in preview mode and cannot be executed")]
    PreviewPlan,
}

/// Options for [`execute`].
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Snapshot affected directories before deleting
    pub backup_required: bool,
    pub backup_dir: PathBuf,
    pub delete: DeleteConfig,
    /// Skip rules for pruning, the same ones the scan used
    pub walker: WalkerConfig,
}

impl ExecuteOptions {
    #[must_use]
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_required: true,
            backup_dir: backup_dir.into(),
            delete: DeleteConfig::default(),
            walker: WalkerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_walker(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    #[must_use]
    pub fn with_backup(mut self, required: bool) -> Self {
        self.backup_required = required;
        self
    }
}

/// Execute a plan built in [`EliminationMode::Execute`].
///
/// Every group keeps its canonical. A group whose canonical vanished since
/// the scan is left untouched and reported in `errors`.
///
/// # Errors
///
/// Returns [`EliminationError::BackupFailed`] when the required snapshot
/// could not be taken; no file has been deleted in that case.
pub fn execute(
    plan: &EliminationPlan,
    root: &Path,
    options: &ExecuteOptions,
) -> Result<EliminationResult, EliminationError> {
    if plan.mode() != EliminationMode::Execute {
        return Err(EliminationError::PreviewPlan);
    }

    let mut result = EliminationResult {
        mode: EliminationMode::Execute,
        ..EliminationResult::default()
    };
    if plan.is_empty() {
        log::info!("Nothing to eliminate");
        return Ok(result);
    }

    let checkpoint = if options.backup_required {
        let dirs = plan.affected_directories();
        Some(Checkpoint::acquire(
            root,
            BackupScope::Directories(&dirs),
            &options.backup_dir,
            "elimination",
        )?)
    } else {
        log::warn!("Executing elimination without a backup");
        None
    };

    for group in plan.groups() {
        let canonical = group.canonical();
        let deletion = match delete_group(canonical, group.duplicates(), &options.delete) {
            Ok(deletion) => deletion,
            Err(e) => {
                log::error!("Skipping group {}: {}", group.fingerprint(), e);
                result.errors.push(e.to_string());
                continue;
            }
        };

        result.space_reclaimed += deletion.bytes_freed;
        result
            .files_removed
            .extend(deletion.removed.into_iter().map(|(path, size_bytes)| RemovedFile {
                path,
                size_bytes,
                kept_as: canonical.path.clone(),
            }));
        result
            .errors
            .extend(deletion.failures.into_iter().map(|(_, msg)| msg));
    }

    let pruned = clean(root, &options.walker);
    result.directories_cleaned = pruned.count();
    result.errors.extend(pruned.errors);

    result.backup_location = checkpoint.map(Checkpoint::retain);

    log::info!("Elimination: {}", result.summary());
    Ok(result)
}

/// Preview or execute according to the plan's mode.
///
/// # Errors
///
/// See [`execute`].
pub fn apply(
    plan: &EliminationPlan,
    root: &Path,
    options: &ExecuteOptions,
) -> Result<EliminationResult, EliminationError> {
    match plan.mode() {
        EliminationMode::Preview => Ok(preview(plan, root, &options.walker)),
        EliminationMode::Execute => execute(plan, root, options),
    }
}
