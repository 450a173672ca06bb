//! Redundancy elimination.
//!
//! This module provides functionality for:
//! - Immutable elimination plans and their non-mutating preview
//! - Snapshot backups and scoped checkpoints
//! - Verified permanent deletion with TOCTOU size checks
//! - Bottom-up pruning of emptied directories
//!
//! ```no_run
//! use templopt::actions::{build_plan, execute, EliminationMode, ExecuteOptions};
//! use templopt::duplicates::group_duplicates;
//! use templopt::scanner::{scan, WalkerConfig};
//! use std::path::Path;
//!
//! let root = Path::new("templates");
//! let outcome = scan(root, &WalkerConfig::default()).unwrap();
//! let (groups, _) = group_duplicates(&outcome.records);
//! let plan = build_plan(groups, EliminationMode::Execute);
//! let result = execute(&plan, root, &ExecuteOptions::new(".templopt/backups")).unwrap();
//! println!("{}", result.summary());
//! ```

pub mod backup;
pub mod delete;
pub mod eliminate;
pub mod plan;
pub mod prune;

pub use backup::{create_backup, Backup, BackupError, BackupManifest, BackupScope, Checkpoint};
pub use delete::{delete_batch, delete_group, DeleteConfig, DeleteError, DeleteTarget, GroupDeletion};
pub use eliminate::{apply, execute, EliminationError, ExecuteOptions};
pub use plan::{
    build_plan, preview, EliminationMode, EliminationPlan, EliminationResult, RemovedFile,
};
pub use prune::{clean, prunable_after_removal, CleanResult};
