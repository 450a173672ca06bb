//! Phased maintenance runs.
//!
//! Analysis, Elimination, Installation, Quality Assurance and Final
//! Validation execute in that fixed order with optional per-phase
//! checkpoints. Installation and Final Validation are delegated to the
//! [`Installer`] and [`Validator`] seams.

pub mod installer;
pub mod phase;
pub mod pipeline;
pub mod validator;

pub use installer::{InstallReport, Installer, ManifestInstaller};
pub use phase::{ActionResult, PhaseKind, PhaseResult, PhaseStatus};
pub use pipeline::{
    recommendations, success_rate, ExecutionSummary, OrchestrationReport, Orchestrator, RunMode,
    RunState, RunStats, EXECUTION_REPORT_FILE,
};
pub use validator::{StructureValidator, ValidationFailure, ValidationReport, Validator};
