//! Phase identities, states and per-phase results.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::CriticalPhases;

/// Pipeline phases, declared in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum PhaseKind {
    Analysis,
    Elimination,
    Installation,
    #[value(alias = "qa")]
    QualityAssurance,
    #[value(alias = "validation")]
    FinalValidation,
}

impl PhaseKind {
    /// Every phase in execution order.
    pub const ORDER: [PhaseKind; 5] = [
        Self::Analysis,
        Self::Elimination,
        Self::Installation,
        Self::QualityAssurance,
        Self::FinalValidation,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Analysis => "Analysis",
            Self::Elimination => "Elimination",
            Self::Installation => "Installation",
            Self::QualityAssurance => "Quality Assurance",
            Self::FinalValidation => "Final Validation",
        }
    }

    /// Whether a failure of this phase may abort the run.
    #[must_use]
    pub fn is_critical(self, critical: &CriticalPhases) -> bool {
        match self {
            Self::Analysis => critical.analysis,
            Self::Elimination => critical.elimination,
            Self::Installation => critical.installation,
            Self::QualityAssurance => critical.quality_assurance,
            Self::FinalValidation => critical.final_validation,
        }
    }

    /// Sort and deduplicate a selection into execution order.
    #[must_use]
    pub fn in_order(selection: &[PhaseKind]) -> Vec<PhaseKind> {
        Self::ORDER
            .into_iter()
            .filter(|p| selection.contains(p))
            .collect()
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    /// Whether the phase reached a final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// One step performed inside a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action: String,
    pub success: bool,
    pub detail: String,
}

impl ActionResult {
    #[must_use]
    pub fn ok(action: &str, detail: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            success: true,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn failed(action: &str, detail: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            success: false,
            detail: detail.into(),
        }
    }
}

/// Outcome of one phase as recorded in the execution report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseResult {
    pub name: PhaseKind,
    pub status: PhaseStatus,
    pub critical: bool,
    pub actions: Vec<ActionResult>,
    pub errors: Vec<String>,
    pub duration_seconds: f64,
    /// Snapshot taken before the phase ran
    pub checkpoint: Option<PathBuf>,
}

impl PhaseResult {
    #[must_use]
    pub fn new(name: PhaseKind, critical: bool) -> Self {
        Self {
            name,
            status: PhaseStatus::NotStarted,
            critical,
            actions: Vec::new(),
            errors: Vec::new(),
            duration_seconds: 0.0,
            checkpoint: None,
        }
    }

    /// A phase that never ran.
    #[must_use]
    pub fn skipped(name: PhaseKind, critical: bool, reason: &str) -> Self {
        Self {
            status: PhaseStatus::Skipped,
            errors: vec![reason.to_string()],
            ..Self::new(name, critical)
        }
    }
}
