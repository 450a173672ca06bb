//! The phase state machine.
//!
//! A run moves `Idle -> Executing -> {Completed, Aborted}`. Planned phases
//! execute one at a time in [`PhaseKind::ORDER`]. A failed phase aborts the
//! run only when it is critical and `stop_on_critical_failure` is set; every
//! later phase is then recorded as skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::installer::{Installer, ManifestInstaller};
use super::phase::{ActionResult, PhaseKind, PhaseResult, PhaseStatus};
use super::validator::{StructureValidator, Validator};
use crate::actions::{
    apply, build_plan, BackupScope, Checkpoint, EliminationMode, EliminationResult,
    ExecuteOptions,
};
use crate::compliance::{test_all, QA_REPORT_FILE};
use crate::config::Config;
use crate::duplicates::{
    find_near_duplicates, group_duplicates, DuplicateDatabase, DuplicateGroup, GroupingStats,
};
use crate::output::json::{
    write_report, OptimizationReport, OptimizationStats, OPTIMIZATION_REPORT_FILE,
};
use crate::progress::ProgressCallback;
use crate::scanner::{scan_with_progress, ScanError};

/// File name of the execution report.
pub const EXECUTION_REPORT_FILE: &str = "execution-report.json";

/// Lifecycle of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Executing,
    Completed,
    Aborted,
}

/// Which phases a run plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Analysis,
    Installation,
    /// Quality assurance followed by final validation
    Qa,
    Custom(Vec<PhaseKind>),
}

impl RunMode {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Analysis => "analysis",
            Self::Installation => "installation",
            Self::Qa => "qa",
            Self::Custom(_) => "custom",
        }
    }

    /// Planned phases in execution order.
    #[must_use]
    pub fn planned_phases(&self) -> Vec<PhaseKind> {
        match self {
            Self::Full => PhaseKind::ORDER.to_vec(),
            Self::Analysis => vec![PhaseKind::Analysis],
            Self::Installation => vec![PhaseKind::Installation],
            Self::Qa => vec![PhaseKind::QualityAssurance, PhaseKind::FinalValidation],
            Self::Custom(selection) => PhaseKind::in_order(selection),
        }
    }
}

/// Totals of a run, folded from each phase's contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub files_scanned: usize,
    pub duplicate_groups: usize,
    pub duplicates_found: usize,
    pub files_removed: usize,
    pub space_reclaimed: u64,
    pub files_installed: usize,
    pub components_tested: usize,
    pub components_passed: usize,
    pub poor_components: usize,
    pub validation_failures: usize,
    pub checkpoints: usize,
}

impl RunStats {
    #[must_use]
    pub fn merge(self, other: RunStats) -> RunStats {
        RunStats {
            files_scanned: self.files_scanned + other.files_scanned,
            duplicate_groups: self.duplicate_groups + other.duplicate_groups,
            duplicates_found: self.duplicates_found + other.duplicates_found,
            files_removed: self.files_removed + other.files_removed,
            space_reclaimed: self.space_reclaimed + other.space_reclaimed,
            files_installed: self.files_installed + other.files_installed,
            components_tested: self.components_tested + other.components_tested,
            components_passed: self.components_passed + other.components_passed,
            poor_components: self.poor_components + other.poor_components,
            validation_failures: self.validation_failures + other.validation_failures,
            checkpoints: self.checkpoints + other.checkpoints,
        }
    }
}

/// Header of the execution report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub mode: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total_phases: usize,
    pub completed_phases: usize,
    pub failed_phases: usize,
    pub skipped_phases: usize,
    /// Completed share of planned phases, in percent
    pub success_rate: f64,
    pub overall_status: RunState,
    pub aborted_at: Option<PhaseKind>,
}

/// Persisted execution report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationReport {
    pub execution_summary: ExecutionSummary,
    pub phase_results: Vec<PhaseResult>,
    pub statistics: RunStats,
    pub recommendations: Vec<String>,
}

impl OrchestrationReport {
    #[must_use]
    pub fn path_in(report_dir: &Path) -> PathBuf {
        report_dir.join(EXECUTION_REPORT_FILE)
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.execution_summary.overall_status == RunState::Aborted
    }

    /// Phases that ended in [`PhaseStatus::Failed`].
    pub fn failed_phases(&self) -> impl Iterator<Item = &PhaseResult> {
        self.phase_results
            .iter()
            .filter(|p| p.status == PhaseStatus::Failed)
    }
}

/// Success rate in percent, two decimals; 100 when nothing was planned.
#[must_use]
pub fn success_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (completed as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Derive recommendations from a finished run.
#[must_use]
pub fn recommendations(
    summary: &ExecutionSummary,
    phases: &[PhaseResult],
    stats: &RunStats,
) -> Vec<String> {
    let mut out = Vec::new();

    let failed: Vec<&PhaseResult> = phases
        .iter()
        .filter(|p| p.status == PhaseStatus::Failed)
        .collect();

    if summary.success_rate < 90.0 {
        let names: Vec<&str> = failed.iter().map(|p| p.name.label()).collect();
        if names.is_empty() {
            out.push(format!(
                "Success rate is {:.2}%; investigate skipped phases",
                summary.success_rate
            ));
        } else {
            out.push(format!(
                "Success rate is {:.2}%; investigate failures in {}",
                summary.success_rate,
                names.join(", ")
            ));
        }
    }
    if stats.poor_components > 0 {
        out.push(format!(
            "{} component(s) rated Poor require immediate attention",
            stats.poor_components
        ));
    }
    if let Some(phase) = summary.aborted_at {
        out.push(format!(
            "Run aborted after critical phase {} failed; fix it and rerun",
            phase
        ));
    }
    for phase in &failed {
        if let Some(checkpoint) = &phase.checkpoint {
            out.push(format!(
                "Checkpoint for {} retained at {}; restore it manually if needed",
                phase.name,
                checkpoint.display()
            ));
        }
    }
    if summary.total_phases > 0 && summary.completed_phases == summary.total_phases {
        out.push("All phases completed; no action required".to_string());
    }
    out
}

/// Detector output shared between Analysis and Elimination.
struct Analysis {
    groups: Vec<DuplicateGroup>,
    stats: GroupingStats,
    near_duplicates: usize,
}

struct PhaseOutcome {
    status: PhaseStatus,
    actions: Vec<ActionResult>,
    errors: Vec<String>,
    stats: RunStats,
}

impl PhaseOutcome {
    fn new() -> Self {
        Self {
            status: PhaseStatus::Completed,
            actions: Vec::new(),
            errors: Vec::new(),
            stats: RunStats::default(),
        }
    }

    fn fail(&mut self, action: &str, message: String) {
        self.status = PhaseStatus::Failed;
        self.actions.push(ActionResult::failed(action, message.clone()));
        self.errors.push(message);
    }
}

/// Drives the phases of a maintenance run over one template root.
pub struct Orchestrator {
    config: Config,
    root: PathBuf,
    installer: Box<dyn Installer>,
    validator: Box<dyn Validator>,
    progress: Option<Arc<dyn ProgressCallback>>,
    dry_run: bool,
    state: RunState,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        Self {
            installer: Box::new(ManifestInstaller::new(config.qa.max_name_length)),
            config,
            root: root.into(),
            validator: Box::new(StructureValidator),
            progress: None,
            dry_run: false,
            state: RunState::Idle,
        }
    }

    #[must_use]
    pub fn with_installer(mut self, installer: Box<dyn Installer>) -> Self {
        self.installer = installer;
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Preview elimination, skip installation writes and checkpoints.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the planned phases and persist the execution report.
    pub fn run(&mut self, mode: &RunMode) -> OrchestrationReport {
        let planned = mode.planned_phases();
        let started_at = Utc::now();
        let clock = Instant::now();
        self.state = RunState::Executing;
        log::info!(
            "Pipeline '{}' started: {} phase(s){}",
            mode.name(),
            planned.len(),
            if self.dry_run { " (dry run)" } else { "" }
        );

        let analysis_planned = planned.contains(&PhaseKind::Analysis);
        let mut analysis: Option<Analysis> = None;
        let mut stats = RunStats::default();
        let mut phase_results = Vec::with_capacity(planned.len());
        let mut aborted_at = None;

        for &kind in &planned {
            let critical = kind.is_critical(&self.config.pipeline.critical);

            if let Some(failed) = aborted_at {
                phase_results.push(PhaseResult::skipped(
                    kind,
                    critical,
                    &format!("run aborted after {} failed", failed),
                ));
                continue;
            }
            if kind == PhaseKind::Elimination && analysis_planned && analysis.is_none() {
                log::warn!("Skipping Elimination: Analysis did not complete");
                phase_results.push(PhaseResult::skipped(
                    kind,
                    critical,
                    "analysis did not complete",
                ));
                continue;
            }

            let (result, delta) = self.run_phase(kind, critical, &mut analysis);
            stats = stats.merge(delta);

            if result.status == PhaseStatus::Failed
                && critical
                && self.config.pipeline.stop_on_critical_failure
            {
                log::error!("Critical phase {} failed; aborting run", kind);
                aborted_at = Some(kind);
            }
            phase_results.push(result);
        }

        self.state = if aborted_at.is_some() {
            RunState::Aborted
        } else {
            RunState::Completed
        };

        let count = |status: PhaseStatus| phase_results.iter().filter(|p| p.status == status).count();
        let completed_phases = count(PhaseStatus::Completed);
        let summary = ExecutionSummary {
            mode: mode.name().to_string(),
            dry_run: self.dry_run,
            started_at,
            finished_at: Utc::now(),
            duration_seconds: clock.elapsed().as_secs_f64(),
            total_phases: planned.len(),
            completed_phases,
            failed_phases: count(PhaseStatus::Failed),
            skipped_phases: count(PhaseStatus::Skipped),
            success_rate: success_rate(completed_phases, planned.len()),
            overall_status: self.state,
            aborted_at,
        };
        let recommendations = recommendations(&summary, &phase_results, &stats);
        let report = OrchestrationReport {
            execution_summary: summary,
            phase_results,
            statistics: stats,
            recommendations,
        };

        if let Err(e) = write_report(&OrchestrationReport::path_in(&self.config.report_dir), &report) {
            log::error!("Failed to write execution report: {}", e);
        }
        log::info!(
            "Pipeline '{}' finished: {:?}, {:.2}% of phases completed",
            mode.name(),
            self.state,
            report.execution_summary.success_rate
        );
        report
    }

    fn run_phase(
        &self,
        kind: PhaseKind,
        critical: bool,
        analysis: &mut Option<Analysis>,
    ) -> (PhaseResult, RunStats) {
        let mut result = PhaseResult::new(kind, critical);
        result.status = PhaseStatus::Running;
        log::info!("Phase {} started", kind);
        let clock = Instant::now();

        let mut checkpoint = None;
        let mut checkpoint_error = None;
        if self.config.pipeline.backup_checkpoints && !self.dry_run {
            let walker = self.config.walker_config();
            let label = format!("checkpoint-{}", kind.label().to_lowercase().replace(' ', "-"));
            match Checkpoint::acquire(
                &self.root,
                BackupScope::Tree(&walker),
                &self.config.backup_dir,
                &label,
            ) {
                Ok(cp) => checkpoint = Some(cp),
                Err(e) => checkpoint_error = Some(format!("checkpoint failed: {}", e)),
            }
        }

        let outcome = match checkpoint_error {
            Some(message) => {
                let mut outcome = PhaseOutcome::new();
                outcome.fail("checkpoint", message);
                outcome
            }
            None => {
                let mut outcome = match kind {
                    PhaseKind::Analysis => self.analysis_phase(analysis),
                    PhaseKind::Elimination => self.elimination_phase(analysis.take()),
                    PhaseKind::Installation => self.installation_phase(),
                    PhaseKind::QualityAssurance => self.quality_phase(),
                    PhaseKind::FinalValidation => self.validation_phase(),
                };
                if let Some(cp) = &checkpoint {
                    outcome.stats.checkpoints += 1;
                    outcome
                        .actions
                        .insert(0, ActionResult::ok("checkpoint", cp.location().display().to_string()));
                }
                outcome
            }
        };

        result.checkpoint = checkpoint.map(Checkpoint::retain);
        result.status = outcome.status;
        result.actions = outcome.actions;
        result.errors = outcome.errors;
        result.duration_seconds = clock.elapsed().as_secs_f64();

        match result.status {
            PhaseStatus::Failed => log::warn!(
                "Phase {} failed after {:.2}s: {}",
                kind,
                result.duration_seconds,
                result.errors.join("; ")
            ),
            _ => log::info!("Phase {} completed in {:.2}s", kind, result.duration_seconds),
        }
        (result, outcome.stats)
    }

    fn analyze(&self) -> Result<(Analysis, DuplicateDatabase), ScanError> {
        let outcome = scan_with_progress(
            &self.root,
            &self.config.walker_config(),
            self.progress.clone(),
        )?;
        let (groups, stats) = group_duplicates(&outcome.records);
        let near = if self.config.dedupe.deep_scan {
            find_near_duplicates(
                &outcome.records,
                &groups,
                &self.config.dedupe.near_duplicate_extensions,
            )
        } else {
            Vec::new()
        };
        let database = DuplicateDatabase::build(&outcome, &groups, &near);
        Ok((
            Analysis {
                groups,
                stats,
                near_duplicates: near.len(),
            },
            database,
        ))
    }

    fn analysis_phase(&self, slot: &mut Option<Analysis>) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::new();
        let (found, database) = match self.analyze() {
            Ok(found) => found,
            Err(e) => {
                outcome.fail("scan", e.to_string());
                return outcome;
            }
        };

        outcome.stats.files_scanned = found.stats.total_files;
        outcome.stats.duplicate_groups = found.stats.duplicate_groups;
        outcome.stats.duplicates_found = found.stats.duplicate_files;
        outcome.actions.push(ActionResult::ok(
            "scan",
            format!(
                "{} file(s), {} group(s), {} duplicate(s), {} near-duplicate pair(s)",
                found.stats.total_files,
                found.stats.duplicate_groups,
                found.stats.duplicate_files,
                found.near_duplicates
            ),
        ));

        let path = DuplicateDatabase::path_in(&self.config.report_dir);
        match write_report(&path, &database) {
            Ok(()) => outcome
                .actions
                .push(ActionResult::ok("database", path.display().to_string())),
            Err(e) => outcome.fail("database", e.to_string()),
        }

        if outcome.status == PhaseStatus::Completed {
            *slot = Some(found);
        }
        outcome
    }

    fn elimination_phase(&self, analysis: Option<Analysis>) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::new();
        let found = match analysis {
            Some(found) => found,
            None => match self.analyze() {
                Ok((found, _)) => found,
                Err(e) => {
                    outcome.fail("scan", e.to_string());
                    return outcome;
                }
            },
        };

        let mode = if self.dry_run {
            EliminationMode::Preview
        } else {
            self.config.pipeline.elimination_mode
        };
        let stats = OptimizationStats::from_grouping(&found.stats, found.near_duplicates);
        let plan = build_plan(found.groups, mode);
        let options = ExecuteOptions::new(self.config.backup_dir.clone())
            .with_backup(self.config.dedupe.backup_required)
            .with_walker(self.config.walker_config());

        let elimination = match apply(&plan, &self.root, &options) {
            Ok(result) => {
                outcome.stats.files_removed = result.files_removed.len();
                outcome.stats.space_reclaimed = result.space_reclaimed;
                if result.all_succeeded() {
                    outcome.actions.push(ActionResult::ok(mode_action(mode), result.summary()));
                } else {
                    outcome.status = PhaseStatus::Failed;
                    outcome
                        .actions
                        .push(ActionResult::failed(mode_action(mode), result.summary()));
                    outcome.errors.extend(result.errors.iter().cloned());
                }
                result
            }
            Err(e) => {
                let message = e.to_string();
                outcome.fail("backup", message.clone());
                EliminationResult {
                    mode,
                    errors: vec![message],
                    ..EliminationResult::default()
                }
            }
        };

        let path = self.config.report_dir.join(OPTIMIZATION_REPORT_FILE);
        match write_report(&path, &OptimizationReport::new(stats, Some(elimination))) {
            Ok(()) => outcome
                .actions
                .push(ActionResult::ok("report", path.display().to_string())),
            Err(e) => outcome.fail("report", e.to_string()),
        }
        outcome
    }

    fn installation_phase(&self) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::new();
        let specs = &self.config.install;

        if self.dry_run {
            outcome.actions.push(ActionResult::ok(
                "install",
                format!("would install {} component(s)", specs.len()),
            ));
            return outcome;
        }

        let report = self.installer.install(&self.root, specs);
        outcome.stats.files_installed = report.installed.len();
        let detail = format!(
            "{} file(s) written, {} existing kept",
            report.installed.len(),
            report.skipped_existing.len()
        );
        if report.succeeded() {
            outcome.actions.push(ActionResult::ok("install", detail));
        } else {
            outcome.status = PhaseStatus::Failed;
            outcome.actions.push(ActionResult::failed("install", detail));
            outcome.errors.extend(report.errors);
        }
        outcome
    }

    fn quality_phase(&self) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::new();
        let run = match test_all(&self.root, &self.config.score_options()) {
            Ok(run) => run,
            Err(e) => {
                outcome.fail("test-all", e.to_string());
                return outcome;
            }
        };

        let summary = &run.summary;
        outcome.stats.components_tested = summary.total_components;
        outcome.stats.components_passed = summary.passed;
        outcome.stats.poor_components = run.poor_components().count();

        let detail = format!(
            "{} component(s), {} passed, {} failed ({:.2}%)",
            summary.total_components, summary.passed, summary.failed, summary.pass_rate
        );
        if summary.total_components > 0 && summary.pass_rate < self.config.qa.min_pass_rate {
            outcome.fail(
                "test-all",
                format!(
                    "pass rate {:.2}% is below the required {:.2}%",
                    summary.pass_rate, self.config.qa.min_pass_rate
                ),
            );
            outcome.actions.push(ActionResult::failed("summary", detail));
        } else {
            outcome.actions.push(ActionResult::ok("test-all", detail));
        }

        let path = self.config.report_dir.join(QA_REPORT_FILE);
        match write_report(&path, &run.report()) {
            Ok(()) => outcome
                .actions
                .push(ActionResult::ok("report", path.display().to_string())),
            Err(e) => outcome.fail("report", e.to_string()),
        }
        outcome
    }

    fn validation_phase(&self) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::new();
        let report = self.validator.validate(&self.root);
        outcome.stats.validation_failures = report.failures.len();

        if report.passed() {
            outcome.actions.push(ActionResult::ok(
                "validate",
                format!("{} component(s) complete", report.components_checked),
            ));
        } else {
            outcome.status = PhaseStatus::Failed;
            outcome.actions.push(ActionResult::failed(
                "validate",
                format!(
                    "{} of {} component(s) incomplete",
                    report.failures.len(),
                    report.components_checked
                ),
            ));
            outcome.errors.extend(report.failures.iter().map(|f| {
                format!("{} is missing {}", f.path.display(), f.missing_files.join(", "))
            }));
        }
        outcome
    }
}

fn mode_action(mode: EliminationMode) -> &'static str {
    match mode {
        EliminationMode::Preview => "preview",
        EliminationMode::Execute => "execute",
    }
}
