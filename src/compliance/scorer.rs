//! Component scoring and QA runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::checks::{
    check_integration, check_naming, check_performance, check_structure, clamp_score,
    CheckOutcome, IntegrationCheck, PerformanceCheck, SizeTier, StructureCheck, PASS_SCORE,
};
use super::types::{ComponentRef, ComponentType};

/// File name of the QA report inside the report directory.
pub const QA_REPORT_FILE: &str = "qa-report.json";

/// Four-tier label derived from an aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComplianceLevel {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl ComplianceLevel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            Self::Excellent
        } else if score >= 85.0 {
            Self::Good
        } else if score >= PASS_SCORE {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Acceptable => "Acceptable",
            Self::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// Tunables for scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOptions {
    pub max_name_length: usize,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            max_name_length: 50,
        }
    }
}

/// Results of the four checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentChecks {
    pub naming: CheckOutcome,
    pub structure: StructureCheck,
    pub integration: IntegrationCheck,
    pub performance: PerformanceCheck,
}

impl ComponentChecks {
    fn zero() -> Self {
        Self {
            naming: CheckOutcome::zero(),
            structure: StructureCheck {
                outcome: CheckOutcome::zero(),
                missing_files: Vec::new(),
                extra_files: Vec::new(),
            },
            integration: IntegrationCheck {
                outcome: CheckOutcome::zero(),
                conflicts: Vec::new(),
            },
            performance: PerformanceCheck {
                outcome: CheckOutcome::zero(),
                size_bytes: 0,
                size_tier: SizeTier::Lightweight,
                load_time_ms: None,
            },
        }
    }

    fn scores(&self) -> [f64; 4] {
        [
            self.naming.score,
            self.structure.outcome.score,
            self.integration.outcome.score,
            self.performance.outcome.score,
        ]
    }
}

/// Score of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTestResult {
    pub component_name: String,
    pub component_type: ComponentType,
    pub component_path: PathBuf,
    pub checks: ComponentChecks,
    pub aggregate_score: f64,
    pub compliance_level: ComplianceLevel,
    pub passed: bool,
    /// Messages not tied to a single check
    pub issues: Vec<String>,
}

impl ComponentTestResult {
    /// All messages of all checks, in check order.
    #[must_use]
    pub fn all_issues(&self) -> Vec<&str> {
        self.issues
            .iter()
            .chain(&self.checks.naming.issues)
            .chain(&self.checks.structure.outcome.issues)
            .chain(&self.checks.integration.outcome.issues)
            .chain(&self.checks.performance.outcome.issues)
            .map(String::as_str)
            .collect()
    }
}

fn component_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Score a component directory. Never fails.
#[must_use]
pub fn score_component(
    path: &Path,
    component_type: ComponentType,
    options: &ScoreOptions,
) -> ComponentTestResult {
    let name = component_name(path);

    if !path.is_dir() {
        log::warn!("Component {} does not exist", path.display());
        return ComponentTestResult {
            component_name: name,
            component_type,
            component_path: path.to_path_buf(),
            checks: ComponentChecks::zero(),
            aggregate_score: 0.0,
            compliance_level: ComplianceLevel::Poor,
            passed: false,
            issues: vec!["directory does not exist".to_string()],
        };
    }

    let checks = ComponentChecks {
        naming: check_naming(&name, options.max_name_length),
        structure: check_structure(path, component_type),
        integration: check_integration(path, component_type).0,
        performance: check_performance(path, component_type),
    };
    let scores = checks.scores();
    let aggregate_score = clamp_score(scores.iter().sum::<f64>() / scores.len() as f64);
    let compliance_level = ComplianceLevel::from_score(aggregate_score);

    log::debug!(
        "{}/{}: {:.2} ({})",
        component_type,
        name,
        aggregate_score,
        compliance_level
    );

    ComponentTestResult {
        component_name: name,
        component_type,
        component_path: path.to_path_buf(),
        checks,
        aggregate_score,
        compliance_level,
        passed: aggregate_score >= PASS_SCORE,
        issues: Vec::new(),
    }
}

/// Single naming check, as exposed by `qa validate-naming`.
#[must_use]
pub fn validate_naming(name: &str, options: &ScoreOptions) -> CheckOutcome {
    check_naming(name, options.max_name_length)
}

/// Single structure check, as exposed by `qa validate-structure`.
#[must_use]
pub fn validate_structure(path: &Path, component_type: ComponentType) -> StructureCheck {
    check_structure(path, component_type)
}

/// QA failures that prevent a run.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("templates root not found: {0}")]
    RootNotFound(PathBuf),
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        log::warn!("Cannot read {}", dir.display());
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

/// Find every `root/{type}/{category}/{name}` directory.
///
/// Unknown type directories are skipped with a warning.
#[must_use]
pub fn discover_components(root: &Path) -> Vec<ComponentRef> {
    let mut components = Vec::new();
    for type_dir in sorted_subdirs(root) {
        let type_name = component_name(&type_dir);
        let Some(component_type) = ComponentType::from_dir_name(&type_name) else {
            if !type_name.starts_with('.') {
                log::warn!("Skipping unknown component type directory '{}'", type_name);
            }
            continue;
        };
        components.extend(discover_type(&type_dir, component_type));
    }
    components
}

fn discover_type(type_dir: &Path, component_type: ComponentType) -> Vec<ComponentRef> {
    sorted_subdirs(type_dir)
        .into_iter()
        .flat_map(|category_dir| {
            let category = component_name(&category_dir);
            sorted_subdirs(&category_dir)
                .into_iter()
                .map(move |path| ComponentRef {
                    component_type,
                    category: category.clone(),
                    name: component_name(&path),
                    path,
                })
        })
        .collect()
}

/// Pass/fail totals of a QA run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaSummary {
    pub total_components: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passed components, two decimals; 0 when empty
    pub pass_rate: f64,
}

impl QaSummary {
    #[must_use]
    pub fn from_results(results: &[ComponentTestResult]) -> Self {
        let total_components = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let pass_rate = if total_components == 0 {
            0.0
        } else {
            clamp_score(passed as f64 / total_components as f64 * 100.0)
        };
        Self {
            total_components,
            passed,
            failed: total_components - passed,
            pass_rate,
        }
    }
}

/// Results of scoring many components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRun {
    pub results: Vec<ComponentTestResult>,
    pub summary: QaSummary,
}

impl QaRun {
    #[must_use]
    pub fn from_results(results: Vec<ComponentTestResult>) -> Self {
        let summary = QaSummary::from_results(&results);
        Self { results, summary }
    }

    /// Components rated Poor.
    pub fn poor_components(&self) -> impl Iterator<Item = &ComponentTestResult> {
        self.results
            .iter()
            .filter(|r| r.compliance_level == ComplianceLevel::Poor)
    }

    #[must_use]
    pub fn report(&self) -> QaReport {
        let entry = |r: &ComponentTestResult| QaReportEntry {
            component_type: r.component_type,
            component_name: r.component_name.clone(),
            path: r.component_path.clone(),
            aggregate_score: r.aggregate_score,
            compliance_level: r.compliance_level,
            issues: r.all_issues().into_iter().map(str::to_string).collect(),
        };
        QaReport {
            timestamp: Utc::now(),
            summary: self.summary.clone(),
            passed_components: self.results.iter().filter(|r| r.passed).map(entry).collect(),
            failed_components: self.results.iter().filter(|r| !r.passed).map(entry).collect(),
        }
    }
}

fn score_all(components: &[ComponentRef], options: &ScoreOptions) -> QaRun {
    let results: Vec<ComponentTestResult> = components
        .par_iter()
        .map(|c| score_component(&c.path, c.component_type, options))
        .collect();
    let run = QaRun::from_results(results);
    log::info!(
        "QA: {} component(s), {} passed, {} failed ({:.2}%)",
        run.summary.total_components,
        run.summary.passed,
        run.summary.failed,
        run.summary.pass_rate
    );
    run
}

/// Score every discovered component.
///
/// # Errors
///
/// Returns `RootNotFound` when `root` is not a directory.
pub fn test_all(root: &Path, options: &ScoreOptions) -> Result<QaRun, QaError> {
    if !root.is_dir() {
        return Err(QaError::RootNotFound(root.to_path_buf()));
    }
    Ok(score_all(&discover_components(root), options))
}

/// Score every discovered component of one type.
///
/// # Errors
///
/// Returns `RootNotFound` when `root` is not a directory.
pub fn test_type(
    root: &Path,
    component_type: ComponentType,
    options: &ScoreOptions,
) -> Result<QaRun, QaError> {
    if !root.is_dir() {
        return Err(QaError::RootNotFound(root.to_path_buf()));
    }
    let components = discover_type(&root.join(component_type.dir_name()), component_type);
    Ok(score_all(&components, options))
}

/// One component in the QA report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReportEntry {
    pub component_type: ComponentType,
    pub component_name: String,
    pub path: PathBuf,
    pub aggregate_score: f64,
    pub compliance_level: ComplianceLevel,
    pub issues: Vec<String>,
}

/// Persisted QA report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReport {
    pub timestamp: DateTime<Utc>,
    pub summary: QaSummary,
    pub passed_components: Vec<QaReportEntry>,
    pub failed_components: Vec<QaReportEntry>,
}
