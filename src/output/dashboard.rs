//! Human-readable summaries.
//!
//! Every renderer returns a `String` so commands can print it and tests can
//! inspect it. Colouring goes through `yansi`; call `yansi::disable()` once
//! at startup for `--no-color`.

use std::path::Path;

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::{CleanResult, EliminationResult};
use crate::compliance::{
    CheckOutcome, ComplianceLevel, ComponentTestResult, QaReport, QaRun, QaSummary,
    StructureCheck,
};
use crate::duplicates::{DuplicateDatabase, DuplicateGroup, GroupingStats};
use crate::orchestrator::{OrchestrationReport, PhaseStatus, RunState};
use crate::output::json::OptimizationReport;

fn heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn level(level: ComplianceLevel) -> String {
    let text = level.to_string();
    match level {
        ComplianceLevel::Excellent => text.green().bold().to_string(),
        ComplianceLevel::Good => text.cyan().to_string(),
        ComplianceLevel::Acceptable => text.yellow().to_string(),
        ComplianceLevel::Poor => text.red().bold().to_string(),
    }
}

fn verdict(passed: bool) -> String {
    if passed {
        "PASS".green().bold().to_string()
    } else {
        "FAIL".red().bold().to_string()
    }
}

fn push_list(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(format!("{}", title.bold()));
    lines.extend(items.iter().map(|item| format!("  - {}", item)));
}

/// Summary of a scan and its groups.
#[must_use]
pub fn scan_summary(
    groups: &[DuplicateGroup],
    stats: &GroupingStats,
    near_duplicates: usize,
    warnings: usize,
) -> String {
    let mut lines = vec![heading("Duplicate scan")];
    lines.push(format!(
        "Files scanned:       {} ({})",
        stats.total_files,
        ByteSize::b(stats.total_size)
    ));
    lines.push(format!("Duplicate groups:    {}", stats.duplicate_groups.yellow()));
    lines.push(format!("Duplicate files:     {}", stats.duplicate_files.red()));
    lines.push(format!(
        "Reclaimable:         {}",
        ByteSize::b(stats.reclaimable_bytes).to_string().green()
    ));
    lines.push(format!("Redundancy rate:     {:.2}%", stats.redundancy_rate()));
    if near_duplicates > 0 {
        lines.push(format!("Near-duplicate pairs: {}", near_duplicates));
    }
    if warnings > 0 {
        lines.push(format!("Warnings:            {}", warnings.yellow()));
    }

    for (idx, group) in groups.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!(
            "Group {} ({} x {})",
            idx + 1,
            group.len(),
            ByteSize::b(group.canonical().size)
        ));
        lines.push(format!("  keep   {}", group.canonical().relative_path.display().green()));
        for duplicate in group.duplicates() {
            lines.push(format!("  remove {}", duplicate.relative_path.display().red()));
        }
    }
    lines.join("\n")
}

/// Summary of a preview or an execution.
#[must_use]
pub fn elimination_summary(result: &EliminationResult) -> String {
    let mut lines = vec![heading(&format!("Elimination ({})", result.mode))];
    lines.push(result.summary());
    for removed in &result.files_removed {
        lines.push(format!(
            "  {} {} (kept {})",
            "-".red(),
            removed.path.display(),
            removed.kept_as.display()
        ));
    }
    if let Some(location) = &result.backup_location {
        lines.push(format!("Backup: {}", location.display().cyan()));
    }
    push_list(&mut lines, "Errors", &result.errors);
    lines.join("\n")
}

#[must_use]
pub fn clean_summary(result: &CleanResult) -> String {
    let mut lines = vec![heading("Empty directory cleanup")];
    lines.push(format!("Removed {} empty director(ies)", result.count()));
    lines.extend(result.removed.iter().map(|d| format!("  - {}", d.display())));
    push_list(&mut lines, "Errors", &result.errors);
    lines.join("\n")
}

/// Last optimization report, optionally with the last scan database.
#[must_use]
pub fn optimization_dashboard(
    report: &OptimizationReport,
    database: Option<&DuplicateDatabase>,
) -> String {
    let stats = &report.optimization_stats;
    let mut lines = vec![heading("Template optimization dashboard")];
    lines.push(format!(
        "Report from {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(db) = database {
        lines.push(format!(
            "Last scan of {} at {}",
            db.scan_path.display(),
            db.scan_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    lines.push(format!(
        "Files: {}  Groups: {}  Duplicates: {}  Reclaimable: {}",
        stats.files_scanned,
        stats.duplicate_groups,
        stats.duplicate_files,
        ByteSize::b(stats.estimated_space_reclaimed)
    ));
    lines.push(format!("Redundancy rate: {:.2}%", stats.redundancy_rate));
    if let Some(result) = &report.elimination_results {
        lines.push(format!("Last elimination: {}", result.summary()));
    }
    push_list(&mut lines, "Recommendations", &report.recommendations);
    lines.join("\n")
}

fn summary_line(summary: &QaSummary) -> String {
    format!(
        "{} component(s): {} passed, {} failed, pass rate {:.2}%",
        summary.total_components,
        summary.passed.green(),
        summary.failed.red(),
        summary.pass_rate
    )
}

fn component_line(result: &ComponentTestResult) -> String {
    format!(
        "  {} {:<10} {:<40} {:>6.2}  {}",
        verdict(result.passed),
        result.component_type.to_string(),
        result.component_name,
        result.aggregate_score,
        level(result.compliance_level)
    )
}

#[must_use]
pub fn qa_run(run: &QaRun) -> String {
    let mut lines = vec![heading("Quality assurance")];
    lines.push(summary_line(&run.summary));
    lines.extend(run.results.iter().map(component_line));
    for result in run.results.iter().filter(|r| !r.passed) {
        let issues: Vec<String> = result.all_issues().into_iter().map(str::to_string).collect();
        push_list(
            &mut lines,
            &format!("Issues in {}", result.component_path.display()),
            &issues,
        );
    }
    lines.join("\n")
}

/// Detailed view of one scored component.
#[must_use]
pub fn component_detail(result: &ComponentTestResult) -> String {
    let checks = &result.checks;
    let mut lines = vec![heading(&format!(
        "{} ({})",
        result.component_name, result.component_type
    ))];
    for (name, outcome) in [
        ("naming", &checks.naming),
        ("structure", &checks.structure.outcome),
        ("integration", &checks.integration.outcome),
        ("performance", &checks.performance.outcome),
    ] {
        lines.push(format!("  {:<12} {:>6.2}  {}", name, outcome.score, verdict(outcome.passed)));
    }
    lines.push(format!(
        "Aggregate {:.2}: {}",
        result.aggregate_score,
        level(result.compliance_level)
    ));
    let issues: Vec<String> = result.all_issues().into_iter().map(str::to_string).collect();
    push_list(&mut lines, "Issues", &issues);
    lines.join("\n")
}

#[must_use]
pub fn qa_dashboard(report: &QaReport) -> String {
    let mut lines = vec![heading("Quality assurance dashboard")];
    lines.push(format!(
        "Report from {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(summary_line(&report.summary));
    let failed: Vec<String> = report
        .failed_components
        .iter()
        .map(|c| {
            format!(
                "{} {} {:.2} {}",
                c.component_type,
                c.component_name,
                c.aggregate_score,
                level(c.compliance_level)
            )
        })
        .collect();
    push_list(&mut lines, "Failed components", &failed);
    lines.join("\n")
}

#[must_use]
pub fn naming_result(name: &str, outcome: &CheckOutcome) -> String {
    let mut lines = vec![format!(
        "Name '{}': {:.2} {}",
        name,
        outcome.score,
        verdict(outcome.passed)
    )];
    push_list(&mut lines, "Issues", &outcome.issues);
    lines.join("\n")
}

#[must_use]
pub fn structure_result(path: &Path, check: &StructureCheck) -> String {
    let mut lines = vec![format!(
        "Structure of {}: {:.2} {}",
        path.display(),
        check.outcome.score,
        verdict(check.outcome.passed)
    )];
    push_list(&mut lines, "Missing files", &check.missing_files);
    push_list(&mut lines, "Extra files", &check.extra_files);
    push_list(&mut lines, "Issues", &check.outcome.issues);
    lines.join("\n")
}

fn status(status: PhaseStatus) -> String {
    let text = format!("{:?}", status);
    match status {
        PhaseStatus::Completed => text.green().to_string(),
        PhaseStatus::Failed => text.red().bold().to_string(),
        PhaseStatus::Skipped => text.yellow().to_string(),
        PhaseStatus::NotStarted | PhaseStatus::Running => text,
    }
}

#[must_use]
pub fn execution_report(report: &OrchestrationReport) -> String {
    let summary = &report.execution_summary;
    let overall = match summary.overall_status {
        RunState::Completed => "Completed".green().bold().to_string(),
        RunState::Aborted => "Aborted".red().bold().to_string(),
        other => format!("{:?}", other),
    };
    let mut lines = vec![heading(&format!(
        "Pipeline '{}'{}",
        summary.mode,
        if summary.dry_run { " (dry run)" } else { "" }
    ))];
    lines.push(format!(
        "Status: {}  Success rate: {:.2}%  Duration: {:.2}s",
        overall, summary.success_rate, summary.duration_seconds
    ));

    for phase in &report.phase_results {
        lines.push(format!(
            "  {:<18} {:<10} {:>7.2}s{}",
            phase.name.label(),
            status(phase.status),
            phase.duration_seconds,
            if phase.critical { "  critical" } else { "" }
        ));
        for error in &phase.errors {
            lines.push(format!("      {}", error.as_str().red()));
        }
    }

    let stats = &report.statistics;
    lines.push(String::new());
    lines.push(format!(
        "Scanned {} file(s), removed {} ({}), installed {} file(s)",
        stats.files_scanned,
        stats.files_removed,
        ByteSize::b(stats.space_reclaimed),
        stats.files_installed
    ));
    lines.push(format!(
        "Tested {} component(s), {} passed, {} Poor; {} checkpoint(s)",
        stats.components_tested, stats.components_passed, stats.poor_components, stats.checkpoints
    ));
    push_list(&mut lines, "Recommendations", &report.recommendations);
    lines.join("\n")
}
