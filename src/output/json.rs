//! JSON output and persisted reports.
//!
//! # Scan output schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "fingerprint": "full:af13...",
//!       "size": 84,
//!       "canonical": "templates/agents/core/a/agent.json",
//!       "duplicates": ["templates/agents/core/b/agent.json"]
//!     }
//!   ],
//!   "summary": {
//!     "totalFiles": 100,
//!     "duplicateGroups": 5,
//!     "reclaimableBytes": 51200,
//!     "exitCode": 0,
//!     "exitCodeName": "TO000"
//!   }
//! }
//! ```
//!
//! Reports are written with [`write_report`] into the report directory and
//! read back by the dashboards with [`read_report`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::actions::{EliminationMode, EliminationResult};
use crate::duplicates::{DuplicateGroup, GroupingStats};
use crate::error::ExitCode;

/// File name of the optimization report.
pub const OPTIMIZATION_REPORT_FILE: &str = "optimization-report.json";

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    pub fingerprint: String,
    /// Size of one copy in bytes
    pub size: u64,
    pub canonical: String,
    pub duplicates: Vec<String>,
}

impl JsonDuplicateGroup {
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.fingerprint().to_string(),
            size: group.canonical().size,
            canonical: group.canonical().path.to_string_lossy().into_owned(),
            duplicates: group
                .duplicates()
                .iter()
                .map(|d| d.path.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSummary {
    #[serde(flatten)]
    pub stats: GroupingStats,
    pub near_duplicates: usize,
    pub warnings: usize,
    pub exit_code: i32,
    pub exit_code_name: String,
}

/// Complete JSON scan output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    pub duplicates: Vec<JsonDuplicateGroup>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    #[must_use]
    pub fn new(
        groups: &[DuplicateGroup],
        stats: &GroupingStats,
        near_duplicates: usize,
        warnings: usize,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary {
                stats: stats.clone(),
                near_duplicates,
                warnings,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Write pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        let json = serde_json::to_string_pretty(self)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Statistics section of the optimization report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStats {
    pub files_scanned: usize,
    pub total_size: u64,
    pub duplicate_groups: usize,
    pub duplicate_files: usize,
    pub estimated_space_reclaimed: u64,
    pub near_duplicates: usize,
    pub redundancy_rate: f64,
    pub mode: Option<EliminationMode>,
}

impl OptimizationStats {
    #[must_use]
    pub fn from_grouping(stats: &GroupingStats, near_duplicates: usize) -> Self {
        Self {
            files_scanned: stats.total_files,
            total_size: stats.total_size,
            duplicate_groups: stats.duplicate_groups,
            duplicate_files: stats.duplicate_files,
            estimated_space_reclaimed: stats.reclaimable_bytes,
            near_duplicates,
            redundancy_rate: (stats.redundancy_rate() * 100.0).round() / 100.0,
            mode: None,
        }
    }
}

/// Persisted optimization report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub timestamp: DateTime<Utc>,
    pub optimization_stats: OptimizationStats,
    pub elimination_results: Option<EliminationResult>,
    pub recommendations: Vec<String>,
}

impl OptimizationReport {
    /// Build the report and derive its recommendations.
    #[must_use]
    pub fn new(mut stats: OptimizationStats, elimination: Option<EliminationResult>) -> Self {
        stats.mode = elimination.as_ref().map(|e| e.mode);
        let mut recommendations = Vec::new();

        if stats.duplicate_groups == 0 {
            recommendations.push("No exact duplicates found; the registry is clean".to_string());
        }
        match &elimination {
            None if stats.duplicate_files > 0 => recommendations.push(format!(
                "Run `templopt dedupe preview` to review {} duplicate file(s)",
                stats.duplicate_files
            )),
            Some(result) if result.mode == EliminationMode::Preview && !result.files_removed.is_empty() => {
                recommendations.push(format!(
                    "Run `templopt dedupe execute --yes` to reclaim {}",
                    bytesize::ByteSize::b(result.space_reclaimed)
                ));
            }
            Some(result) if !result.errors.is_empty() => recommendations.push(format!(
                "{} file(s) could not be removed; check permissions and rerun",
                result.errors.len()
            )),
            _ => {}
        }
        if stats.near_duplicates > 0 {
            recommendations.push(format!(
                "Review {} near-duplicate pair(s) for manual consolidation",
                stats.near_duplicates
            ));
        }
        if stats.redundancy_rate >= 25.0 {
            recommendations.push(format!(
                "Redundancy rate is {:.2}%; consider shared base templates",
                stats.redundancy_rate
            ));
        }

        Self {
            timestamp: Utc::now(),
            optimization_stats: stats,
            elimination_results: elimination,
            recommendations,
        }
    }
}

/// Write a report as pretty JSON, creating the directory if needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| OutputError::File {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(|e| OutputError::File {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::info!("Report written to {}", path.display());
    Ok(())
}

/// Read a report written by [`write_report`].
///
/// # Errors
///
/// Returns an error if the file is missing or not the expected JSON.
pub fn read_report<T: DeserializeOwned>(path: &Path) -> Result<T, OutputError> {
    let text = fs::read_to_string(path).map_err(|e| OutputError::File {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error during output: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error for {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
