//! Line-overlap similarity for text-like templates (deep scan only).
//!
//! For every unordered pair of files that share one of the configured
//! extensions and are not already exact duplicates of each other, the
//! similarity is the number of lines the two files have in common
//! (multiset intersection) divided by the longer file's line count. This is
//! a best-effort heuristic and is quadratic in the number of files per
//! extension.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::groups::DuplicateGroup;
use crate::scanner::FileRecord;

/// Pairs above this similarity are reported.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 90.0;

/// Classification of a compared pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Below the near-duplicate threshold
    Distinct,
    /// At least 90% and below 100% of lines shared
    NearDuplicate,
    /// Every line shared
    Exact,
}

impl Classification {
    /// Classify a similarity percentage.
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            Self::Exact
        } else if percent >= NEAR_DUPLICATE_THRESHOLD {
            Self::NearDuplicate
        } else {
            Self::Distinct
        }
    }
}

/// A reported pair of similar files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityEdge {
    /// First file (earlier in traversal order)
    pub file_a: PathBuf,
    /// Second file
    pub file_b: PathBuf,
    /// Shared-line percentage, rounded to two decimals
    pub similarity_percent: f64,
    /// Derived classification
    pub classification: Classification,
}

/// Shared-line percentage between two texts, rounded to two decimals.
///
/// Returns `None` when both texts are empty.
#[must_use]
pub fn line_similarity(a: &str, b: &str) -> Option<f64> {
    let a_lines: Vec<&str> = a.lines().collect();
    let b_lines: Vec<&str> = b.lines().collect();
    let longest = a_lines.len().max(b_lines.len());
    if longest == 0 {
        return None;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in &b_lines {
        *counts.entry(*line).or_default() += 1;
    }
    let mut shared = 0usize;
    for line in &a_lines {
        if let Some(count) = counts.get_mut(line) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    let percent = shared as f64 / longest as f64 * 100.0;
    Some((percent * 100.0).round() / 100.0)
}

/// Find pairs of similar text files among scanned records.
///
/// `extensions` are compared case-insensitively and without a leading dot.
/// Unreadable or non-UTF-8 files are skipped with a warning.
#[must_use]
pub fn find_near_duplicates(
    records: &[FileRecord],
    groups: &[DuplicateGroup],
    extensions: &[String],
) -> Vec<SimilarityEdge> {
    let wanted: HashSet<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut by_extension: BTreeMap<String, Vec<(&FileRecord, String)>> = BTreeMap::new();
    for record in records {
        let Some(ext) = record.extension() else {
            continue;
        };
        if !wanted.contains(&ext) {
            continue;
        }
        match fs::read_to_string(&record.path) {
            Ok(text) => by_extension.entry(ext).or_default().push((record, text)),
            Err(e) => log::warn!(
                "Skipping {} for similarity: {}",
                record.path.display(),
                e
            ),
        }
    }

    let grouped: HashSet<&str> = groups
        .iter()
        .map(|g| g.fingerprint().as_str())
        .collect();

    let mut edges = Vec::new();
    for files in by_extension.values() {
        for (i, (a, a_text)) in files.iter().enumerate() {
            for (b, b_text) in files.iter().skip(i + 1) {
                // Same exact group.
                if a.fingerprint == b.fingerprint && grouped.contains(a.fingerprint.as_str()) {
                    continue;
                }
                let Some(percent) = line_similarity(a_text, b_text) else {
                    continue;
                };
                if percent > NEAR_DUPLICATE_THRESHOLD {
                    log::debug!(
                        "Near duplicate {:.2}%: {} ~ {}",
                        percent,
                        a.relative_path.display(),
                        b.relative_path.display()
                    );
                    edges.push(SimilarityEdge {
                        file_a: a.path.clone(),
                        file_b: b.path.clone(),
                        similarity_percent: percent,
                        classification: Classification::from_percent(percent),
                    });
                }
            }
        }
    }

    log::info!("Similarity pass found {} near-duplicate pair(s)", edges.len());
    edges
}
