//! The four compliance checks.
//!
//! Each check returns a score in `[0, 100]` plus the messages that explain
//! lost points. Checks never fail; an unreadable file simply costs points.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::schema::{load_config, ComponentConfig, ConfigError};
use super::types::{Artifact, ComponentType};

/// Minimum score for a check to pass.
pub const PASS_SCORE: f64 = 70.0;

const NAMING_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";

/// Integration shares. A missing implementation dominates the check.
const CONFIG_SHARE: f64 = 30.0;
const IMPLEMENTATION_SHARE: f64 = 50.0;
const DOCUMENTATION_SHARE: f64 = 20.0;

/// Upper bound of the lightweight size tier.
pub const LIGHTWEIGHT_LIMIT: u64 = 100 * 1024;
/// Upper bound of the moderate size tier.
pub const MODERATE_LIMIT: u64 = 1024 * 1024;

/// Score and messages of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub score: f64,
    pub passed: bool,
    pub issues: Vec<String>,
}

impl CheckOutcome {
    fn new(score: f64, issues: Vec<String>) -> Self {
        let score = clamp_score(score);
        Self {
            score,
            passed: score >= PASS_SCORE,
            issues,
        }
    }

    /// A zero score with no messages.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            score: 0.0,
            passed: false,
            issues: Vec::new(),
        }
    }
}

/// Clamp to `[0, 100]` and round to two decimals.
#[must_use]
pub fn clamp_score(score: f64) -> f64 {
    let clamped = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
    (clamped * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureCheck {
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    pub missing_files: Vec<String>,
    pub extra_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationCheck {
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    pub conflicts: Vec<String>,
}

/// Size classification of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Lightweight,
    Moderate,
    Heavy,
}

impl SizeTier {
    #[must_use]
    pub fn from_size(bytes: u64) -> Self {
        if bytes <= LIGHTWEIGHT_LIMIT {
            Self::Lightweight
        } else if bytes <= MODERATE_LIMIT {
            Self::Moderate
        } else {
            Self::Heavy
        }
    }

    fn points(self) -> f64 {
        match self {
            Self::Lightweight => 50.0,
            Self::Moderate => 30.0,
            Self::Heavy => 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceCheck {
    #[serde(flatten)]
    pub outcome: CheckOutcome,
    pub size_bytes: u64,
    pub size_tier: SizeTier,
    /// `None` when the config could not be loaded
    pub load_time_ms: Option<f64>,
}

fn cached<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn is_match(cell: &OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cached(cell, pattern).is_some_and(|re| re.is_match(text))
}

fn is_kebab_case(name: &str) -> bool {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    is_match(&NAME, NAMING_PATTERN, name)
}

/// Whether `name` is kebab-case and within `max_length` characters.
///
/// Such a name is a single path segment, so it is safe to join onto a
/// directory.
#[must_use]
pub fn is_valid_name(name: &str, max_length: usize) -> bool {
    is_kebab_case(name) && name.chars().count() <= max_length
}

/// Check a component name against the naming convention.
#[must_use]
pub fn check_naming(name: &str, max_length: usize) -> CheckOutcome {
    let mut score = 0.0;
    let mut issues = Vec::new();

    if is_kebab_case(name) {
        score += 50.0;
    } else {
        issues.push(format!(
            "name '{}' is not lowercase kebab-case (letters, digits and single hyphens)",
            name
        ));
    }

    let length = name.chars().count();
    if length <= max_length {
        score += 30.0;
    } else {
        issues.push(format!(
            "name is {} characters long, limit is {}",
            length, max_length
        ));
    }

    if name.contains('-') {
        score += 20.0;
    } else {
        issues.push("name is a single word; prefer a descriptive hyphenated name".to_string());
    }

    CheckOutcome::new(score, issues)
}

/// Whether an implementation file looks like real code for its extension.
///
/// Extensions without a known declaration pattern only need to be non-empty.
#[must_use]
pub fn implementation_is_valid(extension: &str, content: &str) -> bool {
    static PS1: OnceLock<Option<Regex>> = OnceLock::new();
    static SH: OnceLock<Option<Regex>> = OnceLock::new();
    static PY: OnceLock<Option<Regex>> = OnceLock::new();
    static JS: OnceLock<Option<Regex>> = OnceLock::new();
    static RS: OnceLock<Option<Regex>> = OnceLock::new();
    static MD: OnceLock<Option<Regex>> = OnceLock::new();

    match extension.to_lowercase().as_str() {
        "ps1" | "psm1" => is_match(&PS1, r"(?i)\bfunction\s+[\w-]+|\bparam\s*\(", content),
        "sh" | "bash" => is_match(
            &SH,
            r"(?m)\A#!|^\s*[A-Za-z_][\w-]*\s*\(\)|\bfunction\s+[A-Za-z_]",
            content,
        ),
        "py" => is_match(&PY, r"(?m)^\s*(def|class|import|from)\s", content),
        "js" | "ts" | "mjs" | "cjs" => is_match(
            &JS,
            r"\b(function|const|export)\b|module\.exports",
            content,
        ),
        "rs" => is_match(&RS, r"\bfn\s+\w", content),
        "md" => is_match(&MD, r"(?m)^#{1,6}\s", content),
        _ => !content.trim().is_empty(),
    }
}

/// Whether documentation contains any markup.
#[must_use]
pub fn documentation_has_markup(content: &str) -> bool {
    static MARKUP: OnceLock<Option<Regex>> = OnceLock::new();
    is_match(
        &MARKUP,
        r"(?m)^#{1,6}\s|\*\*|^\s*```|^\s*[-*+]\s|^\s*\d+\.\s",
        content,
    )
}

/// Regular files directly inside a component directory, sorted by name.
#[must_use]
pub fn component_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// The implementation file of a component, if any.
#[must_use]
pub fn find_implementation(dir: &Path) -> Option<PathBuf> {
    component_files(dir)
        .into_iter()
        .find(|name| Artifact::Implementation.matches(name))
        .map(|name| dir.join(name))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Why an artifact that is present fails its validity heuristic.
fn artifact_problem(
    artifact: &Artifact,
    path: &Path,
    component_type: ComponentType,
) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return Some(format!("{} is unreadable: {}", path.display(), e)),
    };
    match artifact {
        Artifact::Config(_) => serde_json::from_str::<serde_json::Value>(&content)
            .err()
            .map(|e| format!("{} is not valid JSON: {}", component_type.config_file(), e)),
        Artifact::Implementation => {
            let ext = extension_of(path);
            (!implementation_is_valid(&ext, &content)).then(|| {
                format!(
                    "{} has no recognizable declaration for .{}",
                    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                    ext
                )
            })
        }
        Artifact::Documentation(name) => (!documentation_has_markup(&content))
            .then(|| format!("{} contains no markup", name)),
    }
}

/// Check presence and validity of the required artifacts.
#[must_use]
pub fn check_structure(dir: &Path, component_type: ComponentType) -> StructureCheck {
    let artifacts = component_type.required_artifacts();
    let share = 100.0 / artifacts.len() as f64;
    let files = component_files(dir);

    let mut score = 100.0;
    let mut issues = Vec::new();
    let mut missing_files = Vec::new();

    for artifact in &artifacts {
        let Some(found) = files.iter().find(|name| artifact.matches(name)) else {
            score -= share;
            missing_files.push(artifact.pattern());
            issues.push(format!("missing required file {}", artifact.pattern()));
            continue;
        };
        if let Some(problem) = artifact_problem(artifact, &dir.join(found), component_type) {
            score -= share / 2.0;
            issues.push(problem);
        }
    }

    let extra_files: Vec<String> = files
        .into_iter()
        .filter(|name| !artifacts.iter().any(|a| a.matches(name)))
        .collect();

    let outcome = CheckOutcome::new(score, issues);
    let passed = missing_files.is_empty() && outcome.passed;
    StructureCheck {
        outcome: CheckOutcome { passed, ..outcome },
        missing_files,
        extra_files,
    }
}

/// Check that config, implementation and documentation fit together.
///
/// Returns the parsed config alongside the check so later checks reuse it.
#[must_use]
pub fn check_integration(
    dir: &Path,
    component_type: ComponentType,
) -> (IntegrationCheck, Result<ComponentConfig, ConfigError>) {
    let mut score = 0.0;
    let mut conflicts = Vec::new();

    let config = load_config(&dir.join(component_type.config_file()), component_type);
    match &config {
        Ok(_) => score += CONFIG_SHARE,
        Err(e) => conflicts.push(e.to_string()),
    }

    if component_type.needs_implementation() {
        match find_implementation(dir) {
            Some(path) => {
                let valid = fs::read_to_string(&path)
                    .map(|content| implementation_is_valid(&extension_of(&path), &content))
                    .unwrap_or(false);
                if valid {
                    score += IMPLEMENTATION_SHARE;
                } else {
                    conflicts.push(format!(
                        "implementation {} fails its syntax heuristic",
                        path.display()
                    ));
                }
            }
            None => conflicts.push("no implementation file found".to_string()),
        }
    } else if config.is_ok() {
        score += IMPLEMENTATION_SHARE;
    }

    if dir.join(component_type.documentation_file()).is_file() {
        score += DOCUMENTATION_SHARE;
    } else {
        conflicts.push(format!(
            "documentation {} not found",
            component_type.documentation_file()
        ));
    }

    let check = IntegrationCheck {
        outcome: CheckOutcome::new(score, conflicts.clone()),
        conflicts,
    };
    (check, config)
}

/// Total on-disk size of every regular file under `dir`.
#[must_use]
pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Bucket size and config load time, plus a bonus for performance keys.
#[must_use]
pub fn check_performance(dir: &Path, component_type: ComponentType) -> PerformanceCheck {
    let size_bytes = directory_size(dir);
    let size_tier = SizeTier::from_size(size_bytes);
    let mut score = size_tier.points();
    let mut issues = Vec::new();
    if size_tier != SizeTier::Lightweight {
        issues.push(format!(
            "component is {:?} ({})",
            size_tier,
            bytesize::ByteSize::b(size_bytes)
        ));
    }

    let started = Instant::now();
    let config = load_config(&dir.join(component_type.config_file()), component_type);
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let load_time_ms = match config {
        Ok(config) => {
            score += if elapsed_ms < 10.0 {
                30.0
            } else if elapsed_ms < 100.0 {
                20.0
            } else {
                issues.push(format!("config took {:.1} ms to load", elapsed_ms));
                5.0
            };
            if config.common().has_performance_settings() {
                score += 20.0;
            } else {
                issues.push("no timeout, maxMemory or optimization settings".to_string());
            }
            Some(elapsed_ms)
        }
        Err(e) => {
            issues.push(format!("config could not be loaded: {}", e.kind));
            None
        }
    };

    PerformanceCheck {
        outcome: CheckOutcome::new(score, issues),
        size_bytes,
        size_tier,
        load_time_ms,
    }
}
