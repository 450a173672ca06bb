//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a TOML file: `--config FILE`, else `./templopt.toml`, else
//!    `config.toml` in the platform config directory
//! 3. `TEMPLOPT_` environment variables (`__` separates nested keys, e.g.
//!    `TEMPLOPT_QA__MIN_PASS_RATE=80`)
//!
//! Command-line flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::EliminationMode;
use crate::compliance::{ComponentType, ScoreOptions};
use crate::scanner::WalkerConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TEMPLOPT_";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "templopt.toml";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the template registry.
    pub templates_root: PathBuf,
    /// Where JSON reports are written.
    pub report_dir: PathBuf,
    /// Where backups and checkpoints are written.
    pub backup_dir: PathBuf,
    /// gitignore-style patterns skipped by the scanner.
    pub ignore_patterns: Vec<String>,
    pub follow_symlinks: bool,
    pub dedupe: DedupeConfig,
    pub qa: QaConfig,
    pub pipeline: PipelineConfig,
    /// Components materialised by the Installation phase.
    pub install: Vec<InstallSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_root: PathBuf::from("templates"),
            report_dir: PathBuf::from(".templopt/reports"),
            backup_dir: PathBuf::from(".templopt/backups"),
            ignore_patterns: vec![".git".to_string(), ".templopt".to_string()],
            follow_symlinks: false,
            dedupe: DedupeConfig::default(),
            qa: QaConfig::default(),
            pipeline: PipelineConfig::default(),
            install: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Also compare text files line by line.
    pub deep_scan: bool,
    /// Refuse to delete without a backup.
    pub backup_required: bool,
    /// Extensions considered by the near-duplicate pass.
    pub near_duplicate_extensions: Vec<String>,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            deep_scan: false,
            backup_required: true,
            near_duplicate_extensions: [
                "md", "txt", "json", "yaml", "yml", "toml", "ps1", "sh", "py", "js", "ts",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub max_name_length: usize,
    /// Pass rate (percent) below which the QA phase fails.
    pub min_pass_rate: f64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            max_name_length: 50,
            min_pass_rate: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stop_on_critical_failure: bool,
    /// Snapshot the tree before each phase.
    pub backup_checkpoints: bool,
    pub elimination_mode: EliminationMode,
    pub critical: CriticalPhases,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stop_on_critical_failure: true,
            backup_checkpoints: true,
            elimination_mode: EliminationMode::Execute,
            critical: CriticalPhases::default(),
        }
    }
}

/// Which phases abort the run when they fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalPhases {
    pub analysis: bool,
    pub elimination: bool,
    pub installation: bool,
    pub quality_assurance: bool,
    pub final_validation: bool,
}

impl Default for CriticalPhases {
    fn default() -> Self {
        Self {
            analysis: true,
            elimination: false,
            installation: false,
            quality_assurance: false,
            final_validation: true,
        }
    }
}

/// A component to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSpec {
    pub component_type: ComponentType,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Config {
    /// Build the layered figment without extracting it.
    ///
    /// # Errors
    ///
    /// Fails when an explicit config file does not exist.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("config file not found: {}", path.display());
                }
                log::debug!("Using config file {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::discover_file() {
                    log::debug!("Using config file {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from every layer.
    ///
    /// # Errors
    ///
    /// Fails on a missing explicit file or a value of the wrong type.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::figment(explicit)?
            .extract()
            .context("invalid configuration")
    }

    fn discover_file() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::config_path().filter(|p| p.is_file())
    }

    /// The platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "templopt", "templopt")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Walker settings that also keep the engine out of its own output.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.follow_symlinks, self.ignore_patterns.clone())
            .with_excluded(&self.report_dir)
            .with_excluded(&self.backup_dir)
    }

    #[must_use]
    pub fn score_options(&self) -> ScoreOptions {
        ScoreOptions {
            max_name_length: self.qa.max_name_length,
        }
    }
}
