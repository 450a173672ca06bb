//! Component installation.
//!
//! The Installation phase delegates to an [`Installer`]. The default
//! [`ManifestInstaller`] creates each configured component directory with
//! boilerplate files and never overwrites anything that already exists.
//! Entries whose category or name is not a kebab-case segment are refused
//! before anything is written.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::compliance::{is_valid_name, ComponentType, ScoreOptions};
use crate::config::InstallSpec;

/// Files written, files left alone and failures of an installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<PathBuf>,
    pub skipped_existing: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl InstallReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Installs components into a template tree.
pub trait Installer: Send + Sync {
    fn install(&self, root: &Path, specs: &[InstallSpec]) -> InstallReport;
}

/// Materialises components described in the `[[install]]` config table.
#[derive(Debug, Clone, Copy)]
pub struct ManifestInstaller {
    max_name_length: usize,
}

impl Default for ManifestInstaller {
    fn default() -> Self {
        Self::new(ScoreOptions::default().max_name_length)
    }
}

impl ManifestInstaller {
    #[must_use]
    pub fn new(max_name_length: usize) -> Self {
        Self { max_name_length }
    }

    fn rejection(&self, spec: &InstallSpec) -> Option<String> {
        [("category", &spec.category), ("name", &spec.name)]
            .into_iter()
            .find(|(_, value)| !is_valid_name(value, self.max_name_length))
            .map(|(field, value)| {
                format!(
                    "refusing to install {} '{}': {} '{}' must be kebab-case and at most {} characters",
                    spec.component_type, spec.name, field, value, self.max_name_length
                )
            })
    }

    fn files_for(spec: &InstallSpec) -> Vec<(String, String)> {
        let component_type = spec.component_type;
        let mut config = json!({
            "name": spec.name,
            "description": if spec.description.is_empty() {
                format!("{} {}", spec.name, component_type)
            } else {
                spec.description.clone()
            },
            "version": "1.0.0",
        });
        match component_type {
            ComponentType::Hooks => config["event"] = json!("PreToolUse"),
            ComponentType::Mcp => config["command"] = json!("node"),
            _ => {}
        }
        let config_text = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());

        let mut files = vec![(component_type.config_file().to_string(), config_text)];
        if component_type.needs_implementation() {
            let function = spec.name.replace('-', "_");
            files.push((
                "implementation.sh".to_string(),
                format!(
                    "#!/usr/bin/env bash\nset -euo pipefail\n\n{}() {{\n  echo \"{}\"\n}}\n\n{} \"$@\"\n",
                    function, spec.name, function
                ),
            ));
        }
        files.push((
            component_type.documentation_file().to_string(),
            format!(
                "# {}\n\n{}\n\n## Usage\n\n- Category: `{}`\n- Type: `{}`\n",
                spec.name, spec.description, spec.category, component_type
            ),
        ));
        files
    }
}

fn write_new(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())
}

impl Installer for ManifestInstaller {
    fn install(&self, root: &Path, specs: &[InstallSpec]) -> InstallReport {
        let mut report = InstallReport::default();

        for spec in specs {
            if let Some(reason) = self.rejection(spec) {
                log::warn!("{}", reason);
                report.errors.push(reason);
                continue;
            }
            let dir = root
                .join(spec.component_type.dir_name())
                .join(&spec.category)
                .join(&spec.name);
            if let Err(e) = fs::create_dir_all(&dir) {
                report
                    .errors
                    .push(format!("failed to create {}: {}", dir.display(), e));
                continue;
            }

            for (name, content) in Self::files_for(spec) {
                let path = dir.join(name);
                match write_new(&path, &content) {
                    Ok(()) => {
                        log::debug!("Installed {}", path.display());
                        report.installed.push(path);
                    }
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        report.skipped_existing.push(path);
                    }
                    Err(e) => report
                        .errors
                        .push(format!("failed to write {}: {}", path.display(), e)),
                }
            }
        }

        log::info!(
            "Installation: {} file(s) written, {} existing kept, {} error(s)",
            report.installed.len(),
            report.skipped_existing.len(),
            report.errors.len()
        );
        report
    }
}
