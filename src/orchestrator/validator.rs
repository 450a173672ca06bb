//! Final validation of the template tree.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compliance::{check_structure, discover_components};

/// A component that lacks required files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub path: PathBuf,
    pub missing_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub components_checked: usize,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validates a template tree after the other phases ran.
pub trait Validator: Send + Sync {
    fn validate(&self, root: &Path) -> ValidationReport;
}

/// Checks every discovered component against its required-file table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureValidator;

impl Validator for StructureValidator {
    fn validate(&self, root: &Path) -> ValidationReport {
        let components = discover_components(root);
        let failures: Vec<ValidationFailure> = components
            .iter()
            .filter_map(|component| {
                let check = check_structure(&component.path, component.component_type);
                (!check.missing_files.is_empty()).then(|| ValidationFailure {
                    path: component.path.clone(),
                    missing_files: check.missing_files,
                })
            })
            .collect();

        for failure in &failures {
            log::warn!(
                "{} is missing {}",
                failure.path.display(),
                failure.missing_files.join(", ")
            );
        }

        ValidationReport {
            components_checked: components.len(),
            failures,
        }
    }
}
