//! Component types and their required artifacts.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of template component, named after its top-level directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Agents,
    Commands,
    Settings,
    Hooks,
    Mcp,
    Skills,
}

impl ComponentType {
    /// Every type, in directory-name order.
    pub const ALL: [ComponentType; 6] = [
        Self::Agents,
        Self::Commands,
        Self::Hooks,
        Self::Mcp,
        Self::Settings,
        Self::Skills,
    ];

    /// Top-level directory holding components of this type.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Agents => "agents",
            Self::Commands => "commands",
            Self::Settings => "settings",
            Self::Hooks => "hooks",
            Self::Mcp => "mcp",
            Self::Skills => "skills",
        }
    }

    #[must_use]
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.dir_name() == name)
    }

    /// Required config file name.
    #[must_use]
    pub fn config_file(self) -> &'static str {
        match self {
            Self::Agents => "agent.json",
            Self::Commands => "command.json",
            Self::Settings => "settings.json",
            Self::Hooks => "hook.json",
            Self::Mcp => "mcp.json",
            Self::Skills => "skill.json",
        }
    }

    /// Whether an `implementation.*` file is required.
    #[must_use]
    pub fn needs_implementation(self) -> bool {
        !matches!(self, Self::Settings)
    }

    /// Required documentation file name.
    #[must_use]
    pub fn documentation_file(self) -> &'static str {
        match self {
            Self::Skills => "SKILL.md",
            _ => "README.md",
        }
    }

    /// Required artifacts in check order.
    #[must_use]
    pub fn required_artifacts(self) -> Vec<Artifact> {
        let mut artifacts = vec![Artifact::Config(self.config_file())];
        if self.needs_implementation() {
            artifacts.push(Artifact::Implementation);
        }
        artifacts.push(Artifact::Documentation(self.documentation_file()));
        artifacts
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Stem shared by every implementation file.
pub const IMPLEMENTATION_STEM: &str = "implementation";

/// A required file of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Config(&'static str),
    /// Any file named `implementation.<ext>`
    Implementation,
    Documentation(&'static str),
}

impl Artifact {
    /// Name or pattern as reported in `missing_files`.
    #[must_use]
    pub fn pattern(&self) -> String {
        match self {
            Self::Config(name) | Self::Documentation(name) => (*name).to_string(),
            Self::Implementation => format!("{}.*", IMPLEMENTATION_STEM),
        }
    }

    /// Whether a file name satisfies this artifact.
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::Config(name) | Self::Documentation(name) => file_name == *name,
            Self::Implementation => file_name
                .strip_prefix(IMPLEMENTATION_STEM)
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|ext| !ext.is_empty()),
        }
    }
}

/// A discovered component directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    pub component_type: ComponentType,
    pub category: String,
    pub name: String,
    pub path: PathBuf,
}
