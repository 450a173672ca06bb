//! Typed component configuration.
//!
//! Each component type has its own schema. Config files are parsed once at
//! the boundary into a [`ComponentConfig`]; later checks never look at raw
//! JSON again.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::ComponentType;

/// Fields every component config carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonFields {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timeout: Option<Value>,
    #[serde(default)]
    pub max_memory: Option<Value>,
    #[serde(default)]
    pub optimization: Option<Value>,
}

impl CommonFields {
    /// Whether any performance-related key is present.
    #[must_use]
    pub fn has_performance_settings(&self) -> bool {
        self.timeout.is_some() || self.max_memory.is_some() || self.optimization.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(default)]
    pub permissions: Option<Map<String, Value>>,
    #[serde(default)]
    pub env: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(flatten)]
    pub common: CommonFields,
    pub event: String,
    #[serde(default)]
    pub matcher: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(flatten)]
    pub common: CommonFields,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    #[serde(flatten)]
    pub common: CommonFields,
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// A parsed config of any component type.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentConfig {
    Agent(AgentConfig),
    Command(CommandConfig),
    Settings(SettingsConfig),
    Hook(HookConfig),
    Mcp(McpConfig),
    Skill(SkillConfig),
}

impl ComponentConfig {
    #[must_use]
    pub fn common(&self) -> &CommonFields {
        match self {
            Self::Agent(c) => &c.common,
            Self::Command(c) => &c.common,
            Self::Settings(c) => &c.common,
            Self::Hook(c) => &c.common,
            Self::Mcp(c) => &c.common,
            Self::Skill(c) => &c.common,
        }
    }

    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Agent(_) => ComponentType::Agents,
            Self::Command(_) => ComponentType::Commands,
            Self::Settings(_) => ComponentType::Settings,
            Self::Hook(_) => ComponentType::Hooks,
            Self::Mcp(_) => ComponentType::Mcp,
            Self::Skill(_) => ComponentType::Skills,
        }
    }
}

/// Why a config could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigErrorKind {
    #[error("config file is missing")]
    Missing,
    #[error("config file is unreadable: {0}")]
    Unreadable(String),
    #[error("config is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("config does not match the schema: {0}")]
    SchemaViolation(String),
}

/// A config load failure with the file it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {kind}", .path.display())]
pub struct ConfigError {
    pub path: PathBuf,
    pub kind: ConfigErrorKind,
}

fn typed<T: DeserializeOwned>(value: Value) -> Result<T, ConfigErrorKind> {
    serde_json::from_value(value).map_err(|e| ConfigErrorKind::SchemaViolation(e.to_string()))
}

/// Parse config text against the schema of `component_type`.
///
/// # Errors
///
/// `InvalidJson` when the text is not JSON, `SchemaViolation` when it is
/// JSON but does not fit the schema.
pub fn parse_config(
    component_type: ComponentType,
    text: &str,
) -> Result<ComponentConfig, ConfigErrorKind> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ConfigErrorKind::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ConfigErrorKind::SchemaViolation(
            "top-level value must be an object".to_string(),
        ));
    }
    Ok(match component_type {
        ComponentType::Agents => ComponentConfig::Agent(typed(value)?),
        ComponentType::Commands => ComponentConfig::Command(typed(value)?),
        ComponentType::Settings => ComponentConfig::Settings(typed(value)?),
        ComponentType::Hooks => ComponentConfig::Hook(typed(value)?),
        ComponentType::Mcp => ComponentConfig::Mcp(typed(value)?),
        ComponentType::Skills => ComponentConfig::Skill(typed(value)?),
    })
}

/// Read and parse a config file.
///
/// # Errors
///
/// See [`ConfigErrorKind`].
pub fn load_config(path: &Path, component_type: ComponentType) -> Result<ComponentConfig, ConfigError> {
    let wrap = |kind| ConfigError {
        path: path.to_path_buf(),
        kind,
    };
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => wrap(ConfigErrorKind::Missing),
        _ => wrap(ConfigErrorKind::Unreadable(e.to_string())),
    })?;
    parse_config(component_type, &text).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_agent() {
        let config = parse_config(
            ComponentType::Agents,
            r#"{"name":"code-reviewer","description":"Reviews code","tools":["read"],"timeout":30}"#,
        )
        .unwrap();

        assert_eq!(config.component_type(), ComponentType::Agents);
        assert_eq!(config.common().name, "code-reviewer");
        assert!(config.common().has_performance_settings());
        let ComponentConfig::Agent(agent) = config else {
            panic!("expected agent config");
        };
        assert_eq!(agent.tools, vec!["read".to_string()]);
        assert_eq!(agent.model, None);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_config(ComponentType::Agents, "{not json").unwrap_err();
        assert!(matches!(err, ConfigErrorKind::InvalidJson(_)));
    }

    #[test]
    fn test_parse_missing_required_field() {
        let err = parse_config(ComponentType::Skills, r#"{"name":"x"}"#).unwrap_err();
        assert!(matches!(err, ConfigErrorKind::SchemaViolation(ref m) if m.contains("description")));

        // Hooks additionally need an event.
        let err = parse_config(ComponentType::Hooks, r#"{"name":"x","description":"y"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigErrorKind::SchemaViolation(ref m) if m.contains("event")));
    }

    #[test]
    fn test_parse_non_object() {
        let err = parse_config(ComponentType::Settings, "[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigErrorKind::SchemaViolation(_)));
    }

    #[test]
    fn test_parse_mcp_and_settings() {
        let mcp = parse_config(
            ComponentType::Mcp,
            r#"{"name":"fs","description":"Files","command":"npx","args":["server"]}"#,
        )
        .unwrap();
        assert!(matches!(mcp, ComponentConfig::Mcp(ref m) if m.command == "npx"));

        let settings = parse_config(
            ComponentType::Settings,
            r#"{"name":"base","description":"Defaults","env":{"A":"1"}}"#,
        )
        .unwrap();
        assert!(!settings.common().has_performance_settings());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.json");
        let err = load_config(&path, ComponentType::Agents).unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::Missing);
        assert_eq!(err.path, path);
        assert!(err.to_string().contains("missing"));
    }
}
