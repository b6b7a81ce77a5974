//! Tool-server domain types.
//!
//! These types describe external tool servers independently of how their
//! processes are spawned or how definitions are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime status of a tool server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Server is not running
    #[default]
    Stopped,
    /// Server process is alive and its pipes are attached
    Running,
    /// Server failed to start or exited unexpectedly
    Error(String),
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Environment variable override for a server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    /// Environment variable key
    pub key: String,
    /// Environment variable value
    pub value: String,
}

impl EnvEntry {
    /// Create a new environment variable entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Launch definition of an external tool server.
///
/// Definitions are immutable records: updating a server means replacing its
/// definition wholesale (see `ServerRegistry::update`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Stable identifier, also usable as the tool namespace.
    pub id: String,

    /// User-facing name; matched case-insensitively as an alternate namespace.
    pub name: String,

    /// Executable name or absolute path (e.g. "npx" or "/usr/bin/python3").
    pub command: String,

    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides applied on top of the inherited environment.
    #[serde(default)]
    pub env: Vec<EnvEntry>,

    /// Working directory for the process (must exist if specified).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Extra directories searched when resolving `command`, `:`-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_extra: Option<String>,

    /// Whether to start this server when the application launches.
    #[serde(default)]
    pub auto_start: bool,
}

impl ServerDefinition {
    /// Create a definition with no arguments or environment overrides.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            path_extra: None,
            auto_start: false,
        }
    }

    /// Set the argument list.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvEntry::new(key, value));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set auto-start.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Whether `namespace` addresses this server (id or display name,
    /// ASCII case-insensitive).
    pub fn matches_namespace(&self, namespace: &str) -> bool {
        self.id.eq_ignore_ascii_case(namespace) || self.name.eq_ignore_ascii_case(namespace)
    }

    /// Extra search directories from `path_extra`.
    pub fn search_paths(&self) -> Vec<String> {
        self.path_extra
            .as_deref()
            .map(|p| {
                p.split(':')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validate the definition before a spawn is attempted.
    ///
    /// Checks structure only; executable resolution happens at start time.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Server id cannot be empty".to_string());
        }

        if self.id.contains("::") {
            return Err(format!("Server id must not contain '::': {}", self.id));
        }

        if self.command.is_empty() {
            return Err("Server command cannot be empty".to_string());
        }

        if self.command.contains(char::is_whitespace) && !Path::new(&self.command).exists() {
            return Err(
                "Command must be an executable name/path only (e.g., 'npx'). \
                 Put flags and arguments in the 'args' field."
                    .to_string(),
            );
        }

        if let Some(ref cwd) = self.working_dir {
            if !cwd.is_empty() && !Path::new(cwd).is_absolute() {
                return Err(format!("working_dir must be absolute: {cwd}"));
            }
        }

        Ok(())
    }
}

/// Tool advertised by a server (from `tools/list`) or a local built-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name without namespace.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters.
    #[serde(
        default,
        rename = "inputSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<serde_json::Value>,
}

impl ToolDescriptor {
    /// Create a new tool descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Snapshot of a running server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningServerInfo {
    /// Server id.
    pub id: String,
    /// Display name at launch time.
    pub name: String,
    /// OS process id, if still known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// When the process was spawned.
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_definition() {
        let def = ServerDefinition::new("github", "GitHub", "npx")
            .with_args(["-y", "@modelcontextprotocol/server-github"])
            .with_env("GITHUB_TOKEN", "secret")
            .with_auto_start(true);

        assert_eq!(def.id, "github");
        assert_eq!(def.args.len(), 2);
        assert_eq!(def.env[0].key, "GITHUB_TOKEN");
        assert!(def.auto_start);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_matches_namespace_case_insensitive() {
        let def = ServerDefinition::new("github", "GitHub Tools", "npx");
        assert!(def.matches_namespace("GitHub"));
        assert!(def.matches_namespace("github tools"));
        assert!(!def.matches_namespace("slack"));
    }

    #[test]
    fn test_validate_rejects_command_with_flags() {
        let def = ServerDefinition::new("x", "X", "npx -y server");
        let err = def.validate().unwrap_err();
        assert!(err.contains("args"));
    }

    #[test]
    fn test_validate_rejects_relative_working_dir() {
        let def = ServerDefinition::new("x", "X", "node").with_working_dir("relative/dir");
        assert!(def.validate().unwrap_err().contains("absolute"));
    }

    #[test]
    fn test_validate_rejects_namespace_delimiter_in_id() {
        let def = ServerDefinition::new("a::b", "X", "node");
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_search_paths_split() {
        let mut def = ServerDefinition::new("x", "X", "node");
        def.path_extra = Some("/opt/bin::/custom/bin".to_string());
        assert_eq!(def.search_paths(), vec!["/opt/bin", "/custom/bin"]);
    }

    #[test]
    fn test_definition_deserializes_with_defaults() {
        let json = r#"{"id":"fs","name":"Files","command":"mcp-fs"}"#;
        let def: ServerDefinition = serde_json::from_str(json).unwrap();
        assert!(def.args.is_empty());
        assert!(def.env.is_empty());
        assert!(def.working_dir.is_none());
        assert!(!def.auto_start);
    }

    #[test]
    fn test_tool_descriptor_schema_rename() {
        let tool = ToolDescriptor::new("search")
            .with_description("Search issues")
            .with_input_schema(serde_json::json!({"type": "object"}));
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["inputSchema"]["type"], "object");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ServerStatus::Running.to_string(), "running");
        assert_eq!(
            ServerStatus::Error("boom".into()).to_string(),
            "error: boom"
        );
    }
}
