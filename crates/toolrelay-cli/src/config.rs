//! Settings and servers-file loading.

use std::path::{Path, PathBuf};

use toolrelay_core::{RegistryEntry, ServerRegistry, Settings, SettingsUpdate, validate_settings};

use crate::error::CliError;
use crate::parser::Cli;

/// Servers file looked up in the working directory when none is given.
pub const DEFAULT_SERVERS_FILE: &str = "toolrelay.servers.json";

/// Settings from command-line flags (and their environment fallbacks).
pub fn settings_from_cli(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = Settings::with_defaults();
    settings.merge(&SettingsUpdate {
        tool_call_timeout_secs: cli.tool_timeout.map(Some),
        provider_url: cli.provider_url.clone().map(Some),
        model: cli.model.clone().map(Some),
        system_prompt: cli.system_prompt.clone().map(Some),
        ..SettingsUpdate::default()
    });
    validate_settings(&settings)?;
    Ok(settings)
}

/// Read a servers file: a JSON array of server definitions, each with an
/// optional `enabled` flag (default `true`).
pub fn load_servers(path: &Path) -> Result<ServerRegistry, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
    let entries: Vec<RegistryEntry> = serde_json::from_str(&text)
        .map_err(|e| CliError::Config(format!("invalid servers file {}: {e}", path.display())))?;
    Ok(ServerRegistry::from_entries(entries)?)
}

/// Load the registry from `explicit`, or from the default file if present.
///
/// A missing default file yields an empty registry; a missing explicit file
/// is an error.
pub fn load_registry(explicit: Option<&Path>) -> Result<(ServerRegistry, Option<PathBuf>), CliError> {
    if let Some(path) = explicit {
        return Ok((load_servers(path)?, Some(path.to_path_buf())));
    }

    let default = PathBuf::from(DEFAULT_SERVERS_FILE);
    if default.is_file() {
        return Ok((load_servers(&default)?, Some(default)));
    }
    tracing::debug!("no servers file, starting with an empty registry");
    Ok((ServerRegistry::new(), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_servers_file() {
        let file = write_file(
            r#"[
                {"id": "github", "name": "GitHub", "command": "npx",
                 "args": ["-y", "@modelcontextprotocol/server-github"],
                 "env": [{"key": "GITHUB_TOKEN", "value": "t"}]},
                {"id": "fs", "name": "Files", "command": "mcp-fs", "enabled": false}
            ]"#,
        );

        let registry = load_servers(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_enabled("github"));
        assert!(!registry.is_enabled("fs"));
        assert_eq!(registry.get("github").unwrap().args.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let file = write_file(
            r#"[{"id": "a", "name": "A", "command": "x"}, {"id": "a", "name": "B", "command": "y"}]"#,
        );
        assert!(matches!(load_servers(file.path()), Err(CliError::Config(_))));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_file("{not json");
        let err = load_servers(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid servers file"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("servers.json");
        assert!(load_registry(Some(&missing)).is_err());
    }

    #[test]
    fn test_settings_from_flags() {
        let cli = Cli::parse_from([
            "toolrelay",
            "--provider-url",
            "http://gpu:11434/",
            "--tool-timeout",
            "5",
            "tools",
        ]);
        let settings = settings_from_cli(&cli).unwrap();
        assert_eq!(settings.effective_provider_url(), "http://gpu:11434");
        assert_eq!(settings.tool_call_timeout().as_secs(), 5);

        let cli = Cli::parse_from(["toolrelay", "--tool-timeout", "0", "tools"]);
        assert!(matches!(settings_from_cli(&cli), Err(CliError::Config(_))));
    }
}
