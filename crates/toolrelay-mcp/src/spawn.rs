//! Launching a server process from its definition.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use toolrelay_core::ServerDefinition;

use crate::error::ProcessError;
use crate::resolver::{child_path, resolve_executable};
use crate::stderr::StderrLog;

/// A freshly spawned process with stdin/stdout detached for the caller and
/// stderr already being captured.
pub struct SpawnedServer {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: StderrLog,
    /// Completes once stderr reaches EOF.
    pub stderr_task: JoinHandle<()>,
}

/// Check that `cwd` exists and is a directory.
pub fn validate_working_dir(cwd: &str) -> Result<(), String> {
    let path = Path::new(cwd);
    if !path.exists() {
        return Err(format!("Working directory does not exist: {cwd}"));
    }
    if !path.is_dir() {
        return Err(format!("Working directory is not a directory: {cwd}"));
    }
    Ok(())
}

/// Validate, resolve and spawn `definition` with all three stdio streams piped.
///
/// The child is killed if its handle is dropped without being reaped.
pub fn spawn_server(definition: &ServerDefinition) -> Result<SpawnedServer, ProcessError> {
    let invalid = |reason: String| ProcessError::InvalidDefinition {
        server_id: definition.id.clone(),
        reason,
    };

    definition.validate().map_err(invalid)?;
    if let Some(cwd) = definition.working_dir.as_deref().filter(|c| !c.is_empty()) {
        validate_working_dir(cwd).map_err(invalid)?;
    }

    let extra_dirs = definition.search_paths();
    let resolved = resolve_executable(&definition.command, &extra_dirs)?;
    tracing::debug!(
        server_id = %definition.id,
        command = %definition.command,
        resolved = %resolved.path.display(),
        "resolved server command"
    );

    let mut command = Command::new(&resolved.path);
    command
        .args(&definition.args)
        .env("PATH", child_path(&resolved.path, &extra_dirs))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for entry in &definition.env {
        command.env(&entry.key, &entry.value);
    }
    if let Some(cwd) = definition.working_dir.as_deref().filter(|c| !c.is_empty()) {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        command: resolved.path.display().to_string(),
        source,
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or(ProcessError::PipeUnavailable("stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or(ProcessError::PipeUnavailable("stdout"))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or(ProcessError::PipeUnavailable("stderr"))?;

    let stderr = StderrLog::new();
    let stderr_task = stderr.capture(&definition.id, stderr_pipe);

    Ok(SpawnedServer {
        child,
        stdin,
        stdout,
        stderr,
        stderr_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_working_dir(dir.path().to_str().unwrap()).is_ok());

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = validate_working_dir(file.to_str().unwrap()).unwrap_err();
        assert!(err.contains("not a directory"));

        let err = validate_working_dir("/nonexistent/toolrelay-dir").unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_spawn_rejects_missing_working_dir() {
        let def = ServerDefinition::new("x", "X", "sh").with_working_dir("/nonexistent/toolrelay-dir");
        let Err(err) = spawn_server(&def) else {
            panic!("expected failure");
        };
        assert!(matches!(err, ProcessError::InvalidDefinition { .. }));
    }

    #[tokio::test]
    async fn test_spawn_unresolvable_command() {
        let def = ServerDefinition::new("x", "X", "toolrelay-no-such-binary");
        let Err(err) = spawn_server(&def) else {
            panic!("expected failure");
        };
        assert!(matches!(err, ProcessError::NotResolved(_)));
        assert!(err.to_string().contains("toolrelay-no-such-binary"));
    }
}
