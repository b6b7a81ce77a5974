//! Resolution of server commands to absolute executable paths.
//!
//! A bare command such as `npx` is looked up, in order, in `PATH`, in the
//! definition's `path_extra` directories, then in platform default
//! directories. Absolute commands are checked directly and fall back to a
//! basename search when the file is missing.

mod probe;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use probe::{EnvProvider, FsProvider, Rejection, SystemEnv, SystemFs};

#[cfg(test)]
pub use probe::{MockEnv, MockFs};

#[cfg(unix)]
const PATH_SEPARATOR: char = ':';
#[cfg(windows)]
const PATH_SEPARATOR: char = ';';

#[cfg(target_os = "macos")]
const PLATFORM_DEFAULT_DIRS: &[&str] = &[
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
];

#[cfg(all(unix, not(target_os = "macos")))]
const PLATFORM_DEFAULT_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin", "/bin", "/snap/bin"];

#[cfg(windows)]
const PLATFORM_DEFAULT_DIRS: &[&str] = &[];

/// A rejected candidate, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub candidate: PathBuf,
    pub rejection: Rejection,
}

/// A successfully resolved command.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub path: PathBuf,
    /// Candidates rejected before the match.
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Could not resolve '{command}' to an executable. Tried:\n{tried}")]
    NotResolved { command: String, tried: String },
}

impl ResolveError {
    fn not_resolved(command: &str, attempts: &[Attempt]) -> Self {
        let tried = if attempts.is_empty() {
            "  (no candidates)".to_string()
        } else {
            attempts
                .iter()
                .map(|a| format!("  {}: {}", a.candidate.display(), a.rejection))
                .collect::<Vec<_>>()
                .join("\n")
        };
        Self::NotResolved {
            command: command.to_string(),
            tried,
        }
    }
}

/// Resolve `command` against the real environment.
pub fn resolve_executable(command: &str, extra_dirs: &[String]) -> Result<Resolved, ResolveError> {
    resolve_with(command, extra_dirs, &SystemEnv, &SystemFs)
}

/// Resolve with injected environment and filesystem.
pub fn resolve_with(
    command: &str,
    extra_dirs: &[String],
    env: &dyn EnvProvider,
    fs: &dyn FsProvider,
) -> Result<Resolved, ResolveError> {
    if command.trim().is_empty() {
        return Err(ResolveError::EmptyCommand);
    }

    let mut attempts = Vec::new();
    let as_path = Path::new(command);

    let name = if as_path.is_absolute() {
        match fs.check_executable(as_path) {
            Ok(()) => {
                return Ok(Resolved {
                    path: as_path.to_path_buf(),
                    attempts,
                });
            }
            Err(rejection) => attempts.push(Attempt {
                candidate: as_path.to_path_buf(),
                rejection,
            }),
        }
        match as_path.file_name().and_then(|n| n.to_str()) {
            Some(base) => {
                tracing::debug!(command, fallback = base, "Absolute command unusable, searching basename");
                base
            }
            None => return Err(ResolveError::not_resolved(command, &attempts)),
        }
    } else {
        command
    };

    for dir in search_dirs(env, extra_dirs) {
        let candidate = dir.join(name);
        match fs.check_executable(&candidate) {
            Ok(()) => {
                return Ok(Resolved {
                    path: candidate,
                    attempts,
                });
            }
            Err(rejection) => attempts.push(Attempt {
                candidate,
                rejection,
            }),
        }
    }

    Err(ResolveError::not_resolved(command, &attempts))
}

/// Search directories in priority order, deduplicated.
fn search_dirs(env: &dyn EnvProvider, extra_dirs: &[String]) -> Vec<PathBuf> {
    let from_path = env
        .var("PATH")
        .map(|p| {
            p.to_string_lossy()
                .split(PATH_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut seen = std::collections::HashSet::new();
    from_path
        .into_iter()
        .chain(extra_dirs.iter().map(PathBuf::from))
        .chain(PLATFORM_DEFAULT_DIRS.iter().map(PathBuf::from))
        .filter(|dir| seen.insert(dir.clone()))
        .collect()
}

/// Build the `PATH` handed to a child process.
///
/// The resolved executable's directory comes first so interpreter shims
/// (`#!/usr/bin/env node`) find their sibling binaries.
pub fn child_path(executable: &Path, extra_dirs: &[String]) -> std::ffi::OsString {
    let mut dirs: Vec<PathBuf> = executable.parent().map(Path::to_path_buf).into_iter().collect();
    dirs.extend(search_dirs(&SystemEnv, extra_dirs));

    let mut seen = std::collections::HashSet::new();
    let joined = dirs
        .into_iter()
        .filter(|d| seen.insert(d.clone()))
        .map(|d| d.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string());
    std::ffi::OsString::from(joined)
}
