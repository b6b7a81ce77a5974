//! Injectable environment and filesystem access for command resolution.

use std::ffi::OsString;
use std::path::Path;

/// Why a candidate path was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    NotAFile,
    NotExecutable,
    Io(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::NotAFile => f.write_str("not a file"),
            Self::NotExecutable => f.write_str("not executable"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

/// Read access to process environment variables.
pub trait EnvProvider {
    fn var(&self, key: &str) -> Option<OsString>;
}

/// Executable checks against a filesystem.
pub trait FsProvider {
    fn check_executable(&self, path: &Path) -> Result<(), Rejection>;
}

/// The real process environment.
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }
}

/// The real filesystem.
pub struct SystemFs;

impl FsProvider for SystemFs {
    fn check_executable(&self, path: &Path) -> Result<(), Rejection> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Rejection::NotFound);
            }
            Err(e) => return Err(Rejection::Io(e.to_string())),
        };

        if !metadata.is_file() {
            return Err(Rejection::NotAFile);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return Err(Rejection::NotExecutable);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MockEnv {
    vars: std::collections::HashMap<String, OsString>,
}

#[cfg(test)]
impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
impl EnvProvider for MockEnv {
    fn var(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }
}

/// Filesystem where only the listed paths are executables.
#[cfg(test)]
#[derive(Default)]
pub struct MockFs {
    executables: std::collections::HashSet<std::path::PathBuf>,
}

#[cfg(test)]
impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_executable(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.executables.insert(path.into());
        self
    }
}

#[cfg(test)]
impl FsProvider for MockFs {
    fn check_executable(&self, path: &Path) -> Result<(), Rejection> {
        if self.executables.contains(path) {
            Ok(())
        } else {
            Err(Rejection::NotFound)
        }
    }
}
