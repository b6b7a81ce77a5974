//! CLI error type and exit codes.

use thiserror::Error;
use toolrelay_core::{ProviderError, RegistryError, SettingsError};
use toolrelay_mcp::ProcessError;

#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command-line input.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Settings or servers file problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tool server failed to start or exited.
    #[error("Process error: {0}")]
    Process(String),

    /// The model provider failed.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl CliError {
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::Process(_) => 71,  // EX_OSERR
            Self::Provider(_) => 69, // EX_UNAVAILABLE
        }
    }

    /// Exit code for any error reaching `main`.
    pub fn exit_code_for(err: &anyhow::Error) -> u8 {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<Self>())
            .map_or(1, Self::exit_code)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}
