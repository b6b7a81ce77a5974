//! `toolrelay` command-line adapter.
//!
//! Wires the supervisor, dispatcher and provider together and exposes them
//! as subcommands.

pub mod bootstrap;
pub mod builtins;
pub mod commands;
pub mod config;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
