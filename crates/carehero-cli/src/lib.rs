//! CareHero CLI library.
//!
//! This library provides the core functionality for the `carehero` binary,
//! including configuration management, the chat REPL, the standalone
//! discovery command, and output formatting.

pub mod backends;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod repl;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
