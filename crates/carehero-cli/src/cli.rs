//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CareHero - medical intake assistant and appointment finder.
#[derive(Debug, Parser)]
#[command(name = "carehero")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CAREHERO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive intake conversation (default)
    Chat(ChatArgs),

    /// Discover appointments for institutions listed in a JSON file
    Discover(DiscoverArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the chat command.
#[derive(Debug, Default, Parser)]
pub struct ChatArgs {
    /// Resume an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Do not start background discovery
    #[arg(long)]
    pub no_discovery: bool,
}

/// Arguments for the discover command.
#[derive(Debug, Parser)]
pub struct DiscoverArgs {
    /// JSON array of institutions
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write results and summaries here (also updated after every batch)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the number of institutions processed concurrently
    #[arg(long)]
    pub max_concurrent: Option<usize>,
}

/// Arguments for config management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config management actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_chat() {
        let cli = Cli::parse_from(["carehero"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_discover_command() {
        let cli = Cli::parse_from([
            "carehero",
            "discover",
            "--input",
            "institutions.json",
            "-o",
            "out.json",
            "--max-concurrent",
            "2",
        ]);
        match cli.command {
            Some(Command::Discover(args)) => {
                assert_eq!(args.input, PathBuf::from("institutions.json"));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
                assert_eq!(args.max_concurrent, Some(2));
            }
            _ => panic!("Expected Discover command"),
        }
    }

    #[test]
    fn test_discover_requires_input() {
        assert!(Cli::try_parse_from(["carehero", "discover"]).is_err());
    }

    #[test]
    fn test_config_init_force() {
        let cli = Cli::parse_from(["carehero", "config", "init", "--force"]);
        match cli.command {
            Some(Command::Config(ConfigArgs {
                action: ConfigAction::Init { force },
            })) => assert!(force),
            _ => panic!("Expected config init"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["carehero", "chat", "--no-color", "-f", "json", "-s", "abc"]);
        assert!(cli.no_color);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        match cli.command {
            Some(Command::Chat(args)) => assert_eq!(args.session.as_deref(), Some("abc")),
            _ => panic!("Expected Chat command"),
        }
    }
}
