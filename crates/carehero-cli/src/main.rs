//! CareHero CLI - medical intake chat and appointment discovery.

use anyhow::Context;
use carehero_cli::commands;
use carehero_cli::config::OutputFormat;
use carehero_cli::{Cli, Command, Config, Formatter};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr so chat output on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Config management must work even when the file does not parse
    if let Some(Command::Config(args)) = cli.command {
        let format = cli.format.map(Into::into).unwrap_or(OutputFormat::Table);
        let formatter = Formatter::new(format, !cli.no_color);
        commands::execute_config(args, config_path, &formatter)?;
        return Ok(());
    }

    let config = Config::load(config_path).context("failed to load configuration")?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        None => {
            commands::execute_chat(Default::default(), &config, &formatter).await?;
        }
        Some(Command::Chat(args)) => {
            commands::execute_chat(args, &config, &formatter).await?;
        }
        Some(Command::Discover(args)) => {
            let input = args.input.display().to_string();
            commands::execute_discover(args, &config, &formatter)
                .await
                .with_context(|| format!("discovery over {} failed", input))?;
        }
        Some(Command::Config(_)) => unreachable!("handled before loading"),
    }

    Ok(())
}
