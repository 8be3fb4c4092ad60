//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::{Path, PathBuf};

/// Execute the config command.
pub fn execute_config(args: ConfigArgs, path: Option<&Path>, formatter: &Formatter) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            print!("{}", Config::load(path)?.to_toml()?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", resolve(path)?.display());
            Ok(())
        }
        ConfigAction::Init { force } => init_config(path, force, formatter),
    }
}

fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::path(),
    }
}

/// Write the default configuration.
fn init_config(path: Option<&Path>, force: bool, formatter: &Formatter) -> Result<()> {
    let target = resolve(path)?;
    if target.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }

    let written = Config::default().save(Some(&target))?;
    println!(
        "{}",
        formatter.success(&format!("Wrote default configuration to {}", written.display()))
    );
    Ok(())
}
