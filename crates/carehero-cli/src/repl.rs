//! Interactive chat REPL.
//!
//! Anything that is not a command is sent to the assistant as a message.

use crate::config::carehero_dir;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use carehero_domain::{RequiredField, SessionStore};
use carehero_orchestrator::SessionOrchestrator;
use rustyline::error::ReadlineError;
use rustyline::{Config as EditorConfig, DefaultEditor};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tracing::error;

/// REPL command type.
#[derive(Debug, PartialEq)]
pub(crate) enum ReplCommand {
    Exit,
    Help,
    Status,
    Extract,
    Results,
    Correct { field: RequiredField, value: String },
    Say(String),
}

/// Parse a REPL line.
pub(crate) fn parse_repl_command(line: &str) -> Result<ReplCommand> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match (head, rest.is_empty()) {
        ("quit" | "exit" | "q", true) => Ok(ReplCommand::Exit),
        ("help" | "?", true) => Ok(ReplCommand::Help),
        ("status", true) => Ok(ReplCommand::Status),
        ("extract", true) => Ok(ReplCommand::Extract),
        ("results", true) => Ok(ReplCommand::Results),
        ("correct", _) => parse_correct(rest),
        _ => Ok(ReplCommand::Say(line.to_string())),
    }
}

fn parse_correct(args: &str) -> Result<ReplCommand> {
    let usage = || {
        CliError::InvalidInput(
            "Usage: correct <condition|zip|phone|insurance> <value>".to_string(),
        )
    };
    let (field, value) = args.split_once(char::is_whitespace).ok_or_else(usage)?;
    let field = RequiredField::parse(field).ok_or_else(usage)?;
    let value = value.trim();
    if value.is_empty() {
        return Err(usage());
    }
    Ok(ReplCommand::Correct {
        field,
        value: value.to_string(),
    })
}

/// Chat session state held by the REPL.
pub struct ChatSession<S: SessionStore> {
    orchestrator: SessionOrchestrator<S>,
    session_id: Option<String>,
}

impl<S> ChatSession<S>
where
    S: SessionStore,
    S::Error: fmt::Display,
{
    /// Wrap an orchestrator, optionally resuming `session_id`.
    pub fn new(orchestrator: SessionOrchestrator<S>, session_id: Option<String>) -> Self {
        Self {
            orchestrator,
            session_id,
        }
    }

    fn require_session(&self) -> Result<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| CliError::InvalidInput("No conversation yet. Say hello first.".into()))
    }

    async fn execute(&mut self, cmd: ReplCommand, formatter: &Formatter) -> Result<()> {
        match cmd {
            ReplCommand::Say(text) => {
                let turn = self
                    .orchestrator
                    .dispatch(self.session_id.as_deref(), &text)
                    .await?;
                self.session_id = Some(turn.session_id.clone());
                println!("{}", formatter.format_turn(&turn)?);
            }
            ReplCommand::Status => {
                let status = self.orchestrator.status(self.require_session()?)?;
                println!("{}", formatter.format_status(&status)?);
            }
            ReplCommand::Extract => {
                let session_id = self.require_session()?;
                let latest = self
                    .orchestrator
                    .archive()
                    .and_then(|a| a.load_extractions::<Value>(session_id).pop());
                match latest {
                    Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                    None => {
                        let status = self.orchestrator.status(session_id)?;
                        println!("{}", serde_json::to_string_pretty(&status.collected)?);
                    }
                }
            }
            ReplCommand::Correct { field, value } => {
                let session_id = self.require_session()?.to_string();
                self.orchestrator.correct_field(&session_id, field, &value)?;
                println!("{}", formatter.success(&format!("Updated {}", field.label())));
            }
            ReplCommand::Results => {
                let session_id = self.require_session()?.to_string();
                println!("{}", formatter.info("Waiting for appointment discovery..."));
                match self.orchestrator.await_discovery(&session_id).await? {
                    Some(report) => println!("{}", formatter.format_summaries(&report.summaries)?),
                    None => println!(
                        "{}",
                        formatter.warning("No appointment results yet. Finish the intake questions first.")
                    ),
                }
            }
            ReplCommand::Exit | ReplCommand::Help => {}
        }
        Ok(())
    }

    /// Run the interactive loop until `quit` or end of input.
    pub async fn run(mut self, formatter: &Formatter, history_size: usize) -> Result<()> {
        println!(
            "{}",
            formatter.info("CareHero - Tell me what brings you in today. Type 'help' for commands.")
        );
        if let Some(id) = &self.session_id {
            println!("{}", formatter.info(&format!("Resuming session {}", id)));
        }
        println!();

        let editor_config = EditorConfig::builder()
            .max_history_size(history_size)
            .map_err(|e| CliError::Config(format!("Invalid history size: {}", e)))?
            .build();
        let mut editor = DefaultEditor::with_config(editor_config).map_err(|e| {
            CliError::Io(std::io::Error::other(format!(
                "Failed to initialize editor: {}",
                e
            )))
        })?;

        let history_path = get_history_path()?;
        let _ = editor.load_history(&history_path);

        loop {
            match editor.readline("you> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line).ok();

                    match parse_repl_command(line) {
                        Ok(ReplCommand::Exit) => {
                            println!("{}", formatter.info("Take care!"));
                            break;
                        }
                        Ok(ReplCommand::Help) => print_help(formatter),
                        Ok(cmd) => {
                            if let Err(e) = self.execute(cmd, formatter).await {
                                error!(error = %e, "Chat command failed");
                                eprintln!("{}", formatter.error(&e.chat_message()));
                            }
                        }
                        Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", formatter.info("Use 'quit' to exit"));
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                    break;
                }
            }
        }

        editor.save_history(&history_path).ok();
        self.orchestrator.shutdown();
        Ok(())
    }
}

fn get_history_path() -> Result<PathBuf> {
    let dir = carehero_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("history.txt"))
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Available commands:"));
    println!();
    println!("  <message>                    - Talk to the assistant");
    println!("  status                       - Show what has been collected so far");
    println!("  extract                      - Show the latest structured extraction");
    println!("  correct <field> <value>      - Fix a collected value");
    println!("    field: condition | zip | phone | insurance");
    println!("  results                      - Wait for and show appointment results");
    println!("  help, ?                      - Show this help");
    println!("  quit, exit, q                - Leave the conversation");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(parse_repl_command("quit").unwrap(), ReplCommand::Exit);
        assert_eq!(parse_repl_command(" status ").unwrap(), ReplCommand::Status);
        assert_eq!(parse_repl_command("?").unwrap(), ReplCommand::Help);
        assert_eq!(parse_repl_command("results").unwrap(), ReplCommand::Results);
    }

    #[test]
    fn test_messages_pass_through() {
        assert_eq!(
            parse_repl_command("I have a headache").unwrap(),
            ReplCommand::Say("I have a headache".to_string())
        );
        // a command word followed by text is a message
        assert_eq!(
            parse_repl_command("status of my claim is unclear").unwrap(),
            ReplCommand::Say("status of my claim is unclear".to_string())
        );
    }

    #[test]
    fn test_correct() {
        assert_eq!(
            parse_repl_command("correct zip 10001").unwrap(),
            ReplCommand::Correct {
                field: RequiredField::ZipCode,
                value: "10001".to_string()
            }
        );
        assert_eq!(
            parse_repl_command("correct insurance Blue Cross PPO").unwrap(),
            ReplCommand::Correct {
                field: RequiredField::Insurance,
                value: "Blue Cross PPO".to_string()
            }
        );
    }

    #[test]
    fn test_correct_usage_errors() {
        assert!(parse_repl_command("correct").is_err());
        assert!(parse_repl_command("correct zip").is_err());
        assert!(parse_repl_command("correct age 42").is_err());
    }
}
