//! Configuration management for the CLI.
//!
//! The user config lives at `~/.carehero/config.toml`. The `[pipeline]`
//! section is an [`OrchestratorConfig`] and accepts every key it does.

use crate::error::{CliError, Result};
use carehero_discovery::{DEFAULT_WEBDRIVER_BROWSER, DEFAULT_WEBDRIVER_ENDPOINT};
use carehero_orchestrator::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Text-generation backend
    #[serde(default)]
    pub llm: LlmSettings,

    /// Search and question-answering backend
    #[serde(default)]
    pub search: SearchSettings,

    /// Browser automation backend
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Orchestrator and pipeline settings
    #[serde(default)]
    pub pipeline: OrchestratorConfig,
}

/// Ollama connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Ollama base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Retries for transient failures
    pub max_retries: u32,
}

/// Exa connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Environment variable holding the API key
    pub api_key_env: String,
}

/// WebDriver connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// WebDriver endpoint
    pub webdriver_url: String,
    /// Browser name requested from the endpoint
    pub browser: String,
    /// Run without a visible window
    pub headless: bool,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Command history size
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Keep chat sessions in this SQLite file instead of memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(carehero_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or the default location.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            config.pipeline.validate().map_err(CliError::Config)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`, or the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, self.to_toml()?)?;
        Ok(path)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            max_retries: 3,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key_env: "EXA_API_KEY".to_string(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_ENDPOINT.to_string(),
            browser: DEFAULT_WEBDRIVER_BROWSER.to_string(),
            headless: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            history_size: 1000,
            sqlite_path: None,
        }
    }
}

/// `~/.carehero`
pub(crate) fn carehero_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
    Ok(home.join(".carehero"))
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_history_size() -> usize {
    1000
}
