//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cfr-explorer.toml` files.

use crate::fetch::DEFAULT_BATCH_SIZE;
use crate::source::SourceConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".cfr-explorer.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default report format ("markdown" or "json").
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Analyzer API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the analyzer API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    60 // full-title XML counts can be slow upstream
}

/// Fetch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum concurrent title fetches per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Date to request title word counts for (YYYY-MM-DD). Latest if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<String>,

    /// First date of the word-count history range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_start_date: Option<String>,

    /// Last date of the word-count history range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_end_date: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            as_of_date: None,
            history_start_date: None,
            history_end_date: None,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(batch_size) = args.batch_size {
            self.fetch.batch_size = batch_size;
        }
        if let Some(ref date) = args.as_of {
            self.fetch.as_of_date = Some(date.clone());
        }
        if let Some(format) = args.format {
            self.general.format = format.as_str().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Settings for the HTTP data source.
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            base_url: self.api.base_url.clone(),
            timeout_seconds: self.api.timeout_seconds,
            as_of_date: self.fetch.as_of_date.clone(),
            history_start_date: self.fetch.history_start_date.clone(),
            history_end_date: self.fetch.history_end_date.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
