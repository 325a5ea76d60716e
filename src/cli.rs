//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// CFR Explorer - browse federal agencies and the CFR titles they regulate
///
/// Loads the agency hierarchy, optionally filters it, and reports word
/// counts and change history for a selected agency.
///
/// Examples:
///   cfr-explorer --search transportation
///   cfr-explorer --agency environmental-protection-agency
///   cfr-explorer --agency environmental-protection-agency --title 40 --format json
///   cfr-explorer --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Base URL of the analyzer API
    ///
    /// Overrides the [api] base_url config setting.
    #[arg(long, value_name = "URL", env = "CFR_EXPLORER_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cfr-explorer.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Filter the agency tree by name or CFR title number
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Slug of the agency to select
    #[arg(short, long, value_name = "SLUG")]
    pub agency: Option<String>,

    /// CFR title to select within the agency
    #[arg(short, long, value_name = "TITLE", requires = "agency")]
    pub title: Option<u32>,

    /// Maximum concurrent title fetches
    #[arg(long, value_name = "NUM")]
    pub batch_size: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Fetch title word counts as of this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cfr-explorer.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
        }
    }

    /// Parse a config file value, falling back to Markdown.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Markdown,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.batch_size == Some(0) {
            return Err("Batch size must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref date) = self.as_of {
            if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(format!("Invalid --as-of date (expected YYYY-MM-DD): {}", date));
            }
        }

        if let Some(ref slug) = self.agency {
            if slug.trim().is_empty() {
                return Err("Agency slug must not be empty".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings. `verbose_default`
    /// comes from the config file; `--quiet` wins over both.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Args {
            api_url: None,
            config: None,
            search: None,
            agency: None,
            title: None,
            batch_size: None,
            timeout: None,
            as_of: None,
            format: None,
            output: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }
}
