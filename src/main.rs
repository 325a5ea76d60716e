//! CFR Explorer - federal agency and CFR title browser
//!
//! A CLI tool that loads the agency hierarchy from the analyzer API,
//! filters it, and reports word counts and change history for a
//! selected agency.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, output, invalid arguments)
//!   2 - Requested agency or title not found

mod analysis;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod report;
mod search;
mod source;
mod state;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use source::HttpDataSource;
use state::Explorer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Configuration decides the default verbosity, so it loads first
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("CFR Explorer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Explorer failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cfr-explorer.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to set the API URL, batch size and date ranges.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load agencies, apply the requested search and selection, and write the
/// report. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let source = HttpDataSource::new(config.source_config())
        .context("Failed to create HTTP client")?;
    let explorer = Explorer::new(Arc::new(source), config.fetch.batch_size);

    let spinner = create_spinner(args.quiet);

    // Step 1: the agency forest
    spinner.set_message(format!("Loading agencies from {}", config.api.base_url));
    if explorer.load_agencies().await == 0 {
        warn!("No agencies available from {}", config.api.base_url);
    }

    if let Some(ref query) = args.search {
        explorer.set_search_query(query.as_str());
        info!(
            "Search {:?} matched {} agencies",
            query,
            search::count_nodes(&explorer.filtered_agencies())
        );
    }

    // Step 2: agency selection and its dependent loads
    if let Some(ref slug) = args.agency {
        let Some(agency) = search::find_by_slug(&explorer.agencies(), slug) else {
            spinner.finish_and_clear();
            eprintln!("⛔ Agency not found: {}", slug);
            return Ok(2);
        };

        spinner.set_message(format!("Loading data for {}", agency.label()));
        let progress = watch_progress(&explorer, &spinner);
        let loaded = explorer.select_agency(agency).await;
        progress.abort();
        loaded.context("Agency data task failed")?;

        // Step 3: optional title selection
        if let Some(title) = args.title {
            match explorer.select_title(title) {
                Some(refresh) => {
                    spinner.set_message(format!("Refreshing title {}", title));
                    refresh.await.context("Title refresh task failed")?;
                    debug!("Selected title: {:?}", explorer.selected_title());
                }
                None => {
                    spinner.finish_and_clear();
                    eprintln!("⛔ Title {} is not referenced by {}", title, slug);
                    return Ok(2);
                }
            }
        }
    }

    spinner.finish_and_clear();

    // Step 4: render
    let report = report::build_report(&explorer, &config.api.base_url);
    let format = args
        .format
        .unwrap_or_else(|| OutputFormat::from_name(&config.general.format));

    let output = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    info!("Done in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(0)
}

/// Mirror explorer state changes into the spinner message.
fn watch_progress(explorer: &Explorer, spinner: &ProgressBar) -> tokio::task::JoinHandle<()> {
    let mut changes = explorer.subscribe();
    let explorer = explorer.clone();
    let spinner = spinner.clone();

    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            spinner.set_message(format!(
                "Loaded {} titles, {} history points, {} changes",
                explorer.title_data().len(),
                explorer.selected_agency_history().len(),
                explorer.selected_agency_changes().len()
            ));
        }
    })
}

/// Spinner on stderr; hidden in quiet mode.
fn create_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Where the configuration came from. Logged once logging is set up.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Unreadable(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => {
                info!("Loaded default config from {}", config::CONFIG_FILE_NAME)
            }
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(format!("{:#}", e)))),
    }
}
