//! UrlGather - concurrent URL fan-out aggregator
//!
//! Fetches a list of URLs concurrently and delivers every outcome,
//! success or failure, as one response ordered like the input.
//! Runs as an HTTP service (`POST /aggregate`) or once from the CLI.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bind failure, config error, deadline exceeded, etc.)
//!   2 - A request failed and --fail-on-error was set

mod aggregation;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod report;
mod server;

use aggregation::{Aggregator, Task};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use client::{ClientOptions, ReqwestClient};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("UrlGather v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = if args.is_one_shot() {
        run_once(args).await
    } else {
        run_server(args).await.map(|_| 0)
    };

    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .urlgather.toml.
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
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = log_filter(args.log_level(), rust_log.as_deref());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
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

/// `RUST_LOG` directives win when present and valid; otherwise the CLI level applies.
fn log_filter(level: tracing::Level, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.to_string()))
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}

fn build_aggregator(config: &Config) -> Result<Aggregator> {
    let client = ReqwestClient::new(&ClientOptions::from(&config.client))
        .context("Failed to create HTTP client")?;
    Ok(Aggregator::new(Arc::new(client)))
}

/// Run the HTTP service until shutdown.
async fn run_server(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let aggregator = build_aggregator(&config)?;

    let state = server::AppState {
        aggregator,
        max_urls: config.aggregation.max_urls,
        deadline: config.aggregation.deadline(),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;

    server::serve(listener, state).await
}

/// Aggregate the CLI URLs once and write a report. Returns the exit code.
async fn run_once(args: Args) -> Result<i32> {
    let config = load_config(&args)?;

    if args.urls.len() > config.aggregation.max_urls {
        anyhow::bail!(
            "{} URLs given, at most {} allowed",
            args.urls.len(),
            config.aggregation.max_urls
        );
    }

    let aggregator = build_aggregator(&config)?;
    let (task, rx) = Task::channel(args.urls.clone());
    let task = Arc::new(task);
    let watched = Arc::downgrade(&task);
    let total = args.urls.len();

    aggregator.execute(task);

    let response = if args.quiet {
        server::wait_for(rx, config.aggregation.deadline()).await?
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let progress = {
            let spinner = spinner.clone();
            tokio::spawn(async move {
                // Only a weak handle: the sink must close if the client drops the task.
                while let Some(task) = watched.upgrade() {
                    let settled = total - task.remaining();
                    drop(task);
                    spinner.set_message(format!("settled {}/{}", settled, total));
                    if settled == total {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            })
        };

        let outcome = server::wait_for(rx, config.aggregation.deadline()).await;
        progress.abort();
        spinner.finish_and_clear();
        outcome?
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&response)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&args.urls, &response, Utc::now())
        }
    };

    match args.output {
        Some(ref path) => {
            report::write_report(&output, path)?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => println!("{}", output),
    }

    if args.fail_on_error && response.failed() > 0 {
        eprintln!(
            "\n⛔ {} of {} requests failed. Failing (exit code 2).",
            response.failed(),
            response.responses.len()
        );
        return Ok(2);
    }

    Ok(0)
}
