//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// UrlGather - concurrent URL fan-out aggregator
///
/// Fetches many URLs at once and returns every outcome in a single
/// response, ordered as requested. Runs as an HTTP service by default,
/// or aggregates once from the command line with --url.
///
/// Examples:
///   urlgather
///   urlgather --listen 0.0.0.0:8080 --deadline 10
///   urlgather --url https://example.com,https://example.org
///   urlgather --url https://example.com --format json --output result.json
///   urlgather --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// URLs to aggregate once, then exit (comma-separated or repeated)
    ///
    /// When omitted, urlgather starts the HTTP service instead.
    #[arg(short, long = "url", value_name = "URL", value_delimiter = ',')]
    pub urls: Vec<String>,

    /// Address for the HTTP service to listen on
    #[arg(short, long, value_name = "ADDR", env = "URLGATHER_LISTEN")]
    pub listen: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .urlgather.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file for the one-shot report (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for the one-shot report (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Overall deadline for one aggregation in seconds
    ///
    /// Without a deadline, an aggregation waits for every request to settle.
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Maximum number of URLs accepted per aggregation
    #[arg(long, value_name = "COUNT")]
    pub max_urls: Option<usize>,

    /// Exit with code 2 if any request failed at the transport level
    #[arg(long)]
    pub fail_on_error: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .urlgather.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the one-shot report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown table (default)
    #[default]
    Markdown,
    /// The JSON aggregate response
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// True when URLs were given on the command line.
    pub fn is_one_shot(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        for url in &self.urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.deadline == Some(0) {
            return Err("Deadline must be at least 1 second".to_string());
        }

        if self.max_urls == Some(0) {
            return Err("Max URLs must be at least 1".to_string());
        }

        if let Some(ref max_urls) = self.max_urls {
            if self.urls.len() > *max_urls {
                return Err(format!(
                    "{} URLs given but --max-urls is {}",
                    self.urls.len(),
                    max_urls
                ));
            }
        }

        if let Some(ref listen) = self.listen {
            if listen.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("Invalid listen address: {}", listen));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
