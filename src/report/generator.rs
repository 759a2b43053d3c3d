//! Report generation for one-shot aggregations.
//!
//! Renders an [`AggregateResponse`] as a Markdown summary or as the exact
//! JSON wire response.

use crate::models::{AggregateResponse, ResultRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Longest body excerpt shown in the Markdown table.
const MAX_EXCERPT_CHARS: usize = 60;

/// Generate a Markdown report.
pub fn generate_markdown_report(
    urls: &[String],
    response: &AggregateResponse,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    output.push_str("# UrlGather Report\n\n");
    output.push_str(&generate_summary_section(response, generated_at));
    output.push_str(&generate_results_section(urls, response));

    let failures: Vec<&ResultRecord> = response
        .responses
        .iter()
        .filter(|r| r.is_failure())
        .collect();
    if !failures.is_empty() {
        output.push_str(&generate_failures_section(urls, &failures));
    }

    output
}

fn generate_summary_section(response: &AggregateResponse, generated_at: DateTime<Utc>) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **URLs:** {}\n", response.responses.len()));
    section.push_str(&format!("- **Responses:** {}\n", response.succeeded()));
    if response.failed() > 0 {
        section.push_str(&format!("- **Failures:** {}\n", response.failed()));
    }
    section.push_str(&format!(
        "- **Total Duration:** {}ms\n",
        response.total_duration_millis
    ));
    section.push_str(&format!(
        "- **Slowest Request:** {}ms\n",
        response.slowest_millis()
    ));
    section.push('\n');

    section
}

fn generate_results_section(urls: &[String], response: &AggregateResponse) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");
    section.push_str("| # | URL | Status | Duration | Body |\n");
    section.push_str("|---|-----|--------|----------|------|\n");

    for record in &response.responses {
        let url = urls.get(record.index).map(String::as_str).unwrap_or("?");
        let status = if record.is_failure() {
            "failed".to_string()
        } else {
            record.status.to_string()
        };
        let body = record.body.as_deref().map(excerpt).unwrap_or_default();

        section.push_str(&format!(
            "| {} | {} | {} | {}ms | {} |\n",
            record.index + 1,
            url,
            status,
            record.duration_millis,
            body
        ));
    }
    section.push('\n');

    section
}

fn generate_failures_section(urls: &[String], failures: &[&ResultRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Failures\n\n");
    for record in failures {
        let url = urls.get(record.index).map(String::as_str).unwrap_or("?");
        section.push_str(&format!(
            "- **{}**: {}\n",
            url,
            record.error.as_deref().unwrap_or("unknown error")
        ));
    }
    section.push('\n');

    section
}

/// Single-line, table-safe excerpt of a body.
fn excerpt(body: &str) -> String {
    let flat: String = body
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let flat = flat.trim().replace('|', "\\|");

    if flat.chars().count() > MAX_EXCERPT_CHARS {
        let cut: String = flat.chars().take(MAX_EXCERPT_CHARS).collect();
        format!("`{}…`", cut)
    } else {
        format!("`{}`", flat)
    }
}

/// Generate the JSON wire response.
pub fn generate_json_report(response: &AggregateResponse) -> Result<String> {
    serde_json::to_string_pretty(response).context("Failed to serialize aggregate response")
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
