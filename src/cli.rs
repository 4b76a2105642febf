//! # jira-export CLI Interface (Module)
//!
//! Command parsing and run orchestration glue for the `jira-export` binary.
//! All pipeline logic lives in `jira-export-core`; this module only turns
//! arguments, the optional YAML file and the environment into an
//! [`ExportConfig`], opens the Jira session and hands over to
//! [`run_export`].
//!
//! ## How To Use
//! - Command line: `jira-export export|html|pdf [--config FILE] ...`, see `--help`.
//! - Programmatic/integration use: call [`run`] with a constructed [`Cli`].

use crate::load_config::{build_export_config, load_config, FileConfig, Overrides};
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use jira_export_core::config::{ExportConfig, RunMode};
use jira_export_core::export::{run_export, ExportSummary, HtmlSource};
use jira_export_core::jira::{JiraClient, JiraCredentials};
use jira_export_core::keys::read_issue_keys;
use jira_export_core::pdf::PdfEngine;
use std::path::PathBuf;

/// CLI for jira-export: turn Jira issues into self-contained HTML and PDF files.
#[derive(Parser)]
#[clap(
    name = "jira-export",
    version,
    about = "Export Jira issues to self-contained HTML files and convert them to PDF"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export the issues listed in the keys file to HTML, then convert them to PDF
    Export(RunArgs),
    /// Export the issues listed in the keys file to HTML only
    Html(RunArgs),
    /// Convert every HTML file in the HTML directory to PDF
    Pdf(RunArgs),
}

impl Commands {
    fn into_parts(self) -> (RunMode, RunArgs) {
        match self {
            Commands::Export(args) => (RunMode::Full, args),
            Commands::Html(args) => (RunMode::HtmlOnly, args),
            Commands::Pdf(args) => (RunMode::PdfOnly, args),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to an optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// File with one issue key per line
    #[clap(long)]
    pub keys_file: Option<PathBuf>,
    /// Directory for the exported HTML files
    #[clap(long)]
    pub html_dir: Option<PathBuf>,
    /// Directory for the converted PDF files
    #[clap(long)]
    pub pdf_dir: Option<PathBuf>,
    /// Keep instruction boxes and the previous-view link in the output
    #[clap(long)]
    pub keep_instructions: bool,
    /// Number of parallel PDF conversions
    #[clap(long)]
    pub threads: Option<usize>,
    /// PDF backend: wkhtmltopdf (alias pdfkit) or weasyprint
    #[clap(long)]
    pub pdf_engine: Option<PdfEngine>,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            keys_file: self.keys_file.clone(),
            html_dir: self.html_dir.clone(),
            pdf_dir: self.pdf_dir.clone(),
            threads: self.threads,
            pdf_engine: self.pdf_engine,
            keep_instructions: self.keep_instructions,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let (mode, args) = cli.command.into_parts();
    let file_config = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let config = build_export_config(file_config, &args.overrides(), mode)?;
    config.trace_loaded();

    let renderer = config.pdf_engine.renderer(config.renderer_binary.clone());

    let summary = if mode.exports_html() {
        let keys = read_issue_keys(&config.keys_file);
        if keys.is_empty() {
            tracing::warn!(keys_file = %config.keys_file.display(), "No issue keys found, nothing to export");
            println!("No issue keys found in {}.", config.keys_file.display());
            return Ok(());
        }

        let credentials = JiraCredentials::from_env().map_err(|e| anyhow!("Missing Jira credentials: {e}"))?;
        let client = JiraClient::connect(credentials, config.request_timeout)
            .await
            .map_err(|e| anyhow!("Authentication with Jira failed: {e}"))?;
        let source = HtmlSource {
            base_url: client.base_url(),
            fetcher: &client,
        };
        run_export(&config, &keys, Some(source), &*renderer).await
    } else {
        run_export::<JiraClient, _>(&config, &[], None, &*renderer).await
    };

    match summary {
        Ok(summary) => {
            tracing::info!(command = ?mode, ?summary, "Export complete");
            print_summary(&config, &summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = ?mode, error = %e, "Export failed");
            Err(anyhow!("Export failed: {e}"))
        }
    }
}

fn print_summary(config: &ExportConfig, summary: &ExportSummary) {
    println!("Export summary:");
    if config.mode.exports_html() {
        println!(
            "  HTML export: {} succeeded, {} failed",
            summary.html_succeeded, summary.html_failed
        );
    }
    if config.mode.converts_pdf() {
        println!(
            "  PDF conversion: {} succeeded, {} failed",
            summary.pdf_succeeded, summary.pdf_failed
        );
    }
    println!("  HTML files: {}", summary.html_dir.display());
    println!("  PDF files: {}", summary.pdf_dir.display());
    if summary.has_failures() {
        println!("  Failures recorded in {}", summary.failures_file.display());
    }
}
