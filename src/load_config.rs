//! `load_config` module: reads the optional YAML config file and merges it with
//! command-line overrides into the core [`ExportConfig`].
//!
//! The file never holds secrets. Jira credentials come from the environment
//! (`JIRA_URL`, `JIRA_USERNAME`, `JIRA_API_TOKEN`), optionally via `.env`.
//!
//! # Precedence
//! command-line flag > config file > built-in default
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary.

use anyhow::{anyhow, Result};
use jira_export_core::config::{ExportConfig, RunMode};
use jira_export_core::pdf::PdfEngine;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// YAML side of the configuration. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub keys_file: Option<PathBuf>,
    pub html_dir: Option<PathBuf>,
    pub pdf_dir: Option<PathBuf>,
    pub failures_file: Option<PathBuf>,
    pub threads: Option<usize>,
    pub pdf_engine: Option<PdfEngine>,
    pub keep_instructions: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub wkhtmltopdf_path: Option<PathBuf>,
    pub weasyprint_path: Option<PathBuf>,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub keys_file: Option<PathBuf>,
    pub html_dir: Option<PathBuf>,
    pub pdf_dir: Option<PathBuf>,
    pub threads: Option<usize>,
    pub pdf_engine: Option<PdfEngine>,
    /// Only ever turns instruction stripping off.
    pub keep_instructions: bool,
}

/// Loads a static YAML config file. An empty file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    if config_content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Merge file values and overrides on top of [`ExportConfig::default`].
pub fn build_export_config(file: FileConfig, overrides: &Overrides, mode: RunMode) -> Result<ExportConfig> {
    let defaults = ExportConfig::default();

    let html_dir = overrides
        .html_dir
        .clone()
        .or(file.html_dir)
        .unwrap_or(defaults.html_dir);
    let pdf_dir = overrides
        .pdf_dir
        .clone()
        .or(file.pdf_dir)
        .unwrap_or_else(|| html_dir.join("pdf"));

    let workers = overrides.threads.or(file.threads).unwrap_or(defaults.workers);
    if workers == 0 {
        return Err(anyhow!("threads must be at least 1"));
    }

    let request_timeout = match file.request_timeout_secs {
        Some(0) => return Err(anyhow!("request_timeout_secs must be at least 1")),
        Some(secs) => Duration::from_secs(secs),
        None => defaults.request_timeout,
    };

    let pdf_engine = overrides.pdf_engine.or(file.pdf_engine).unwrap_or_default();
    let renderer_binary = match pdf_engine {
        PdfEngine::Wkhtmltopdf => file.wkhtmltopdf_path,
        PdfEngine::Weasyprint => file.weasyprint_path,
    };

    let keep_instructions = overrides.keep_instructions || file.keep_instructions.unwrap_or(false);

    Ok(ExportConfig {
        keys_file: overrides
            .keys_file
            .clone()
            .or(file.keys_file)
            .unwrap_or(defaults.keys_file),
        html_dir,
        pdf_dir,
        failures_file: file.failures_file.unwrap_or(defaults.failures_file),
        mode,
        remove_instructions: !keep_instructions,
        workers,
        pdf_engine,
        renderer_binary,
        request_timeout,
    })
}
