use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::pdf::{default_workers, PdfEngine};

/// Which stages of the pipeline a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Fetch and inline issues, then convert them to PDF.
    #[default]
    Full,
    HtmlOnly,
    /// Convert the HTML already present in the HTML directory.
    PdfOnly,
}

impl RunMode {
    pub fn exports_html(self) -> bool {
        matches!(self, RunMode::Full | RunMode::HtmlOnly)
    }

    pub fn converts_pdf(self) -> bool {
        matches!(self, RunMode::Full | RunMode::PdfOnly)
    }
}

/// Fully merged settings for one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub keys_file: PathBuf,
    pub html_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub failures_file: PathBuf,
    pub mode: RunMode,
    /// Strip `.no-print` boxes and the previous-view control from exported pages.
    pub remove_instructions: bool,
    pub workers: usize,
    pub pdf_engine: PdfEngine,
    /// Overrides the renderer program looked up on `PATH`.
    pub renderer_binary: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let html_dir = PathBuf::from("exports");
        Self {
            keys_file: PathBuf::from("keys.txt"),
            pdf_dir: html_dir.join("pdf"),
            html_dir,
            failures_file: PathBuf::from("export_failures.csv"),
            mode: RunMode::Full,
            remove_instructions: true,
            workers: default_workers(),
            pdf_engine: PdfEngine::default(),
            renderer_binary: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ExportConfig {
    pub fn trace_loaded(&self) {
        info!(
            mode = ?self.mode,
            keys_file = %self.keys_file.display(),
            html_dir = %self.html_dir.display(),
            pdf_dir = %self.pdf_dir.display(),
            workers = self.workers,
            pdf_engine = %self.pdf_engine,
            "Loaded export config"
        );
        debug!(?self, "Export config loaded (full debug)");
    }
}
