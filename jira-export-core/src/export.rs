//! High-level pipeline: issue keys → self-contained HTML → PDF.
//!
//! [`run_export`] drives one run as described by an [`ExportConfig`]:
//!   - HTML stage: for every key, fetch the issue's printable view, extract its
//!     details, inline all resources through one run-wide [`ResourceCache`] and
//!     save `<html_dir>/<safe name>.html`
//!   - PDF stage: convert the HTML stage's output (or, in PDF-only mode, every
//!     `*.html` in the HTML directory) in parallel
//!
//! # Error Handling
//! Failures of a single issue or file are written to the [`FailureReport`] and
//! counted in the [`ExportSummary`]; the run carries on. Only problems with the
//! output locations or a missing session end the run with an [`ExportError`].

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::cache::ResourceCache;
use crate::config::ExportConfig;
use crate::contract::{FetchError, ResourceFetcher};
use crate::filename::{create_safe_filename, issue_key_from_stem};
use crate::inline::{embed_external_resources, InlineOutcome};
use crate::issue_details::extract_issue_details;
use crate::jira::issue_html_url;
use crate::pdf::{convert_pdfs_in_parallel, PdfRenderer};
use crate::report::{FailureReport, FailureRow, StageStatus};

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Fetch(FetchError),
    /// HTML export was requested without a Jira session.
    MissingSession,
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
            ExportError::Fetch(e) => write!(f, "fetch failed: {e}"),
            ExportError::MissingSession => write!(f, "HTML export requires an authenticated Jira session"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<FetchError> for ExportError {
    fn from(e: FetchError) -> Self {
        ExportError::Fetch(e)
    }
}

/// Where issue pages come from: the Jira base URL and the session used for
/// the page and all of its resources.
pub struct HtmlSource<'a, F: ?Sized> {
    pub base_url: &'a str,
    pub fetcher: &'a F,
}

/// Outcome of exporting one issue to HTML.
#[derive(Debug)]
pub struct HtmlExport {
    pub issue_key: String,
    /// `None` when the page could not be fetched.
    pub title: Option<String>,
    pub outcome: Result<PathBuf, ExportError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub html_succeeded: usize,
    pub html_failed: usize,
    pub pdf_succeeded: usize,
    pub pdf_failed: usize,
    pub html_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub failures_file: PathBuf,
}

impl ExportSummary {
    pub fn has_failures(&self) -> bool {
        self.html_failed > 0 || self.pdf_failed > 0
    }

    pub fn trace(&self, config: &ExportConfig) {
        info!("{}", "=".repeat(60));
        info!("Export Summary:");
        if config.mode.exports_html() {
            info!(succeeded = self.html_succeeded, failed = self.html_failed, "HTML export");
        }
        if config.mode.converts_pdf() {
            info!(succeeded = self.pdf_succeeded, failed = self.pdf_failed, "PDF conversion");
        }
        info!(html_dir = %self.html_dir.display(), pdf_dir = %self.pdf_dir.display(), "Output directories");
        if self.has_failures() {
            info!(failures_file = %self.failures_file.display(), "See the failure report for details");
        }
    }
}

/// Export one issue. Failures are recorded in `report` and returned in the outcome.
pub async fn export_issue<F>(
    config: &ExportConfig,
    source: &HtmlSource<'_, F>,
    issue_key: &str,
    cache: &mut ResourceCache,
    report: &mut FailureReport,
) -> HtmlExport
where
    F: ResourceFetcher + ?Sized,
{
    let url = issue_html_url(source.base_url, issue_key);
    info!(issue_key = %issue_key, url = %url, "[EXPORT] Fetching issue HTML");

    let page = match source.fetcher.get(&url).await {
        Ok(page) => page,
        Err(e) => {
            error!(issue_key = %issue_key, error = %e, "[EXPORT][ERROR] Failed to fetch issue HTML");
            report.record_or_log(&FailureRow {
                issue_key: issue_key.to_string(),
                issue_title: String::new(),
                html_status: StageStatus::Failed,
                pdf_status: StageStatus::Skipped,
                reason: format!("Failed to fetch HTML content: {e}"),
            });
            return HtmlExport {
                issue_key: issue_key.to_string(),
                title: None,
                outcome: Err(e.into()),
            };
        }
    };

    let html = page.text();
    let base_url = if page.url.is_empty() { url.as_str() } else { page.url.as_str() };
    let details = extract_issue_details(&html, issue_key);
    let file_stem = create_safe_filename(
        issue_key,
        &details.title,
        &details.sprint,
        details.service_ticket.as_deref(),
    );
    let html_path = config.html_dir.join(format!("{file_stem}.html"));

    let inlined = embed_external_resources(&html, base_url, source.fetcher, config.remove_instructions, cache).await;
    if let InlineOutcome::Unmodified { error, .. } = &inlined {
        warn!(issue_key = %issue_key, error = %error, "[EXPORT] Saving issue without embedded resources");
    }

    match tokio::fs::write(&html_path, inlined.into_html()).await {
        Ok(()) => {
            info!(issue_key = %issue_key, path = %html_path.display(), "[EXPORT] HTML saved successfully");
            HtmlExport {
                issue_key: issue_key.to_string(),
                title: Some(details.title),
                outcome: Ok(html_path),
            }
        }
        Err(e) => {
            error!(issue_key = %issue_key, path = %html_path.display(), error = ?e, "[EXPORT][ERROR] Failed to save HTML");
            report.record_or_log(&FailureRow {
                issue_key: issue_key.to_string(),
                issue_title: details.title.clone(),
                html_status: StageStatus::Failed,
                pdf_status: StageStatus::Skipped,
                reason: format!("Failed to save HTML: {e}"),
            });
            HtmlExport {
                issue_key: issue_key.to_string(),
                title: Some(details.title),
                outcome: Err(e.into()),
            }
        }
    }
}

/// Export every key in order, sharing `cache` across issues.
pub async fn export_html<F>(
    config: &ExportConfig,
    source: &HtmlSource<'_, F>,
    issue_keys: &[String],
    cache: &mut ResourceCache,
    report: &mut FailureReport,
) -> Vec<HtmlExport>
where
    F: ResourceFetcher + ?Sized,
{
    info!(count = issue_keys.len(), "[EXPORT] Found issue(s) to process");
    let mut exports = Vec::with_capacity(issue_keys.len());
    for issue_key in issue_keys {
        exports.push(export_issue(config, source, issue_key, cache, report).await);
    }
    exports
}

/// Every `*.html` file directly inside `dir`, sorted by name.
pub fn list_html_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "html") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Run the stages selected by `config.mode`.
///
/// `issue_keys` and `source` are only used when the mode exports HTML; an empty
/// key list ends such a run early with an empty summary.
pub async fn run_export<F, R>(
    config: &ExportConfig,
    issue_keys: &[String],
    source: Option<HtmlSource<'_, F>>,
    renderer: &R,
) -> Result<ExportSummary, ExportError>
where
    F: ResourceFetcher + ?Sized,
    R: PdfRenderer + ?Sized,
{
    info!(mode = ?config.mode, "[EXPORT] Starting export run");
    std::fs::create_dir_all(&config.html_dir)?;
    std::fs::create_dir_all(&config.pdf_dir)?;
    let mut report = FailureReport::create(&config.failures_file)?;

    let mut summary = ExportSummary {
        html_dir: config.html_dir.clone(),
        pdf_dir: config.pdf_dir.clone(),
        failures_file: config.failures_file.clone(),
        ..ExportSummary::default()
    };

    let mut exported: Option<Vec<PathBuf>> = None;
    if config.mode.exports_html() {
        if issue_keys.is_empty() {
            warn!(keys_file = %config.keys_file.display(), "[EXPORT] No issue keys found");
            return Ok(summary);
        }
        let source = source.ok_or(ExportError::MissingSession)?;
        let mut cache = ResourceCache::new();
        let exports = export_html(config, &source, issue_keys, &mut cache, &mut report).await;

        let mut paths = Vec::new();
        for export in exports {
            match export.outcome {
                Ok(path) => {
                    summary.html_succeeded += 1;
                    paths.push(path);
                }
                Err(_) => summary.html_failed += 1,
            }
        }
        exported = Some(paths);
    }

    if config.mode.converts_pdf() {
        let html_paths = match exported {
            Some(paths) => paths,
            None => list_html_files(&config.html_dir)?,
        };
        if html_paths.is_empty() {
            warn!(html_dir = %config.html_dir.display(), "[EXPORT] No HTML files found to convert to PDF");
        } else {
            info!(count = html_paths.len(), "[EXPORT] Converting HTML files to PDF");
            let conversions =
                convert_pdfs_in_parallel(&html_paths, &config.pdf_dir, config.workers, renderer).await;
            for conversion in conversions {
                match &conversion.outcome {
                    Ok(_) => summary.pdf_succeeded += 1,
                    Err(e) => {
                        summary.pdf_failed += 1;
                        let stem = conversion
                            .html_path
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        report.record_or_log(&FailureRow {
                            issue_key: issue_key_from_stem(&stem).to_string(),
                            issue_title: stem.clone(),
                            html_status: StageStatus::Success,
                            pdf_status: StageStatus::Failed,
                            reason: format!("PDF conversion failed: {e}"),
                        });
                    }
                }
            }
        }
    }

    summary.trace(config);
    Ok(summary)
}
