//! # pdf: HTML → PDF conversion
//!
//! Rendering is delegated to an external program behind the [`PdfRenderer`]
//! trait. Two backends exist, [`WkhtmltopdfRenderer`] and [`WeasyprintRenderer`];
//! the one used for a run is picked once from [`PdfEngine`].
//!
//! [`convert_pdfs_in_parallel`] fans a batch of HTML files out over at most
//! `workers` concurrent renderer processes and waits for all of them. Every
//! file gets its own [`PdfConversion`]; one failure never affects the others.

use async_trait::async_trait;
use futures::future::join_all;
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

const WEASYPRINT_STYLESHEET: &str = r#"
@page {
    size: A4;
    margin: 1cm;
}
body {
    font-family: Arial, sans-serif;
    font-size: 11pt;
    line-height: 1.3;
    margin: 0;
    padding: 0;
}
table {
    border-collapse: collapse;
    width: 100%;
    margin-bottom: 1em;
}
th, td {
    border: 1px solid #ddd;
    padding: 4px;
}
img {
    max-width: 100%;
    height: auto;
}
a {
    text-decoration: underline;
    color: #000;
}
"#;

#[derive(Debug)]
pub enum PdfError {
    Io(std::io::Error),
    /// The renderer binary could not be started.
    Launch { binary: PathBuf, source: std::io::Error },
    /// The renderer exited unsuccessfully without producing a PDF.
    Renderer { status: Option<i32>, stderr: String },
    EmptyOutput,
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::Io(e) => write!(f, "I/O error: {e}"),
            PdfError::Launch { binary, source } => {
                write!(f, "failed to launch {}: {source}", binary.display())
            }
            PdfError::Renderer { status, stderr } => match status {
                Some(code) => write!(f, "renderer exited with code {code}: {}", stderr.trim()),
                None => write!(f, "renderer terminated by signal: {}", stderr.trim()),
            },
            PdfError::EmptyOutput => write!(f, "renderer produced no PDF output"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(e: std::io::Error) -> Self {
        PdfError::Io(e)
    }
}

/// Turns finished HTML into PDF bytes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfError>;
}

/// Which [`PdfRenderer`] backend a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfEngine {
    #[default]
    #[serde(alias = "pdfkit")]
    Wkhtmltopdf,
    Weasyprint,
}

impl PdfEngine {
    /// Build the renderer, using `binary` instead of the program on `PATH` when given.
    pub fn renderer(self, binary: Option<PathBuf>) -> Box<dyn PdfRenderer> {
        match self {
            PdfEngine::Wkhtmltopdf => Box::new(WkhtmltopdfRenderer::new(
                binary.unwrap_or_else(|| PathBuf::from("wkhtmltopdf")),
            )),
            PdfEngine::Weasyprint => Box::new(WeasyprintRenderer::new(
                binary.unwrap_or_else(|| PathBuf::from("weasyprint")),
            )),
        }
    }
}

impl fmt::Display for PdfEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfEngine::Wkhtmltopdf => write!(f, "wkhtmltopdf"),
            PdfEngine::Weasyprint => write!(f, "weasyprint"),
        }
    }
}

impl FromStr for PdfEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wkhtmltopdf" | "pdfkit" => Ok(PdfEngine::Wkhtmltopdf),
            "weasyprint" => Ok(PdfEngine::Weasyprint),
            other => Err(format!(
                "unknown PDF engine '{other}' (expected wkhtmltopdf or weasyprint)"
            )),
        }
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Run `binary args...` with `html` on stdin and collect its output.
async fn run_renderer(binary: &Path, args: &[OsString], html: &str) -> Result<Output, PdfError> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| PdfError::Launch {
            binary: binary.to_path_buf(),
            source,
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| {
        PdfError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "renderer stdin unavailable",
        ))
    })?;
    let input = html.as_bytes().to_vec();
    let feed = async move {
        let written = stdin.write_all(&input).await;
        drop(stdin);
        written
    };

    let (written, output) = tokio::join!(feed, child.wait_with_output());
    if let Err(e) = written {
        // The exit status below decides the outcome.
        debug!(binary = %binary.display(), error = %e, "Renderer closed stdin early");
    }
    Ok(output?)
}

/// Accept the output if it is a PDF, even when the renderer reported errors.
fn pdf_from_output(backend: &str, output: Output) -> Result<Vec<u8>, PdfError> {
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if is_pdf(&output.stdout) {
        if !output.status.success() {
            warn!(
                backend = backend,
                status = ?output.status.code(),
                stderr = %stderr.trim(),
                "Renderer reported an error, but a PDF was produced"
            );
        }
        return Ok(output.stdout);
    }
    if output.status.success() {
        return Err(PdfError::EmptyOutput);
    }
    Err(PdfError::Renderer {
        status: output.status.code(),
        stderr,
    })
}

pub struct WkhtmltopdfRenderer {
    binary: PathBuf,
}

impl WkhtmltopdfRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PdfRenderer for WkhtmltopdfRenderer {
    fn name(&self) -> &'static str {
        "wkhtmltopdf"
    }

    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let args: Vec<OsString> = [
            "--quiet",
            "--load-error-handling",
            "ignore",
            "--load-media-error-handling",
            "ignore",
            "--enable-local-file-access",
            "-",
            "-",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        let output = run_renderer(&self.binary, &args, html).await?;
        pdf_from_output(self.name(), output)
    }
}

pub struct WeasyprintRenderer {
    binary: PathBuf,
}

impl WeasyprintRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl PdfRenderer for WeasyprintRenderer {
    fn name(&self) -> &'static str {
        "weasyprint"
    }

    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let mut stylesheet = tempfile::Builder::new()
            .prefix("jira-export-")
            .suffix(".css")
            .tempfile()?;
        stylesheet.write_all(WEASYPRINT_STYLESHEET.as_bytes())?;
        stylesheet.flush()?;

        let args = vec![
            OsString::from("--presentational-hints"),
            OsString::from("-s"),
            stylesheet.path().as_os_str().to_os_string(),
            OsString::from("-"),
            OsString::from("-"),
        ];
        let output = run_renderer(&self.binary, &args, html).await?;
        pdf_from_output(self.name(), output)
    }
}

/// Outcome of converting one HTML file.
#[derive(Debug)]
pub struct PdfConversion {
    pub html_path: PathBuf,
    /// Path of the written PDF, or why there is none.
    pub outcome: Result<PathBuf, PdfError>,
}

impl PdfConversion {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Available cores minus one, never less than one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

/// `<pdf_dir>/<html file stem>.pdf`
pub fn pdf_path_for(html_path: &Path, pdf_dir: &Path) -> PathBuf {
    let stem = html_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    pdf_dir.join(format!("{stem}.pdf"))
}

/// Convert a single HTML file into `pdf_dir`.
pub async fn convert_single_pdf<R>(html_path: &Path, pdf_dir: &Path, renderer: &R) -> PdfConversion
where
    R: PdfRenderer + ?Sized,
{
    let pdf_path = pdf_path_for(html_path, pdf_dir);
    info!(
        html = %html_path.display(),
        pdf = %pdf_path.display(),
        backend = renderer.name(),
        "Converting to PDF"
    );

    let outcome = render_to_file(html_path, &pdf_path, renderer)
        .await
        .map(|()| pdf_path);

    match &outcome {
        Ok(path) => info!(pdf = %path.display(), "Successfully converted to PDF"),
        Err(e) => error!(html = %html_path.display(), error = %e, "Failed to convert to PDF"),
    }
    PdfConversion {
        html_path: html_path.to_path_buf(),
        outcome,
    }
}

async fn render_to_file<R>(html_path: &Path, pdf_path: &Path, renderer: &R) -> Result<(), PdfError>
where
    R: PdfRenderer + ?Sized,
{
    let html = tokio::fs::read_to_string(html_path).await?;
    let pdf = renderer.render(&html).await?;
    if pdf.is_empty() {
        return Err(PdfError::EmptyOutput);
    }
    tokio::fs::write(pdf_path, pdf).await?;
    Ok(())
}

/// Convert every file in `html_paths`, running at most `workers` renderers at once.
///
/// Results are returned in input order once the whole batch has finished.
pub async fn convert_pdfs_in_parallel<R>(
    html_paths: &[PathBuf],
    pdf_dir: &Path,
    workers: usize,
    renderer: &R,
) -> Vec<PdfConversion>
where
    R: PdfRenderer + ?Sized,
{
    let workers = workers.max(1);
    info!(workers = workers, files = html_paths.len(), backend = renderer.name(), "Starting parallel PDF conversion");

    let semaphore = Semaphore::new(workers);
    let conversions = html_paths.iter().map(|html_path| {
        let semaphore = &semaphore;
        async move {
            let _permit = semaphore.acquire().await.ok();
            let conversion = convert_single_pdf(html_path, pdf_dir, renderer).await;
            debug!(html = %html_path.display(), "Completed PDF conversion");
            conversion
        }
    });
    let results = join_all(conversions).await;

    let failed = results.iter().filter(|c| !c.is_success()).count();
    info!(
        succeeded = results.len() - failed,
        failed = failed,
        "Parallel PDF conversion finished"
    );
    results
}
