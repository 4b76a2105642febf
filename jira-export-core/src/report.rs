//! CSV report of everything that failed during a run.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub const REPORT_HEADER: [&str; 5] = [
    "Issue Key",
    "Issue Title",
    "HTML Status",
    "PDF Status",
    "Failure Reason",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Success => "Success",
            StageStatus::Failed => "Failed",
            StageStatus::Skipped => "Skipped",
        }
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRow {
    pub issue_key: String,
    pub issue_title: String,
    pub html_status: StageStatus,
    pub pdf_status: StageStatus,
    pub reason: String,
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = fields.into_iter().map(csv_field).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// Append-only failure report. The file is truncated and given its header on
/// [`FailureReport::create`]; each [`FailureReport::record`] appends one row.
#[derive(Debug)]
pub struct FailureReport {
    path: PathBuf,
    rows: usize,
}

impl FailureReport {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to create failure report");
            e
        })?;
        file.write_all(csv_line(REPORT_HEADER).as_bytes())?;
        Ok(Self { path, rows: 0 })
    }

    pub fn record(&mut self, row: &FailureRow) -> io::Result<()> {
        let line = csv_line([
            row.issue_key.as_str(),
            row.issue_title.as_str(),
            row.html_status.as_str(),
            row.pdf_status.as_str(),
            row.reason.as_str(),
        ]);
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        self.rows += 1;
        debug!(issue_key = %row.issue_key, reason = %row.reason, "Recorded failure");
        Ok(())
    }

    /// Like [`FailureReport::record`], logging instead of returning write errors.
    pub fn record_or_log(&mut self, row: &FailureRow) {
        if let Err(e) = self.record(row) {
            error!(error = ?e, path = %self.path.display(), issue_key = %row.issue_key, "Failed to append to failure report");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows recorded so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }
}
