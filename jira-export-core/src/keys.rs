//! Reading the list of issue keys to export.

use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

const KEYS_TEMPLATE: &str = "# Add your Jira issue keys here (one per line)
# Lines starting with # are comments and will be ignored
# Example:
# PROJECT-123
";

/// Parse a key list: one key per line, blank lines and `#` comments skipped.
pub fn parse_issue_keys(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read issue keys from `path`.
///
/// A missing file is not an error: a commented template is written in its place
/// and an empty list returned. An unreadable file also yields an empty list.
pub fn read_issue_keys<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    if !path.exists() {
        error!(path = %path.display(), "Keys file not found");
        match fs::write(path, KEYS_TEMPLATE) {
            Ok(()) => info!(
                path = %path.display(),
                "Created template keys file. Please add your issue keys and run again."
            ),
            Err(e) => warn!(error = ?e, path = %path.display(), "Failed to create template keys file"),
        }
        return Vec::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => {
            let keys = parse_issue_keys(&content);
            info!(path = %path.display(), count = keys.len(), "Read issue keys");
            keys
        }
        Err(e) => {
            error!(error = ?e, path = %path.display(), "Failed to read keys file");
            Vec::new()
        }
    }
}
