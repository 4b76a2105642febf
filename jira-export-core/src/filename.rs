//! Deterministic, filesystem-safe names for exported issues.

use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_TITLE: &str = "Jira Issue";
pub const DEFAULT_SPRINT: &str = "No Sprint";

const MAX_TITLE_CHARS: usize = 150;
const MAX_LABEL_CHARS: usize = 30;
const MAX_FILENAME_CHARS: usize = 240;

fn leading_separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\s\-:]+").expect("static separator pattern is valid"))
}

/// Remove characters that are invalid in Windows or POSIX file names.
pub fn strip_unsafe_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Cut `s` to `max` characters, the last three being `...`.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Strip leading `-`, `:` and whitespace.
pub fn trim_leading_separators(s: &str) -> String {
    leading_separators().replace(s, "").into_owned()
}

/// `"<key> - <title> - <sprint>[ - <ticket>]"`, without extension.
pub fn create_safe_filename(
    issue_key: &str,
    title: &str,
    sprint: &str,
    service_ticket: Option<&str>,
) -> String {
    let mut safe_title = strip_unsafe_chars(title);
    let mut safe_sprint = strip_unsafe_chars(sprint);
    let safe_ticket = service_ticket
        .map(strip_unsafe_chars)
        .filter(|t| !t.is_empty())
        .map(|t| truncate_with_ellipsis(&t, MAX_LABEL_CHARS));

    if safe_title.trim().is_empty() {
        safe_title = DEFAULT_TITLE.to_string();
    }
    if safe_sprint.trim().is_empty() {
        safe_sprint = DEFAULT_SPRINT.to_string();
    }

    safe_title = truncate_with_ellipsis(&safe_title, MAX_TITLE_CHARS);
    safe_sprint = truncate_with_ellipsis(&safe_sprint, MAX_LABEL_CHARS);

    if let Some(rest) = safe_title.strip_prefix(issue_key) {
        safe_title = trim_leading_separators(rest.trim());
    }

    let mut filename = format!("{issue_key} - {safe_title} - {safe_sprint}");
    if let Some(ticket) = safe_ticket {
        filename.push_str(" - ");
        filename.push_str(&ticket);
    }
    truncate_with_ellipsis(&filename, MAX_FILENAME_CHARS)
}

/// Issue key of an exported file, recovered from its stem.
pub fn issue_key_from_stem(stem: &str) -> &str {
    stem.split_once(" - ").map_or(stem, |(key, _)| key)
}
