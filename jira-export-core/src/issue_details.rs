//! Title, sprint and service ticket of an issue, scraped from its HTML view.

use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::filename::{trim_leading_separators, DEFAULT_SPRINT, DEFAULT_TITLE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetails {
    pub title: String,
    pub sprint: String,
    pub service_ticket: Option<String>,
}

const SERVICE_TICKET_LABEL: &str = "Service Ticket #";

fn sprint_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"(?s)Sprint:</span>.*?<span[^>]*>(.*?)<",
            r"(?s)Sprint:</span>.*?<span[^>]*>(.*?)</span>",
            r"(?s)Sprint</span>:.*?<span[^>]*>(.*?)<",
            r"(?s)Sprint</span>.*?<span[^>]*>(.*?)</span>",
            r"(?s)Sprint:.*?<span[^>]*>(.*?)<",
            r"(?s)Sprint:.*?<td[^>]*>(.*?)<",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static sprint pattern is valid"))
        .collect()
    })
}

/// Extract the issue details from the page, with placeholders for anything missing.
pub fn extract_issue_details(html: &str, issue_key: &str) -> IssueDetails {
    let document = kuchiki::parse_html().one(html);

    let title = title_from_title_tag(&document, issue_key)
        .or_else(|| title_from_summary_field(&document))
        .or_else(|| title_from_headers(&document, issue_key))
        .unwrap_or_else(|| {
            warn!(issue_key = %issue_key, "Could not extract title, using placeholder");
            DEFAULT_TITLE.to_string()
        });
    let sprint = sprint_from_html(html).unwrap_or_else(|| DEFAULT_SPRINT.to_string());
    let service_ticket = service_ticket_from_rows(&document);

    info!(
        issue_key = %issue_key,
        title = %title,
        sprint = %sprint,
        service_ticket = service_ticket.as_deref().unwrap_or("-"),
        "Extracted issue details"
    );
    IssueDetails {
        title,
        sprint,
        service_ticket,
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn title_from_title_tag(document: &NodeRef, issue_key: &str) -> Option<String> {
    let title_text = document.select_first("title").ok()?.as_node().text_contents();
    let title_text = title_text.trim();

    let bracketed = Regex::new(&format!(
        r"\[\s*#?({})\s*\]\s*(.*?)(?:\s*-\s*Jira)?$",
        regex::escape(issue_key)
    ))
    .ok()?;
    if let Some(caps) = bracketed.captures(title_text) {
        let title = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
        return non_empty(title);
    }

    let (_, after_key) = title_text.split_once(issue_key)?;
    let after_key = after_key.trim();
    let after_key = after_key.strip_suffix("- Jira").unwrap_or(after_key).trim();
    non_empty(trim_leading_separators(after_key))
}

fn title_from_summary_field(document: &NodeRef) -> Option<String> {
    let summary = document
        .select_first("div#summary-val, span#summary-val")
        .ok()?;
    non_empty(summary.as_node().text_contents().trim().to_string())
}

fn title_from_headers(document: &NodeRef, issue_key: &str) -> Option<String> {
    let headers = document.select("h1, h2, h3").ok()?;
    for header in headers {
        let text = header.as_node().text_contents();
        let text = text.trim();
        if text.len() > issue_key.len() {
            if let Some((_, after_key)) = text.split_once(issue_key) {
                return non_empty(trim_leading_separators(after_key.trim()));
            }
        }
    }
    None
}

fn sprint_from_html(html: &str) -> Option<String> {
    for pattern in sprint_patterns() {
        let Some(caps) = pattern.captures(html) else {
            continue;
        };
        let value = caps.get(1).map_or("", |m| m.as_str()).trim();
        let lowered = value.to_lowercase();
        if !value.is_empty() && lowered != "none" && lowered != "-" {
            return Some(value.to_string());
        }
    }
    None
}

fn service_ticket_from_rows(document: &NodeRef) -> Option<String> {
    let rows = document.select("tr").ok()?;
    for row in rows {
        let Ok(cells) = row.as_node().select("td") else {
            continue;
        };
        let cells: Vec<String> = cells.map(|td| td.as_node().text_contents().trim().to_string()).collect();
        if cells.len() < 2 || !cells[0].starts_with(SERVICE_TICKET_LABEL) {
            continue;
        }
        let value = &cells[1];
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
            return Some(value.clone());
        }
    }
    None
}
