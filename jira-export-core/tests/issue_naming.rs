use jira_export_core::filename::{
    create_safe_filename, issue_key_from_stem, strip_unsafe_chars, truncate_with_ellipsis,
};
use jira_export_core::issue_details::extract_issue_details;
use jira_export_core::keys::{parse_issue_keys, read_issue_keys};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_filename_strips_leading_issue_key_from_title() {
    let name = create_safe_filename("PROJ-1", "PROJ-1 - Do the thing", "Sprint 7", None);
    assert_eq!(name, "PROJ-1 - Do the thing - Sprint 7");
}

#[test]
fn test_filename_appends_service_ticket() {
    let name = create_safe_filename("PROJ-2", "Login fails", "Sprint 7", Some("48213"));
    assert_eq!(name, "PROJ-2 - Login fails - Sprint 7 - 48213");
}

#[test]
fn test_filename_uses_placeholders_for_empty_parts() {
    let name = create_safe_filename("PROJ-3", "  ", "", Some(""));
    assert_eq!(name, "PROJ-3 - Jira Issue - No Sprint");
}

#[test]
fn test_filename_removes_unsafe_characters() {
    assert_eq!(strip_unsafe_chars(r#"a/b\c:d*e?f"g<h>i|j"#), "abcdefghij");
    let name = create_safe_filename("PROJ-4", "Fix: crash on <save>?", "Sprint/12", None);
    assert_eq!(name, "PROJ-4 - Fix crash on save - Sprint12");
}

#[test]
fn test_filename_truncates_long_parts() {
    let long_title = "t".repeat(200);
    let long_sprint = "s".repeat(50);
    let name = create_safe_filename("PROJ-5", &long_title, &long_sprint, None);

    let expected_title = format!("{}...", "t".repeat(147));
    let expected_sprint = format!("{}...", "s".repeat(27));
    assert_eq!(name, format!("PROJ-5 - {expected_title} - {expected_sprint}"));
    assert!(name.chars().count() <= 240);
}

#[test]
fn test_filename_is_deterministic() {
    let a = create_safe_filename("PROJ-6", "Same input", "Sprint 1", Some("1"));
    let b = create_safe_filename("PROJ-6", "Same input", "Sprint 1", Some("1"));
    assert_eq!(a, b);
}

#[test]
fn test_truncate_counts_characters_not_bytes() {
    assert_eq!(truncate_with_ellipsis("ééééé", 5), "ééééé");
    assert_eq!(truncate_with_ellipsis("éééééé", 5), "éé...");
}

#[test]
fn test_issue_key_from_stem() {
    assert_eq!(issue_key_from_stem("PROJ-1 - Do the thing - Sprint 7"), "PROJ-1");
    assert_eq!(issue_key_from_stem("standalone"), "standalone");
}

const ISSUE_VIEW: &str = r#"<html>
<head><title>[#PROJ-1] Login fails on Safari - Jira</title></head>
<body>
<h2>PROJ-1 Login fails on Safari</h2>
<ul>
  <li><span class="label">Sprint:</span> <span class="value">Sprint 42</span></li>
</ul>
<table>
  <tr><td>Priority:</td><td>Major</td></tr>
  <tr><td>Service Ticket #:</td><td> 48213 </td></tr>
</table>
</body>
</html>"#;

#[test]
fn test_extract_issue_details_from_issue_view() {
    let details = extract_issue_details(ISSUE_VIEW, "PROJ-1");
    assert_eq!(details.title, "Login fails on Safari");
    assert_eq!(details.sprint, "Sprint 42");
    assert_eq!(details.service_ticket.as_deref(), Some("48213"));
}

#[test]
fn test_extract_title_falls_back_to_summary_field() {
    let html = r#"<html><head><title>Jira</title></head>
<body><div id="summary-val">Checkout button missing</div></body></html>"#;
    let details = extract_issue_details(html, "PROJ-9");
    assert_eq!(details.title, "Checkout button missing");
}

#[test]
fn test_extract_title_falls_back_to_header() {
    let html = r#"<html><head><title>Jira</title></head>
<body><h1>PROJ-9: Checkout button missing</h1></body></html>"#;
    let details = extract_issue_details(html, "PROJ-9");
    assert_eq!(details.title, "Checkout button missing");
}

#[test]
fn test_extract_details_defaults_when_nothing_found() {
    let html = r#"<html><head></head><body>
<table><tr><td>Service Ticket #</td><td>n/a</td></tr></table>
<span>Sprint:</span> <span>None</span>
</body></html>"#;
    let details = extract_issue_details(html, "PROJ-9");
    assert_eq!(details.title, "Jira Issue");
    assert_eq!(details.sprint, "No Sprint");
    assert_eq!(details.service_ticket, None);
}

#[test]
fn test_parse_issue_keys_skips_comments_and_blanks() {
    let keys = parse_issue_keys("# header\nPROJ-1\n\n  PROJ-2  \n#PROJ-3\n");
    assert_eq!(keys, vec!["PROJ-1".to_string(), "PROJ-2".to_string()]);
}

#[test]
fn test_missing_keys_file_creates_template() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.txt");

    let keys = read_issue_keys(&path);

    assert!(keys.is_empty());
    let template = fs::read_to_string(&path).expect("template written");
    assert!(template.lines().all(|line| line.starts_with('#')));
    assert!(read_issue_keys(&path).is_empty(), "template holds no keys");
}

#[test]
fn test_read_issue_keys_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.txt");
    fs::write(&path, "PROJ-10\n# skipped\nPROJ-11\n").unwrap();

    assert_eq!(read_issue_keys(&path), vec!["PROJ-10".to_string(), "PROJ-11".to_string()]);
}
