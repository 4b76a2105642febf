use jira_export_core::cache::{CachePartition, ResourceCache};
use jira_export_core::contract::{FetchError, FetchedResource, MockResourceFetcher};
use jira_export_core::css::embed_css_resources;
use jira_export_core::embed::{embed_resource, normalize_mime, resolve_url, Embedded};

const BASE_URL: &str = "https://jira.example.com/si/jira.issueviews:issue-html/PROJ-1/PROJ-1.html";

fn resource(url: &str, content_type: &str, body: &[u8]) -> FetchedResource {
    FetchedResource {
        url: url.to_string(),
        content_type: Some(content_type.to_string()),
        body: body.to_vec(),
    }
}

#[tokio::test]
async fn test_data_and_javascript_urls_pass_through_without_fetching() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher.expect_get().never();
    let mut cache = ResourceCache::new();

    let data_url = "data:image/png;base64,UE5H";
    let embedded = embed_resource(&fetcher, data_url, BASE_URL, &mut cache).await;
    assert_eq!(embedded, Embedded::Passthrough(data_url.to_string()));

    let script = "JavaScript:void(0)";
    let embedded = embed_resource(&fetcher, script, BASE_URL, &mut cache).await;
    assert_eq!(embedded.as_reference(), script);
    assert!(cache.is_empty(), "Passthrough references must not be cached");
}

#[tokio::test]
async fn test_second_embed_of_same_url_is_a_cache_hit() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher
        .expect_get()
        .withf(|url| url == "https://jira.example.com/images/icons/bug.png")
        .times(1)
        .returning(|url| Ok(resource(url, "image/png", b"PNG")));
    let mut cache = ResourceCache::new();

    let first = embed_resource(&fetcher, "/images/icons/bug.png", BASE_URL, &mut cache).await;
    let second = embed_resource(
        &fetcher,
        "https://jira.example.com/images/icons/bug.png",
        BASE_URL,
        &mut cache,
    )
    .await;

    assert_eq!(first, Embedded::Inlined("data:image/png;base64,UE5H".to_string()));
    assert_eq!(first, second);
    assert!(cache.contains(CachePartition::Resources, "https://jira.example.com/images/icons/bug.png"));
    assert_eq!(cache.len(CachePartition::Resources), 1);
}

#[tokio::test]
async fn test_failed_download_returns_original_reference() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher.expect_get().times(1).returning(|url| {
        Err(FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    });
    let mut cache = ResourceCache::new();

    let embedded = embed_resource(&fetcher, "img/missing.png", BASE_URL, &mut cache).await;

    match &embedded {
        Embedded::Unembedded { original, reason } => {
            assert_eq!(original, "img/missing.png");
            assert!(reason.contains("404"), "reason should carry the status: {reason}");
        }
        other => panic!("expected Unembedded, got {other:?}"),
    }
    assert_eq!(embedded.as_reference(), "img/missing.png");
    assert!(cache.is_empty(), "Failures must not be cached");
}

#[tokio::test]
async fn test_unknown_content_type_is_embedded_as_octet_stream() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher
        .expect_get()
        .returning(|url| Ok(resource(url, "font/woff2", b"woff")));
    let mut cache = ResourceCache::new();

    let embedded = embed_resource(&fetcher, "fonts/a.woff2", BASE_URL, &mut cache).await;
    assert_eq!(
        embedded,
        Embedded::Inlined("data:application/octet-stream;base64,d29mZg==".to_string())
    );
}

#[test]
fn test_normalize_mime() {
    assert_eq!(normalize_mime(Some("text/css; charset=UTF-8")), "text/css");
    assert_eq!(normalize_mime(Some("IMAGE/SVG+XML")), "image/svg+xml");
    assert_eq!(normalize_mime(Some("image/jpeg")), "image/jpeg");
    assert_eq!(normalize_mime(Some("image/webp")), "application/octet-stream");
    assert_eq!(normalize_mime(None), "application/octet-stream");
}

#[test]
fn test_resolve_url_keeps_absolute_and_joins_relative() {
    assert_eq!(
        resolve_url(BASE_URL, "https://cdn.example.com/a.png").unwrap(),
        "https://cdn.example.com/a.png"
    );
    assert_eq!(
        resolve_url(BASE_URL, "/s/batch.css").unwrap(),
        "https://jira.example.com/s/batch.css"
    );
    assert_eq!(
        resolve_url(BASE_URL, "img/a.png").unwrap(),
        "https://jira.example.com/si/jira.issueviews:issue-html/PROJ-1/img/a.png"
    );
    assert!(resolve_url("not a url", "img/a.png").is_err());
}

#[tokio::test]
async fn test_css_urls_are_rewritten_and_quotes_dropped() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher
        .expect_get()
        .withf(|url| url == "https://jira.example.com/s/icon.png")
        .times(1)
        .returning(|url| Ok(resource(url, "image/png", b"PNG")));
    let mut cache = ResourceCache::new();

    let css = ".a { background: url('icon.png') no-repeat; }\n.b { background: url( \"icon.png\" ); }";
    let rewritten = embed_css_resources(css, &fetcher, "https://jira.example.com/s/batch.css", &mut cache).await;

    assert_eq!(
        rewritten.css,
        ".a { background: url(data:image/png;base64,UE5H) no-repeat; }\n.b { background: url(data:image/png;base64,UE5H); }"
    );
    assert!(rewritten.unembedded.is_empty());
}

#[tokio::test]
async fn test_css_failure_keeps_reference_and_reports_it() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher
        .expect_get()
        .returning(|_| Err(FetchError::Transport("connection reset".to_string())));
    let mut cache = ResourceCache::new();

    let css = "div { background-image: url(\"img/gone.gif\"); color: red; }";
    let rewritten = embed_css_resources(css, &fetcher, BASE_URL, &mut cache).await;

    assert_eq!(rewritten.css, "div { background-image: url(img/gone.gif); color: red; }");
    assert_eq!(rewritten.unembedded, vec!["img/gone.gif".to_string()]);
}

#[tokio::test]
async fn test_css_without_urls_is_unchanged() {
    let mut fetcher = MockResourceFetcher::new();
    fetcher.expect_get().never();
    let mut cache = ResourceCache::new();

    let css = "body { margin: 0; }";
    let rewritten = embed_css_resources(css, &fetcher, BASE_URL, &mut cache).await;
    assert_eq!(rewritten.css, css);
}
