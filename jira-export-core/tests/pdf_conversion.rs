use jira_export_core::pdf::{
    convert_pdfs_in_parallel, convert_single_pdf, pdf_path_for, MockPdfRenderer, PdfEngine, PdfError,
    PdfRenderer, WkhtmltopdfRenderer,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn pdf_renderer() -> MockPdfRenderer {
    let mut renderer = MockPdfRenderer::new();
    renderer.expect_name().return_const("mock");
    renderer
        .expect_render()
        .returning(|_| Ok(b"%PDF-1.4\n%mock\n".to_vec()));
    renderer
}

/// `existing` HTML files written into `dir`, plus `missing` paths that do not exist.
fn html_batch(dir: &Path, existing: usize, missing: usize) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for i in 0..existing {
        let path = dir.join(format!("PROJ-{i} - Title {i} - Sprint 1.html"));
        fs::write(&path, format!("<html><body>issue {i}</body></html>")).unwrap();
        paths.push(path);
    }
    for i in 0..missing {
        paths.push(dir.join(format!("GONE-{i} - Missing - No Sprint.html")));
    }
    paths
}

#[tokio::test]
async fn test_missing_inputs_fail_independently_for_any_worker_count() {
    for workers in [1, 2, 8] {
        let html_dir = tempdir().unwrap();
        let pdf_dir = tempdir().unwrap();
        let paths = html_batch(html_dir.path(), 4, 2);
        let renderer = pdf_renderer();

        let results = convert_pdfs_in_parallel(&paths, pdf_dir.path(), workers, &renderer).await;

        assert_eq!(results.len(), 6, "one result per input (workers={workers})");
        let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 2, "workers={workers}");
        for failure in failed {
            assert!(matches!(failure.outcome, Err(PdfError::Io(_))));
            assert!(failure.html_path.file_name().unwrap().to_string_lossy().starts_with("GONE-"));
        }
        for (result, input) in results.iter().zip(&paths) {
            assert_eq!(&result.html_path, input, "results keep input order");
        }
        let written = fs::read_dir(pdf_dir.path()).unwrap().count();
        assert_eq!(written, 4);
    }
}

#[tokio::test]
async fn test_renderer_failure_is_reported_per_file() {
    let html_dir = tempdir().unwrap();
    let pdf_dir = tempdir().unwrap();
    let good = html_dir.path().join("PROJ-1 - Good - Sprint 1.html");
    let bad = html_dir.path().join("PROJ-2 - Bad - Sprint 1.html");
    fs::write(&good, "<html><body>fine</body></html>").unwrap();
    fs::write(&bad, "<html><body>broken</body></html>").unwrap();

    let mut renderer = MockPdfRenderer::new();
    renderer.expect_name().return_const("mock");
    renderer.expect_render().returning(|html| {
        if html.contains("broken") {
            Err(PdfError::Renderer {
                status: Some(1),
                stderr: "Exit with code 1 due to network error".to_string(),
            })
        } else {
            Ok(b"%PDF-1.4".to_vec())
        }
    });

    let results = convert_pdfs_in_parallel(&[good.clone(), bad.clone()], pdf_dir.path(), 2, &renderer).await;

    assert!(results[0].is_success());
    assert_eq!(
        results[0].outcome.as_ref().unwrap(),
        &pdf_dir.path().join("PROJ-1 - Good - Sprint 1.pdf")
    );
    match &results[1].outcome {
        Err(e) => assert!(e.to_string().contains("network error")),
        Ok(path) => panic!("expected failure, got {}", path.display()),
    }
    assert!(!pdf_dir.path().join("PROJ-2 - Bad - Sprint 1.pdf").exists());
}

#[tokio::test]
async fn test_empty_render_output_is_a_failure() {
    let html_dir = tempdir().unwrap();
    let pdf_dir = tempdir().unwrap();
    let html = html_dir.path().join("PROJ-1 - Empty - Sprint 1.html");
    fs::write(&html, "<html></html>").unwrap();

    let mut renderer = MockPdfRenderer::new();
    renderer.expect_name().return_const("mock");
    renderer.expect_render().returning(|_| Ok(Vec::new()));

    let conversion = convert_single_pdf(&html, pdf_dir.path(), &renderer).await;
    assert!(matches!(conversion.outcome, Err(PdfError::EmptyOutput)));
}

#[tokio::test]
async fn test_missing_renderer_binary_is_a_launch_error() {
    let renderer = WkhtmltopdfRenderer::new("/nonexistent/bin/wkhtmltopdf");
    let result = renderer.render("<html><body>x</body></html>").await;
    assert!(matches!(result, Err(PdfError::Launch { .. })), "got {result:?}");
}

#[test]
fn test_pdf_path_mirrors_html_stem() {
    let pdf = pdf_path_for(
        Path::new("exports/PROJ-1 - Do the thing - Sprint 7.html"),
        Path::new("exports/pdf"),
    );
    assert_eq!(pdf, PathBuf::from("exports/pdf/PROJ-1 - Do the thing - Sprint 7.pdf"));
}

#[test]
fn test_pdf_engine_parsing() {
    assert_eq!("wkhtmltopdf".parse::<PdfEngine>().unwrap(), PdfEngine::Wkhtmltopdf);
    assert_eq!("pdfkit".parse::<PdfEngine>().unwrap(), PdfEngine::Wkhtmltopdf);
    assert_eq!("WeasyPrint".parse::<PdfEngine>().unwrap(), PdfEngine::Weasyprint);
    assert!("chrome".parse::<PdfEngine>().is_err());

    let engine: PdfEngine = serde_json::from_str("\"pdfkit\"").unwrap();
    assert_eq!(engine, PdfEngine::Wkhtmltopdf);
    assert_eq!(PdfEngine::default().renderer(None).name(), "wkhtmltopdf");
    assert_eq!(PdfEngine::Weasyprint.renderer(None).name(), "weasyprint");
}
