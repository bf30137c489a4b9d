//! Format derivation tests on real files
use kindlekeep_core::*;
use tempfile::TempDir;

/// 1x1 transparent PNG.
#[cfg(feature = "pdf")]
const PNG_1X1: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[cfg(feature = "pdf")]
#[tokio::test]
async fn test_derive_pdf_with_inline_image() {
    let tmp = TempDir::new().unwrap();
    let html_path = tmp.path().join("article.html");
    let html = format!(
        r#"<html><head><title>T</title></head><body><h1>Title</h1><p>Body text.</p><img src="data:image/png;base64,{}" width="10" height="10"></body></html>"#,
        PNG_1X1
    );
    std::fs::write(&html_path, &html).unwrap();

    let derived = derive(&html_path, OutputFormat::Pdf).await;
    assert_eq!(derived, tmp.path().join("article.pdf"));

    let bytes = std::fs::read(&derived).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(std::fs::read_to_string(&html_path).unwrap(), html);
}

#[tokio::test]
async fn test_mobi_without_tools_falls_back_to_html() {
    let tmp = TempDir::new().unwrap();
    let empty_bin = TempDir::new().unwrap();
    // SAFETY: no other test in this binary reads PATH or spawns processes.
    unsafe { std::env::set_var("PATH", empty_bin.path()) };

    let html_path = tmp.path().join("article.html");
    std::fs::write(&html_path, "<html><head><title>T</title></head><body><p>x</p></body></html>").unwrap();

    assert!(convert_html(&html_path, OutputFormat::Mobi).await.is_err());
    assert_eq!(derive(&html_path, OutputFormat::Mobi).await, html_path);
    assert!(!tmp.path().join("article.mobi").exists());
}
