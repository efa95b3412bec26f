use super::*;
use tempfile::TempDir;

#[test]
fn parse_source() {
    assert!(matches!(
        DocumentSource::parse("https://example.com/article"),
        DocumentSource::Url(url) if url.host_str() == Some("example.com")
    ));
    assert!(matches!(
        DocumentSource::parse("  http://localhost:8080/a  "),
        DocumentSource::Url(_)
    ));
    assert_eq!(
        DocumentSource::parse("notes/doc.txt"),
        DocumentSource::File(PathBuf::from("notes/doc.txt"))
    );
    assert_eq!(
        DocumentSource::parse("file:///etc/hosts"),
        DocumentSource::File(PathBuf::from("file:///etc/hosts"))
    );
}

#[test]
fn validate_url_schemes() {
    assert!(validate_url("https://example.com").is_ok());
    assert!(validate_url("ftp://example.com").is_err());
    assert!(validate_url("not a url").is_err());
}

#[test]
fn extract_paragraph_text_only() {
    let html = r#"
        <html>
        <head><title>Ignored</title><script>var x = "<p>no</p>";</script></head>
        <body>
            <h1>Heading is skipped</h1>
            <p>First   paragraph with <b>bold</b> text.</p>
            <div>Loose div text</div>
            <p>
                Second paragraph
                across lines.
            </p>
            <p>   </p>
        </body>
        </html>
    "#;

    let text = extract_paragraphs(html);

    assert_eq!(
        text,
        "First paragraph with bold text.\n\nSecond paragraph across lines."
    );
}

#[test]
fn extract_from_page_without_paragraphs() {
    assert_eq!(extract_paragraphs("<html><body><div>x</div></body></html>"), "");
}

#[test]
fn read_existing_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("doc.txt");
    fs::write(&path, "Para one.\n\nPara two.").expect("should write fixture");

    let text = read_file(&path).expect("read should succeed");

    assert_eq!(text, "Para one.\n\nPara two.");
}

#[test]
fn read_missing_file_is_not_found() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let err = read_file(&temp_dir.path().join("missing.txt")).expect_err("should fail");

    assert!(matches!(err, RagError::NotFound(_)));
}

#[test]
fn load_dispatches_on_source() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("doc.txt");
    fs::write(&path, "content").expect("should write fixture");
    let fetcher = DocumentFetcher::new(temp_dir.path().join("Selected_Document.txt"));

    let text = fetcher
        .load(&DocumentSource::File(path))
        .expect("load should succeed");

    assert_eq!(text, "content");
    assert!(!fetcher.document_path().exists());
}

#[test]
fn source_display() {
    assert_eq!(
        DocumentSource::parse("https://example.com/a").to_string(),
        "https://example.com/a"
    );
    assert_eq!(DocumentSource::parse("doc.txt").to_string(), "doc.txt");
}
