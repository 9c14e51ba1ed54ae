//! Integration tests for MHTML parsing, link rewriting and file export.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mhtml_split::export::files::{write_files, ExportOptions, MANIFEST_FILE};
use mhtml_split::{convert, Content, MhtmlError, MhtmlParser, ParserOptions, SplitFile};

const BOUNDARY: &str = "------MultipartBoundary--k9eaNRyWWhTZ1w3udCxlzhXsJDCZFc9N9slfmdZezg----";

const HEADER: &str = "From: <Saved by Blink>
Snapshot-Content-Location: http://example.com/
Subject: Example Domain
Date: Wed, 12 Dec 2018 18:00:54 -0000
MIME-Version: 1.0
Content-Type: multipart/related;
  type=\"text/html\";
  boundary=\"----MultipartBoundary--k9eaNRyWWhTZ1w3udCxlzhXsJDCZFc9N9slfmdZezg----\"


";

/// One part of a test archive. Unset headers get the same defaults a
/// browser-saved page would typically carry.
#[derive(Default)]
struct TestPart {
    body: String,
    mime_type: Option<&'static str>,
    location: Option<String>,
    transfer_encoding: Option<&'static str>,
    id: Option<&'static str>,
}

fn html(body: &str, location: &str) -> TestPart {
    TestPart {
        body: body.to_string(),
        location: Some(location.to_string()),
        ..Default::default()
    }
}

fn jpeg(location: &str) -> TestPart {
    TestPart {
        body: "a2FrYQ==".to_string(),
        mime_type: Some("image/jpeg"),
        location: Some(location.to_string()),
        transfer_encoding: Some("base64"),
        ..Default::default()
    }
}

fn css(body: &str) -> TestPart {
    TestPart {
        body: body.to_string(),
        mime_type: Some("text/css"),
        ..Default::default()
    }
}

/// Assemble an MHTML archive in memory.
fn build(parts: &[TestPart]) -> String {
    let separator = format!("\r\n{BOUNDARY}\r\n");
    let rendered: Vec<String> = parts
        .iter()
        .map(|part| {
            let mut headers = vec![
                format!("Content-Type: {}", part.mime_type.unwrap_or("text/html")),
                format!(
                    "Content-Location: {}",
                    part.location.as_deref().unwrap_or("http://example.com")
                ),
                format!(
                    "Content-Transfer-Encoding: {}",
                    part.transfer_encoding.unwrap_or("binary")
                ),
            ];
            if let Some(id) = part.id {
                headers.push(format!("Content-ID: <{id}>"));
            }
            format!("{}\r\n\r\n{}", headers.join("\r\n"), part.body)
        })
        .collect();
    format!("{HEADER}{separator}{}{separator}", rendered.join(&separator))
}

fn run(mhtml: &str) -> Vec<SplitFile> {
    convert(mhtml.as_bytes(), ParserOptions::default()).unwrap()
}

fn text(file: &SplitFile) -> String {
    file.content.to_text().trim().to_string()
}

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// ─── Test 1: Single page ────────────────────────────────────────────

#[test]
fn test_parse_basic_file() {
    let results = run(&build(&[html(
        "<html><body>Hello World!</body></html>",
        "http://testim.io/",
    )]));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "http!testim.io");
    assert_eq!(text(&results[0]), "<html><body>Hello World!</body></html>");
}

// ─── Test 2: No boundary → error ────────────────────────────────────

#[test]
fn test_no_boundary_is_an_error() {
    let result = convert(
        b"<html><body>Hello World!</body></html>",
        ParserOptions::default(),
    );
    assert!(matches!(result, Err(MhtmlError::NoBoundary)));
}

// ─── Test 3: Image links ────────────────────────────────────────────

#[test]
fn test_image_links() {
    let results = run(&build(&[
        html(
            "<html><body><img src=\"http://example.com/1.jpg\"></body></html>",
            "http://example.com/main.html",
        ),
        jpeg("http://example.com/1.jpg"),
    ]));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].filename, "http!example.com!main.html");
    assert_eq!(
        text(&results[0]),
        "<html><body><img src=\"http!example.com!1.jpg\"></body></html>"
    );
    assert_eq!(results[1].filename, "http!example.com!1.jpg");
    assert_eq!(results[1].content.as_bytes(), b"kaka");
}

#[test]
fn test_repeated_image_links() {
    let results = run(&build(&[
        html(
            "<html><body><img src=\"http://example.com/1.jpg\"><img src=\"http://example.com/1.jpg\"></body></html>",
            "http://example.com/main.html",
        ),
        jpeg("http://example.com/1.jpg"),
    ]));
    assert_eq!(
        text(&results[0]),
        "<html><body><img src=\"http!example.com!1.jpg\"><img src=\"http!example.com!1.jpg\"></body></html>"
    );
}

// ─── Test 4: MIME types ─────────────────────────────────────────────

#[test]
fn test_mime_types() {
    let results = run(&build(&[
        html(
            "<html><body><img src='http://example.com/1.jpg'></body></html>",
            "http://example.com/main.html",
        ),
        jpeg("http://example.com/1.jpg"),
    ]));
    assert_eq!(results[0].mime_type, "text/html");
    assert_eq!(results[1].mime_type, "image/jpeg");
}

// ─── Test 5: Frames referenced by content id ────────────────────────

#[test]
fn test_iframes() {
    let mut frame = html(
        "<html><body>Hello World</body></html>",
        "http://example.com/frame.html",
    );
    frame.id = Some("1@blink.mhtml");
    let results = run(&build(&[
        html(
            "<html><body><iframe src='cid:1@blink.mhtml'></iframe></body></html>",
            "http://example.com/main.html",
        ),
        frame,
    ]));
    assert_eq!(results.len(), 2);
    assert_eq!(
        text(&results[0]),
        "<html><body><iframe src='http!example.com!frame.html'></iframe></body></html>"
    );
}

#[test]
fn test_nested_iframes() {
    let mut one = html(
        "<html><body><iframe src=\"cid:2@blink.mhtml\"></iframe></body></html>",
        "http://example.com/one.html",
    );
    one.id = Some("1@blink.mhtml");
    let mut two = html(
        "<html><body>Hello World!</body></html>",
        "http://example.com/two.html",
    );
    two.id = Some("2@blink.mhtml");

    let results = run(&build(&[
        html(
            "<html><body><iframe src=\"cid:1@blink.mhtml\"></iframe></body></html>",
            "http://example.com/main.html",
        ),
        one,
        two,
    ]));
    assert_eq!(results.len(), 3);
    assert_eq!(
        text(&results[0]),
        "<html><body><iframe src=\"http!example.com!one.html\"></iframe></body></html>"
    );
    assert_eq!(
        text(&results[1]),
        "<html><body><iframe src=\"http!example.com!two.html\"></iframe></body></html>"
    );
    assert_eq!(text(&results[2]), "<html><body>Hello World!</body></html>");
}

#[test]
fn test_images_inside_iframes() {
    let mut one = html(
        "<html><body><img src=\"http://example.com/1.jpg\"></body></html>",
        "http://example.com/one.html",
    );
    one.id = Some("1@blink.mhtml");
    let results = run(&build(&[
        html(
            "<html><body><iframe src=\"cid:1@blink.mhtml\"></iframe></body></html>",
            "http://example.com/main.html",
        ),
        one,
        jpeg("http://example.com/1.jpg"),
    ]));
    assert_eq!(results.len(), 3);
    assert_eq!(
        text(&results[1]),
        "<html><body><img src=\"http!example.com!1.jpg\"></body></html>"
    );
}

// ─── Test 6: <base> changes resolution and is neutralized ───────────

#[test]
fn test_base_tag() {
    let results = run(&build(&[
        html(
            "<html><body><base href=\"./foo/\"><img src=\"./1.jpg\"></body></html>",
            "http://example.com/one.html",
        ),
        jpeg("http://example.com/foo/1.jpg"),
    ]));
    assert_eq!(
        text(&results[0]),
        "<html><body><base href=\"\"><img src=\"http!example.com!foo!1.jpg\"></body></html>"
    );
}

// ─── Test 7: Stylesheets ────────────────────────────────────────────

#[test]
fn test_css_without_urls_is_untouched() {
    for body in ["body{}", "body{}h1{}h2{}.foo.bar{}a[href][css].foo#bar{}"] {
        let results = run(&build(&[css(body)]));
        assert_eq!(results.len(), 1);
        assert_eq!(text(&results[0]), body);
    }
}

#[test]
fn test_css_links() {
    let results = run(&build(&[
        css("body{background-image:url(./1.jpg);}"),
        jpeg("http://example.com/1.jpg"),
    ]));
    assert_eq!(
        text(&results[0]),
        "body{background-image:url('http!example.com!1.jpg');}"
    );

    let results = run(&build(&[
        css("body{background-image:url(http://example.com/1.jpg);background:url(http://example.com/1.jpg);}"),
        jpeg("http://example.com/1.jpg"),
    ]));
    assert_eq!(
        text(&results[0]),
        "body{background-image:url('http!example.com!1.jpg');background:url('http!example.com!1.jpg');}"
    );
    assert_eq!(results[0].mime_type, "text/css");
    assert_eq!(results[1].mime_type, "image/jpeg");
}

// ─── Test 8: Oversized parts are dropped ────────────────────────────

#[test]
fn test_max_file_size() {
    let mut image = jpeg("http://example.com/1.jpg");
    image.body = format!("{}==", "a2FrYQ".repeat(10_000));
    let mhtml = build(&[css("body{background-image:url(http://example.com/1.jpg);}"), image]);

    let results = convert(
        mhtml.as_bytes(),
        ParserOptions::default().with_max_file_size(1_000),
    )
    .unwrap();
    assert_eq!(results.len(), 1);
    // no map entry for the dropped image: the link is only made absolute
    assert_eq!(
        text(&results[0]),
        "body{background-image:url('http://example.com/1.jpg');}"
    );
}

// ─── Test 9: Unknown transfer encoding → error ──────────────────────

#[test]
fn test_unknown_transfer_encoding() {
    let mut part = html("<p>x</p>", "http://example.com/");
    part.transfer_encoding = Some("x-uuencode");
    let result = convert(build(&[part]).as_bytes(), ParserOptions::default());
    match result {
        Err(MhtmlError::UnknownEncoding { encoding, excerpt }) => {
            assert_eq!(encoding, "x-uuencode");
            assert!(excerpt.starts_with("<p>x</p>"));
        }
        other => panic!("expected UnknownEncoding, got {other:?}"),
    }
}

#[test]
fn test_transfer_encoding_is_case_sensitive() {
    let mut image = jpeg("http://example.com/a.jpg");
    image.transfer_encoding = Some("Base64");
    let mhtml = build(&[html("<img src=\"a.jpg\">", "http://example.com/"), image]);
    match convert(mhtml.as_bytes(), ParserOptions::default()) {
        Err(MhtmlError::UnknownEncoding { encoding, .. }) => assert_eq!(encoding, "Base64"),
        other => panic!("expected UnknownEncoding, got {other:?}"),
    }
}

// ─── Test 10: Text input gives text output ──────────────────────────

#[test]
fn test_text_input() {
    let mhtml = build(&[html("<p>héllo</p>", "http://example.com/")]);
    let mut parser = MhtmlParser::new(ParserOptions::default());
    let results = parser.parse_str(&mhtml).unwrap().rewrite().spit();
    match &results[0].content {
        Content::Text(s) => assert_eq!(s.trim(), "<p>héllo</p>"),
        Content::Bytes(_) => panic!("expected text content"),
    }
}

// ─── Test 11: Saved page fixture ────────────────────────────────────

#[test]
fn test_fixture_page() {
    let data = std::fs::read(fixture("page.mhtml")).unwrap();
    let results = convert(&data, ParserOptions::default()).unwrap();

    let names: Vec<&str> = results.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(
        names,
        [
            "https!example.org!blog!post.html",
            "https!example.org!css!site.css",
            "https!example.org!blog!img!logo.png",
            "https!example.org!blog!img!icon.svg",
            "frame-1@mhtml.blink",
        ]
    );

    assert_eq!(
        text(&results[0]),
        "<html><head><link rel=\"stylesheet\" href=\"https!example.org!css!site.css\">\
<style>h1{background:url('https!example.org!blog!img!logo.png')}</style></head><body>\
<img src=\"https!example.org!blog!img!logo.png\" srcset=\"https!example.org!blog!img!logo.png\">\
<a href=\"other.html\">x</a><iframe src=\"frame-1@mhtml.blink\"></iframe>\
<svg><use xlink:href=\"#icon\"/></svg></body></html>"
    );
    assert_eq!(
        text(&results[1]),
        "body{background:url('https!example.org!blog!img!logo.png')}\
@import url('https://cdn.example.net/font.css');"
    );
    assert_eq!(results[2].content.as_bytes(), b"\x89PNG\r\n\x1a\n");
    assert_eq!(
        text(&results[3]),
        "<svg xmlns=\"http://www.w3.org/2000/svg\"><image href=\"https!example.org!blog!img!logo.png\"/></svg>"
    );
    assert_eq!(text(&results[4]), "<p>café</p>");
    assert_eq!(results[4].mime_type, "text/html");
}

// ─── Test 12: Writing files to disk ─────────────────────────────────

#[test]
fn test_write_files() {
    let temp = assert_fs::TempDir::new().unwrap();
    let data = std::fs::read(fixture("page.mhtml")).unwrap();
    let files = convert(&data, ParserOptions::default()).unwrap();

    let paths = write_files(&files, temp.path(), &ExportOptions::default(), &|_, _| {}).unwrap();
    assert_eq!(paths.len(), files.len());

    temp.child("https!example.org!blog!post.html")
        .assert(predicate::str::contains("href=\"https!example.org!css!site.css\""));
    temp.child("frame-1@mhtml.blink")
        .assert(predicate::str::contains("café"));
    temp.child("https!example.org!blog!img!logo.png")
        .assert(predicate::path::is_file());
    temp.child(MANIFEST_FILE).assert(predicate::path::missing());
}

#[test]
fn test_write_files_twice_keeps_links_valid() {
    let temp = assert_fs::TempDir::new().unwrap();
    let files = run(&build(&[
        html("<img src=\"a.png\">", "http://example.com/"),
        jpeg("http://example.com/a.png"),
    ]));

    let first = write_files(&files, temp.path(), &ExportOptions::default(), &|_, _| {}).unwrap();
    let second = write_files(&files, temp.path(), &ExportOptions::default(), &|_, _| {}).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        second,
        vec![
            temp.path().join("http!example.com"),
            temp.path().join("http!example.com!a.png"),
        ]
    );

    temp.child("http!example.com")
        .assert(predicate::str::contains("src=\"http!example.com!a.png\""));
    temp.child("http!example.com!a.png").assert("kaka");
    temp.child("http!example_1.com").assert(predicate::path::missing());
    temp.child("http!example.com!a_1.png").assert(predicate::path::missing());
}

#[test]
fn test_write_files_replaces_stale_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("http!testim.io").write_str("old").unwrap();

    let files = run(&build(&[html("<p>new</p>", "http://testim.io/")]));
    let paths = write_files(&files, temp.path(), &ExportOptions::default(), &|_, _| {}).unwrap();

    assert_eq!(paths[0], temp.path().join("http!testim.io"));
    temp.child("http!testim.io")
        .assert(predicate::str::contains("<p>new</p>"));
}

#[test]
fn test_write_files_without_overwrite_refuses_existing() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("http!example.com!a.png").write_str("old").unwrap();

    let files = run(&build(&[
        html("<img src=\"a.png\">", "http://example.com/"),
        jpeg("http://example.com/a.png"),
    ]));
    let options = ExportOptions {
        overwrite: false,
        ..Default::default()
    };
    let err = write_files(&files, temp.path(), &options, &|_, _| {}).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MhtmlError>(),
        Some(MhtmlError::ExportError(msg)) if msg.contains("http!example.com!a.png")
    ));
    // Nothing is written when any target is taken.
    temp.child("http!example.com").assert(predicate::path::missing());
    temp.child("http!example.com!a.png").assert("old");
}

#[test]
fn test_write_files_manifest_and_placeholder_names() {
    let temp = tempfile::tempdir().unwrap();
    let files = vec![SplitFile {
        filename: String::new(),
        content: Content::Bytes(b"abc".to_vec()),
        mime_type: "application/octet-stream".to_string(),
    }];
    let options = ExportOptions {
        write_manifest: true,
        ..Default::default()
    };

    let progress = std::cell::RefCell::new(Vec::new());
    let paths = write_files(&files, temp.path(), &options, &|done, total| {
        progress.borrow_mut().push((done, total));
    })
    .unwrap();

    assert_eq!(paths[0], temp.path().join("part-0"));
    assert_eq!(progress.into_inner(), vec![(0, 1), (1, 1)]);

    let manifest = std::fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(json[0]["filename"], "");
    assert_eq!(json[0]["type"], "application/octet-stream");
    assert_eq!(json[0]["size"], 3);
}

#[test]
fn test_write_files_rejects_escaping_names() {
    let temp = tempfile::tempdir().unwrap();
    let files = vec![SplitFile {
        filename: "../escape".to_string(),
        content: Content::Text("x".to_string()),
        mime_type: "text/plain".to_string(),
    }];
    let err = write_files(&files, temp.path(), &ExportOptions::default(), &|_, _| {}).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MhtmlError>(),
        Some(MhtmlError::InvalidPath(_))
    ));
}
