//! Integration tests for the pdfcos CLI
//!
//! Runs the built binary against small documents written to a temporary
//! directory.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

fn run_cli_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdfcos"))
        .args(args)
        .output()
        .expect("Failed to run the CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Write a document with a catalog, a page and a content stream whose
/// declared length is wrong.
fn write_sample_pdf(dir: &TempDir) -> PathBuf {
    let mut content = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();
    content.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    content.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
    content.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>\nendobj\n");
    content.extend_from_slice(
        b"4 0 obj\n<< /Length 99 /Filter /ASCIIHexDecode >>\nstream\n42542028486929205466204554>\nendstream\nendobj\n",
    );
    content.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n%%EOF\n");

    let path = dir.path().join("sample.pdf");
    fs::write(&path, content).expect("Failed to write sample");
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("UTF-8 temp path")
}

#[test]
fn test_cli_info_command() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);

    let output = run_cli_command(&["info", path_arg(&pdf)]);
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    assert!(text.contains("PDF Version: 1.5"), "{text}");
    assert!(text.contains("Binary marker: yes"));
    assert!(text.contains("Linearized: no"));
    assert!(text.contains("Objects: 4"));
    assert!(text.contains("Streams: 1"));
    assert!(text.contains("Stream length mismatch"), "{text}");
}

#[test]
fn test_cli_objects_command() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);

    let output = run_cli_command(&["objects", path_arg(&pdf)]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("1 0 obj  dictionary /Catalog"), "{text}");
    assert!(text.contains("4 0 obj  stream [27 bytes"), "{text}");
}

#[test]
fn test_cli_objects_json() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);

    let output = run_cli_command(&["objects", path_arg(&pdf), "--json"]);
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = listing.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3]["type"], "stream");
    assert_eq!(entries[3]["length"], 27);
}

#[test]
fn test_cli_show_decodes_stream() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);

    let output = run_cli_command(&["show", path_arg(&pdf), "4"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("BT (Hi) Tf ET"), "{}", stdout(&output));

    let output = run_cli_command(&["show", path_arg(&pdf), "4", "--raw"]);
    assert!(stdout(&output).contains("42542028486929205466204554>"));
}

#[test]
fn test_cli_show_writes_file() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);
    let target = dir.path().join("contents.bin");

    let output = run_cli_command(&["show", path_arg(&pdf), "4", "-o", path_arg(&target)]);
    assert!(output.status.success());
    assert_eq!(fs::read(&target).unwrap(), b"BT (Hi) Tf ET");
}

#[test]
fn test_cli_show_plain_object() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);

    let output = run_cli_command(&["show", path_arg(&pdf), "2", "0"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("/Kids [3 0 R]"), "{text}");
}

#[test]
fn test_cli_show_missing_object() {
    let dir = tempdir().unwrap();
    let pdf = write_sample_pdf(&dir);

    let output = run_cli_command(&["show", path_arg(&pdf), "42"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Object not found"));
}

#[test]
fn test_cli_tokens_command() {
    let dir = tempdir().unwrap();
    let content = dir.path().join("content.txt");
    fs::write(&content, b"BT/F1 12 Tf(Hi)Tj ET").unwrap();

    let output = run_cli_command(&["tokens", path_arg(&content), "--content"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 7, "{text}");
    assert!(text.contains("command BT"));
    assert!(text.contains("name /F1"));
    assert!(text.contains("string Hi"));

    let output = run_cli_command(&["tokens", path_arg(&content), "--limit", "2"]);
    assert_eq!(stdout(&output).lines().count(), 2);
}

#[test]
fn test_cli_rejects_non_pdf() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not_a.pdf");
    fs::write(&path, b"just some text").unwrap();

    let output = run_cli_command(&["info", path_arg(&path)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid PDF header"));
}

#[test]
fn test_cli_missing_file() {
    let output = run_cli_command(&["info", "/nonexistent/file.pdf"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open"));
}
