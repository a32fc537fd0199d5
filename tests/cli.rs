mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pdfqa_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pdfqa"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.pdf"),
        common::pdf_with_pages(&["Alpha document about Rust programming and cargo"]),
    )
    .unwrap();
    fs::write(files_dir.join("broken.pdf"), b"this is not a pdf").unwrap();

    let config_path = common::write_config(&root, "");
    (tmp, config_path)
}

fn run_pdfqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(pdfqa_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .env_remove("OPENAI_API_KEY")
        .output()
        .expect("Failed to run pdfqa binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database_and_index_dir() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_pdfqa(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Initialized database"));
    assert!(tmp.path().join("data/pdfqa.sqlite").exists());
    assert!(tmp.path().join("data/index").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    assert!(run_pdfqa(&config, &["init"]).2);
    let (_, stderr, success) = run_pdfqa(&config, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_list_empty() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_pdfqa(&config, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_ask_empty_index_reports_no_information() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_pdfqa(&config, &["ask", "What is Rust?"]);
    assert!(success, "ask failed: {}", stderr);
    assert_eq!(stdout.trim(), "No relevant information found.");
}

#[test]
fn test_ask_unknown_document_scope() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_pdfqa(&config, &["ask", "anything", "--doc", "deadbeef_x.pdf"]);
    assert!(!success);
    assert!(
        stderr.contains("document not found"),
        "expected not found, got: {}",
        stderr
    );
}

#[test]
fn test_ask_rejects_zero_k() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_pdfqa(&config, &["ask", "anything", "--k", "0"]);
    assert!(!success);
    assert!(stderr.contains("k must be > 0"), "got: {}", stderr);
}

#[test]
fn test_upload_with_disabled_embedding_rolls_back() {
    let (tmp, config) = setup_test_env();
    let pdf = tmp.path().join("files/alpha.pdf");
    let (_, stderr, success) = run_pdfqa(&config, &["upload", pdf.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "got: {}", stderr);

    // Nothing stays registered after a failed ingestion.
    let (stdout, _, success) = run_pdfqa(&config, &["list"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_upload_non_pdf_reports_extraction_error() {
    let (tmp, config) = setup_test_env();
    let broken = tmp.path().join("files/broken.pdf");
    let (_, stderr, success) = run_pdfqa(&config, &["upload", broken.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("text extraction failed"), "got: {}", stderr);
    assert!(stderr.contains("1 of 1 file(s) failed"));
}

#[test]
fn test_upload_empty_directory() {
    let (tmp, config) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let (_, stderr, success) = run_pdfqa(&config, &["upload", empty.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("No PDF files found"));
}

#[test]
fn test_chunk_preview_stores_nothing() {
    let (tmp, config) = setup_test_env();
    let pdf = tmp.path().join("files/alpha.pdf");
    let (stdout, stderr, success) = run_pdfqa(&config, &["chunk", pdf.to_str().unwrap()]);
    assert!(success, "chunk failed: {}", stderr);
    assert!(stdout.contains("1 chunk(s)"), "got: {}", stdout);
    assert!(stdout.contains("cargo"));
    assert!(!tmp.path().join("data/pdfqa.sqlite").exists());
}

#[test]
fn test_chunk_preview_strategy_override() {
    let (tmp, config) = setup_test_env();
    let pdf = tmp.path().join("files/alpha.pdf");
    let (stdout, stderr, success) = run_pdfqa(
        &config,
        &["chunk", pdf.to_str().unwrap(), "--strategy", "semantic"],
    );
    assert!(success, "chunk failed: {}", stderr);
    assert!(stdout.contains("[semantic"));

    let (_, stderr, success) = run_pdfqa(
        &config,
        &["chunk", pdf.to_str().unwrap(), "--strategy", "bogus"],
    );
    assert!(!success);
    assert!(stderr.contains("bogus"));
}

#[test]
fn test_delete_missing_document() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_pdfqa(&config, &["delete", "nope"]);
    assert!(!success);
    assert!(stderr.contains("Document not found: nope"));
}

#[test]
fn test_clear_and_stats_on_empty() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_pdfqa(&config, &["clear"]);
    assert!(success, "clear failed: {}", stderr);
    assert!(stdout.contains("Cleared 0 document(s)."));

    let (stdout, stderr, success) = run_pdfqa(&config, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Documents:   0"));
    assert!(stdout.contains("Passages:    0"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = common::write_config(tmp.path(), "[embedding]\nprovider = \"openai\"\n");
    let (_, stderr, success) = run_pdfqa(&config, &["list"]);
    assert!(!success);
    assert!(stderr.contains("embedding.dims"), "got: {}", stderr);
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_pdfqa(&tmp.path().join("nope.toml"), &["list"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
