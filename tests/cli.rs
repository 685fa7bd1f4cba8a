//! Smoke tests for the `docx-reformat` binary.
//!
//! The binary is spawned as a child process; runs that need a service talk
//! to a local axum server so nothing leaves the machine.
#![cfg(feature = "cli")]

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use std::process::{Command, Output};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn cli() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docx-reformat"));
    for var in [
        "DOCX_REFORMAT_ENDPOINT",
        "DOCX_REFORMAT_TIMEOUT",
        "DOCX_REFORMAT_OUTPUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_docx(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"PK\x03\x04body").unwrap();
    path
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/process-document")
}

async fn run(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Argument handling ────────────────────────────────────────────────────────

#[test]
fn no_arguments_prints_usage_and_fails() {
    let output = cli().output().unwrap();
    assert!(!output.status.success());
    let text = format!("{}{}", String::from_utf8_lossy(&output.stdout), stderr(&output));
    assert!(text.contains("Usage"), "got: {text}");
}

#[test]
fn instruction_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "notes.docx");
    let output = cli().arg(&input).output().unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--instruction"), "got: {}", stderr(&output));
}

#[test]
fn invalid_endpoint_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "notes.docx");
    let output = cli()
        .arg(&input)
        .args(["-i", "x", "--endpoint", "ftp://example.com", "--no-progress"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid configuration"), "got: {}", stderr(&output));
}

#[test]
fn missing_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli()
        .arg(dir.path().join("absent.docx"))
        .args(["-i", "x", "--no-progress"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("Failed to read input document"),
        "got: {}",
        stderr(&output)
    );
}

#[test]
fn wrong_extension_reports_invalid_file_type() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, b"plain text").unwrap();
    let output = cli()
        .arg(&input)
        .args(["-i", "x", "--no-progress"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid file type"), "got: {}", stderr(&output));
}

// ── Against a local service ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn successful_run_saves_versioned_copy_and_prints_preview() {
    let router = Router::new().route(
        "/process-document",
        post(|| async {
            Json(json!({
                "message": "Documento procesado exitosamente",
                "docx_base64": "QQ==",
                "html_content": "<p>A</p>",
            }))
        }),
    );
    let endpoint = serve(router).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "notes.docx");
    let out = dir.path().join("out");

    let mut cmd = cli();
    cmd.arg(&input)
        .args(["-i", "remove x", "--timeout", "10", "--no-progress"])
        .arg("--endpoint")
        .arg(&endpoint)
        .arg("-o")
        .arg(&out);
    let output = run(cmd).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read(out.join("notes_v1.docx")).unwrap(), vec![0x41]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "A");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_run_emits_json_summary_and_nonzero_exit() {
    let router = Router::new().route(
        "/process-document",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "conversion failed" })),
            )
        }),
    );
    let endpoint = serve(router).await;
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "notes.docx");

    let mut cmd = cli();
    cmd.arg(&input)
        .args(["-i", "remove x", "--timeout", "10", "--json"])
        .arg("--endpoint")
        .arg(&endpoint)
        .arg("-o")
        .arg(dir.path());
    let output = run(cmd).await;

    assert!(!output.status.success());
    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["state"], "Failed");
    assert_eq!(summary["errors"][0]["origin"], "processDocument");
    assert_eq!(summary["errors"][0]["message"], "conversion failed");
    assert!(!dir.path().join("notes_v1.docx").exists());
}
