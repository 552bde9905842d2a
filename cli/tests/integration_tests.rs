use std::path::Path;
use std::process::{Command, Output};

const LEFT: &str = "1. Alpha clause text goes here\n\
                    2. Beta clause text goes here\n\
                    3. Gamma clause text goes here";
const RIGHT: &str = "1. Alpha clause text goes here\n\
                     2. Beta clause text went here\n\
                     3. Gamma clause text goes here";

fn doc_compare_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_doc-compare"))
}

fn write(dir: &Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write input");
    path.to_string_lossy().into_owned()
}

fn run(args: &[&str]) -> Output {
    doc_compare_cmd()
        .args(args)
        .output()
        .expect("failed to run doc-compare")
}

#[test]
fn unify_prints_json_pair() {
    let dir = tempfile::tempdir().expect("tempdir");
    let left = write(dir.path(), "left.txt", LEFT.as_bytes());
    let right = write(dir.path(), "right.txt", RIGHT.as_bytes());

    let output = run(&["unify", "--format", "json", &left, &right]);
    assert!(
        output.status.success(),
        "unify should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert!(json["left"].as_str().unwrap().contains("Alpha clause"));
    assert!(json["right"].as_str().unwrap().contains("went here"));
    assert!(json["chapters"].as_u64().unwrap() >= 1);
}

#[test]
fn unify_writes_out_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let left = write(dir.path(), "left.txt", LEFT.as_bytes());
    let right = write(dir.path(), "right.txt", RIGHT.as_bytes());
    let out = dir.path().join("out");

    let output = run(&["unify", &left, &right, "--out-dir", &out.to_string_lossy()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Chapters: "));
    assert!(std::fs::read_to_string(out.join("left.txt")).unwrap().contains("Gamma"));
    assert!(out.join("right.txt").exists());
}

#[test]
fn invalid_threshold_exits_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let left = write(dir.path(), "left.txt", LEFT.as_bytes());
    let right = write(dir.path(), "right.txt", RIGHT.as_bytes());

    let output = run(&["unify", "--threshold", "0", &left, &right]);
    assert_eq!(
        output.status.code(),
        Some(2),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn missing_input_exits_2() {
    let output = run(&["extract", "/definitely/not/here.docx"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open"));
}

#[test]
fn pdf_input_needs_the_server() {
    let dir = tempfile::tempdir().expect("tempdir");
    let left = write(dir.path(), "scan.pdf", b"%PDF-1.4\n");
    let right = write(dir.path(), "right.txt", RIGHT.as_bytes());

    let output = run(&["unify", &left, &right]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("remote"));
}

#[test]
fn report_round_trips_through_extract() {
    let dir = tempfile::tempdir().expect("tempdir");
    let left = write(dir.path(), "contract.txt", LEFT.as_bytes());
    let right = write(dir.path(), "edited.txt", RIGHT.as_bytes());
    let report = dir.path().join("protocol.docx");

    let output = run(&["report", "--unify", &left, &right, "-o", &report.to_string_lossy()]);
    assert!(
        output.status.success(),
        "report should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 with changes"), "stdout={stdout}");

    let output = run(&["extract", &report.to_string_lossy()]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Протокол разногласий"));
    assert!(text.contains("contract.txt"));
    assert!(text.contains("went here"));
}

#[test]
fn extract_reads_docx_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = doc_compare::ReportOptions::default();
    let bytes = doc_compare::save_disagreement("1. First", "1. Second", &options)
        .expect("render docx");
    let path = write(dir.path(), "sample.docx", &bytes);

    let output = run(&["extract", &path]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Second"));
}
