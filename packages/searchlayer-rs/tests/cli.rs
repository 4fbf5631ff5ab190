//! Integration tests for the CLI commands

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const PAGE: &str = r#"<html><body>
<div class='ocr_page' id='page_1' title='bbox 0 0 200 100; ppageno 0'>
  <span class='ocr_line' id='line_1_1' title='bbox 10 10 60 30'>
    <span class='ocrx_word' id='word_1_1' title='bbox 10 10 60 30; x_wconf 95'>Hello</span>
  </span>
</div></body></html>"#;

#[test]
fn test_version_command() {
    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.arg("version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("searchlayer "));
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("searchlayer "));
}

#[test]
fn test_version_short_flag() {
    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.arg("-V");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("searchlayer "));
}

#[test]
fn test_inspect_prints_page_index() {
    let dir = tempfile::tempdir().unwrap();
    let markup = dir.path().join("page.hocr");
    std::fs::write(&markup, PAGE).unwrap();

    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.arg("inspect").arg(&markup);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"Hello\""))
        .stdout(predicate::str::contains("\"pages\""));
}

#[test]
fn test_inspect_missing_file_fails() {
    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.args(["inspect", "/definitely/not/here.hocr"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_compose_writes_plan() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::new(200, 100)
        .save(dir.path().join("scan.png"))
        .unwrap();
    std::fs::write(dir.path().join("scan.hocr"), PAGE).unwrap();
    let output = dir.path().join("plan.json");

    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.arg("--quiet")
        .arg("compose")
        .arg(dir.path().join("scan.png"))
        .arg("-o")
        .arg(&output)
        .args(["--text-color", "#000000"]);

    cmd.assert().success();

    let plan: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let pages = plan["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["width"], 200.0);
    assert_eq!(pages[0]["text"][0]["text"], "Hello");
    assert_eq!(pages[0]["text"][0]["rendering"]["mode"], "fill");
    assert_eq!(plan["report"]["text_runs"], 1);
}

#[test]
fn test_compose_scaling_without_target_fails() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::new(20, 10)
        .save(dir.path().join("scan.png"))
        .unwrap();

    let mut cmd = cargo_bin_cmd!("searchlayer");
    cmd.arg("compose")
        .arg(dir.path())
        .arg("-o")
        .arg(dir.path().join("plan.json"))
        .args(["--scale", "scale-width"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("requires a target"));
}
