//! Integration tests for the intrinsic-batch binary
//!
//! Runs the real executable against small generated images.

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a CLI command
fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_intrinsic-batch"))
}

fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(10, 6, |x, y| Rgb([(x * 25) as u8, (y * 40) as u8, 60]))
        .save(&path)
        .unwrap();
    path
}

fn write_list(dir: &Path, entries: &[PathBuf]) -> PathBuf {
    let list = dir.join("images.txt");
    let contents: Vec<String> = entries.iter().map(|p| p.display().to_string()).collect();
    std::fs::write(&list, contents.join("\n")).unwrap();
    list
}

fn jsonl(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_help_lists_flags() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--image_list"))
        .stdout(predicate::str::contains("--parameters_file"));
}

#[test]
fn test_image_list_is_required() {
    cli()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image_list"));
}

#[test]
fn test_batch_text_mode() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_image(dir.path(), "a.png"),
        write_image(dir.path(), "b.png"),
        write_image(dir.path(), "c.png"),
    ];
    let list = write_list(dir.path(), &inputs);

    cli()
        .arg("-l")
        .arg(&list)
        .assert()
        .success()
        .stderr(predicate::str::contains("3 files detected!"))
        .stderr(predicate::str::contains("Batch Decomposition Summary"))
        .stderr(predicate::str::contains("Succeeded:"));

    for stem in ["a", "b", "c"] {
        assert!(dir.path().join(format!("{stem}-r.png")).exists());
        assert!(dir.path().join(format!("{stem}-s.png")).exists());
    }
}

#[test]
fn test_batch_jsonl_report() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_image(dir.path(), "a.png"),
        write_image(dir.path(), "b.png"),
        write_image(dir.path(), "c.png"),
    ];
    let list = write_list(dir.path(), &inputs);

    let output = cli()
        .args(["--format", "jsonl", "--image_list"])
        .arg(&list)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = jsonl(&output.stdout);
    assert_eq!(lines.len(), 4);

    // Job lines arrive in completion order, the summary always comes last
    let mut indices: Vec<u64> = lines[..3]
        .iter()
        .map(|l| {
            assert_eq!(l["type"], "success");
            l["index"].as_u64().unwrap()
        })
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2]);

    assert_eq!(lines[3]["type"], "summary");
    assert_eq!(lines[3]["completed"], 3);
    assert_eq!(lines[3]["failed"], 0);
}

#[test]
fn test_jsonl_mode_reports_progress_on_stderr() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_image(dir.path(), "a.png"),
        write_image(dir.path(), "b.png"),
    ];
    let list = write_list(dir.path(), &inputs);

    let output = cli()
        .args(["--format", "jsonl", "-l"])
        .arg(&list)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1/2"));
    assert!(stderr.contains("2/2"));

    // stdout stays pure JSON
    assert_eq!(jsonl(&output.stdout).len(), 3);
}

#[test]
fn test_missing_image_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        write_image(dir.path(), "a.png"),
        dir.path().join("gone.png"),
    ];
    let list = write_list(dir.path(), &inputs);

    let output = cli()
        .args(["--format", "jsonl", "-l"])
        .arg(&list)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = jsonl(&output.stdout);
    let error = lines.iter().find(|l| l["type"] == "error").unwrap();
    assert_eq!(error["index"], 1);
    assert_eq!(error["kind"], "load");
    assert_eq!(lines[2]["completed"], 1);
    assert_eq!(lines[2]["failed"], 1);
    assert!(dir.path().join("a-r.png").exists());
}

#[test]
fn test_unreadable_image_list_is_fatal() {
    let dir = TempDir::new().unwrap();

    cli()
        .arg("-l")
        .arg(dir.path().join("nope.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to enumerate jobs"));
}

#[test]
fn test_malformed_parameters_are_fatal() {
    let dir = TempDir::new().unwrap();
    let list = write_list(dir.path(), &[write_image(dir.path(), "a.png")]);
    let params = dir.path().join("params.json");
    std::fs::write(&params, "{ \"n_iters\": ").unwrap();

    cli()
        .arg("-l")
        .arg(&list)
        .arg("-p")
        .arg(&params)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load solver parameters"));

    assert!(!dir.path().join("a-r.png").exists());
}

#[test]
fn test_yaml_parameters_file() {
    let dir = TempDir::new().unwrap();
    let list = write_list(dir.path(), &[write_image(dir.path(), "a.png")]);
    let params = dir.path().join("params.yaml");
    std::fs::write(&params, "n_iters: 2\nshading_blur_sigma: 0.1\n").unwrap();

    cli()
        .arg("-l")
        .arg(&list)
        .arg("--parameters_file")
        .arg(&params)
        .assert()
        .success();

    assert!(dir.path().join("a-s.png").exists());
}

#[test]
fn test_colliding_entry_fails_alone() {
    let dir = TempDir::new().unwrap();
    let a = write_image(dir.path(), "a.png");
    let list = write_list(
        dir.path(),
        &[a.clone(), write_image(dir.path(), "b.png"), a, write_image(dir.path(), "a.jpg")],
    );

    let output = cli()
        .args(["--format", "jsonl", "-l"])
        .arg(&list)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = jsonl(&output.stdout);
    assert_eq!(lines.len(), 5);

    let mut rejected: Vec<u64> = lines
        .iter()
        .filter(|l| l["kind"] == "collision")
        .map(|l| l["index"].as_u64().unwrap())
        .collect();
    rejected.sort_unstable();
    assert_eq!(rejected, vec![2, 3]);

    let summary = &lines[4];
    assert_eq!(summary["total_files"], 4);
    assert_eq!(summary["completed"], 2);
    assert_eq!(summary["failed"], 2);
    assert!(dir.path().join("a-s.png").exists());
    assert!(dir.path().join("b-s.png").exists());
}
