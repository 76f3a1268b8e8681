/// CLI binary integration tests using assert_cmd
///
/// These tests invoke the actual binary against an export file written to a temp dir
mod common;

use std::process::Command;

use assert_cmd::prelude::*;
use common::{ExportBuilder, path_str};
use predicates::prelude::*;

// 2024-05-01 10:00:00 UTC
const MAY_1: i64 = 1_714_557_600;

fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
    ExportBuilder::new()
        .conversation("a", "Rust lifetimes", MAY_1, &["What is a lifetime?", "A region of code."])
        .conversation("b", "Async runtimes", MAY_1 + 3600, &["Explain rust futures", "Polling."])
        .conversation("c", "Gardening", MAY_1 + 40 * 86_400, &["tomatoes"])
        .build()
}

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chat-timeline"));
    for var in [
        "CHAT_TIMELINE_URL",
        "CONVERSATIONS_DATA_PATH",
        "CHAT_TIMELINE_TIMEOUT",
        "CHAT_TIMELINE_SEARCH_LIMIT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_help_flag() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("heatmap"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("--data"));
}

#[test]
fn test_cli_stats_command_with_data() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total conversations: 3"))
        .stdout(predicate::str::contains("Total messages: 5"))
        .stdout(predicate::str::contains("Date range: 2024-05-01 to 2024-06-10"))
        .stdout(predicate::str::contains("gpt-4o"));
}

#[test]
fn test_cli_data_path_from_env() {
    let (_dir, path) = fixture();
    bin()
        .env("CONVERSATIONS_DATA_PATH", &path)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total conversations: 3"));
}

#[test]
fn test_cli_day_command() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "day", "2024-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 conversation(s) on 2024-05-01"))
        .stdout(predicate::str::contains("Rust lifetimes"))
        .stdout(predicate::str::contains("Async runtimes"));
}

#[test]
fn test_cli_day_command_empty_day() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "day", "2024-05-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversations on 2024-05-02"));
}

#[test]
fn test_cli_day_rejects_bad_date() {
    let (_dir, path) = fixture();
    bin().args(["--data", path_str(&path), "day", "May 1st"]).assert().failure();
}

#[test]
fn test_cli_search_command() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "search", "rust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 result(s) for 'rust'"));

    bin()
        .args(["--data", path_str(&path), "search", "rust", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 result(s) for 'rust'"));
}

#[test]
fn test_cli_search_limit_out_of_range() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "search", "rust", "--limit", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Search limit"));
}

#[test]
fn test_cli_export_to_stdout() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "export", "a"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Rust lifetimes\n"))
        .stdout(predicate::str::contains("## User\n\nWhat is a lifetime?"))
        .stdout(predicate::str::contains("## Assistant\n\nA region of code."));
}

#[test]
fn test_cli_export_into_directory() {
    let (dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "export", "b", "--output", path_str(dir.path())])
        .assert()
        .success();

    let written = std::fs::read_to_string(dir.path().join("async-runtimes.md")).unwrap();
    assert!(written.starts_with("# Async runtimes"));
}

#[test]
fn test_cli_export_unknown_conversation() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "export", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conversation not found: nope"));
}

#[test]
fn test_cli_heatmap_for_year() {
    let (_dir, path) = fixture();
    bin()
        .args(["--data", path_str(&path), "heatmap", "--year", "2024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activity in 2024 (2024-01 → 2024-12)"))
        .stdout(predicate::str::contains("Jan"))
        .stdout(predicate::str::contains("Conversations: 3"));
}

#[test]
fn test_cli_missing_export_file() {
    bin()
        .args(["--data", "/definitely/not/here.json", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load conversations export"));
}

#[test]
fn test_cli_unreachable_server() {
    bin()
        .args(["--url", "http://127.0.0.1:9", "--timeout", "2", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load statistics"));
}
