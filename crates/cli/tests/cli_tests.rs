// End-to-end tests for the `townlink` binary, run against the linkage fixtures.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::TempDir;

const FIXTURE_FILES: &[&str] = &["andover.toml", "census.csv", "assessment.csv", "water.csv", "solar.csv"];

fn townlink() -> Command {
    Command::new(env!("CARGO_BIN_EXE_townlink"))
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../linkage/tests/fixtures")
}

/// Copy the fixture config and sources into a scratch dir so outputs land there.
fn scratch_fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in FIXTURE_FILES {
        std::fs::copy(fixtures_dir().join(file), dir.path().join(file)).unwrap();
    }
    dir
}

fn run(args: &[&str]) -> Output {
    townlink().args(args).output().expect("spawn townlink")
}

fn table_rows(db: &Path, table: &str) -> Option<i64> {
    let conn = Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
        .ok()
}

#[test]
fn run_writes_lookup_tables() {
    let dir = scratch_fixture();
    let config = dir.path().join("andover.toml");
    let output = run(&["run", config.to_str().unwrap()]);

    assert!(
        output.status.success(),
        "exit: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let db = dir.path().join("lookup.sqlite");
    assert_eq!(table_rows(&db, "Lookup"), Some(9));
    assert_eq!(table_rows(&db, "LookupDebug"), Some(9));
    assert_eq!(table_rows(&db, "ZoneLookup"), Some(4));
    assert!(output.stdout.is_empty());
}

#[test]
fn run_json_prints_summary() {
    let dir = scratch_fixture();
    let config = dir.path().join("andover.toml");
    let output = run(&["run", config.to_str().unwrap(), "--json", "--release-only"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim()).expect("stdout is one JSON value");
    assert_eq!(val["name"], "Andover fixture");
    assert_eq!(val["summary"]["rows"], 9);
    assert_eq!(val["summary"]["residents"], 5);
    assert_eq!(val["tables"], serde_json::json!(["Lookup", "ZoneLookup"]));

    let db = dir.path().join("lookup.sqlite");
    assert_eq!(table_rows(&db, "Lookup"), Some(9));
    assert_eq!(table_rows(&db, "LookupDebug"), None);
}

#[test]
fn validate_accepts_fixture_config() {
    let output = run(&["validate", fixtures_dir().join("andover.toml").to_str().unwrap()]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("valid: 'Andover fixture' with 4 source(s)"), "stderr: {stderr}");
}

#[test]
fn invalid_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    std::fs::write(&config, "name = \"broken\"\n[sources.census]\nfile = \"c.csv\"\ncity = \"Andover\"\n[sources.census.address]\nfull = \"Address\"\n").unwrap();

    let output = run(&["validate", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("assessment"));
}

#[test]
fn missing_source_file_exits_5() {
    let dir = scratch_fixture();
    std::fs::remove_file(dir.path().join("water.csv")).unwrap();
    let config = dir.path().join("andover.toml");

    let output = run(&["run", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5));
    assert!(!dir.path().join("lookup.sqlite").exists());
}

#[test]
fn missing_config_is_usage_error() {
    let output = run(&["run", "/nonexistent/andover.toml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn normalize_prints_parts() {
    let output = run(&["normalize", "12 Main Street Apt 4", "--city", "Andover"]);
    assert!(output.status.success());

    let val: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(val["full_text"], "12 MAIN ST");
    assert_eq!(val["street_number"], "12");
    assert_eq!(val["street_name"], "MAIN ST");
    assert_eq!(val["canonical"], true);
}
