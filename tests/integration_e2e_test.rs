use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

mod common;

fn mobylette(workdir: &Path) -> Command {
    let config = workdir.join("empty.toml");
    if !config.exists() {
        fs::write(&config, "").expect("write empty config");
    }
    let mut cmd = Command::cargo_bin("mobylette").expect("binary builds");
    cmd.current_dir(workdir)
        .env_remove("LOG_LEVEL")
        .env_remove("LOG_OUTPUT")
        .env_remove("MOBYLETTE_MAX_ROWS")
        .arg("--config")
        .arg(&config);
    cmd
}

fn sample_log(dir: &Path) -> std::path::PathBuf {
    common::create_test_log(
        dir,
        "lmod.log",
        &[
            common::minimal_line("1546333200.1", "alice", "gcc/8.2.0"),
            common::minimal_line("1546333201.1", "bob", "gcc/8.2.0"),
            common::minimal_line("1546333202.1", "alice", "gcc/8.2.0"),
            common::minimal_line("1546333203.1", "alice", "python/3.9"),
            common::minimal_line("1546333204.1", "carol", "cmake/3.20"),
            "Jan  1 10:00:05 cn001 kernel: unrelated".to_string(),
        ],
    )
    .expect("write sample log")
}

#[test]
fn test_csv_report_written() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    mobylette(temp_dir.path())
        .args(["--uniq", "users", "--no-charts"])
        .arg(&log)
        .assert()
        .success();

    let csv = fs::read_to_string(temp_dir.path().join("mobylette.csv")).unwrap();
    assert_eq!(csv, "module,count\ngcc/8.2.0,2\ncmake/3.20,1\npython/3.9,1\n");
}

#[test]
fn test_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    let output = mobylette(temp_dir.path())
        .args(["--uniq", "users", "--no-charts", "--json"])
        .arg(&log)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["count"], "users");
    let modules = json["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);
    assert_eq!(modules[0]["module"], "gcc/8.2.0");
    assert_eq!(modules[0]["count"], 2);
}

#[test]
fn test_module_filter() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    mobylette(temp_dir.path())
        .args(["--uniq", "users", "--no-charts", "--module", "python/3.9", "--"])
        .arg(&log)
        .assert()
        .success();

    let csv = fs::read_to_string(temp_dir.path().join("mobylette.csv")).unwrap();
    assert_eq!(csv, "module,count\npython/3.9,1\n");
}

#[test]
fn test_chart_limits_conflict() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    mobylette(temp_dir.path())
        .args(["--max-charts", "2", "--max-rows", "5"])
        .arg(&log)
        .assert()
        .failure();
}

#[test]
fn test_zero_max_rows_rejected_before_reading() {
    let temp_dir = TempDir::new().unwrap();

    mobylette(temp_dir.path())
        .args(["--max-rows", "0"])
        .arg(temp_dir.path().join("does-not-exist.log"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max rows must be at least 1"));
}

#[test]
fn test_invalid_date_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    mobylette(temp_dir.path())
        .args(["--start", "2019-01-01"])
        .arg(&log)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid date"));
}

#[test]
fn test_missing_file_aborts_unless_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());
    let missing = temp_dir.path().join("missing.log");

    mobylette(temp_dir.path())
        .args(["--uniq", "users", "--no-charts"])
        .arg(&log)
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not read log file"));

    mobylette(temp_dir.path())
        .args(["--uniq", "users", "--no-charts", "--skip-unreadable"])
        .arg(&log)
        .arg(&missing)
        .assert()
        .success();
}

#[test]
fn test_max_charts_writes_one_svg_per_page() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());
    let charts = temp_dir.path().join("charts");
    fs::create_dir_all(&charts).unwrap();
    fs::write(
        temp_dir.path().join("empty.toml"),
        format!("[chart]\noutput_dir = {:?}\n", charts.display().to_string()),
    )
    .unwrap();

    mobylette(temp_dir.path())
        .args(["--uniq", "users", "--max-charts", "2"])
        .arg(&log)
        .assert()
        .success();

    let svgs: Vec<_> = fs::read_dir(&charts)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "svg"))
        .collect();
    assert_eq!(svgs.len(), 2);
}

#[test]
fn test_top_truncates_summary_table() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    mobylette(temp_dir.path())
        .args(["--uniq", "users", "--no-charts", "--top", "1"])
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("gcc/8.2.0"))
        .stdout(predicate::str::contains("python/3.9").not())
        .stdout(predicate::str::contains("… 2 more"));
}

#[test]
fn test_json_group_matches_cli_value() {
    let temp_dir = TempDir::new().unwrap();
    let log = sample_log(temp_dir.path());

    let output = mobylette(temp_dir.path())
        .args(["--uniq", "users", "--group", "path", "--no-charts", "--json"])
        .arg(&log)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["group"], "path");
    assert_eq!(json["modules"][0]["group"], "/opt");
}
