//! Integration tests for the `clue` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn clue() -> Command {
    Command::cargo_bin("clue").unwrap()
}

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn test_resolve_single_year_text() {
    clue()
        .arg("resolve")
        .write_stdin(r#"[{"kind": "whitelist", "year": 1985}]"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("earliest: 1985-01-01T00:00:00"))
        .stdout(predicate::str::contains("latest:   1985-12-31T23:59:59"))
        .stdout(predicate::str::contains(
            "364 days, 23 hours, 59 minutes, 59 seconds",
        ));
}

#[test]
fn test_resolve_json_lists_ranges() {
    let output = clue()
        .args(["resolve", "--json"])
        .write_stdin(
            r#"[{"kind": "whitelist", "year": 2001}, {"kind": "blacklist", "month": 10}]"#,
        )
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["possible"], true);
    assert_eq!(report["earliest"], "2001-01-01T00:00:00");
    assert_eq!(report["latest_utc"], "2001-12-31T23:59:59Z");
    let ranges = report["ranges"].as_array().unwrap();
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0]["end"], "2001-09-30T23:59:59");
    assert_eq!(ranges[1]["start"], "2001-11-01T00:00:00");
}

#[test]
fn test_resolve_contradiction() {
    clue()
        .arg("resolve")
        .write_stdin(
            r#"[{"kind": "whitelist", "year": 2001}, {"kind": "blacklist", "year": 2001}]"#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("no possible moments"));
}

#[test]
fn test_resolve_month_day_and_weekday() {
    clue()
        .args(["resolve", "--default-year", "2001"])
        .write_stdin(
            r#"[{"kind": "whitelist", "month": 9}, {"kind": "whitelist", "weekday": 2}]"#,
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("ranges:   4"))
        .stdout(predicate::str::contains(
            "2001-09-11T00:00:00 .. 2001-09-11T23:59:59",
        ));
}

#[test]
fn test_resolve_reads_clue_file_and_config() {
    clue()
        .args(["resolve", &fixture("leap_day.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("no possible moments"));

    clue()
        .args(["--config", &fixture("julian.json"), "resolve", &fixture("leap_day.json")])
        .assert()
        .success()
        .stdout(predicate::str::contains("earliest: 1900-02-29T00:00:00"));
}

#[test]
fn test_calendar_flag_overrides_config() {
    clue()
        .args([
            "--config",
            &fixture("julian.json"),
            "--calendar",
            "gregorian",
            "resolve",
            &fixture("leap_day.json"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("no possible moments"));
}

#[test]
fn test_check_partial_moment() {
    let clues = r#"[{"kind": "whitelist", "year": 1985}, {"kind": "whitelist", "month": 3}]"#;
    clue()
        .args(["check", "--at", "1985-03"])
        .write_stdin(clues)
        .assert()
        .success()
        .stdout("possible\n");
    clue()
        .args(["check", "--at", "1985-04-01T00:00:00"])
        .write_stdin(clues)
        .assert()
        .success()
        .stdout("impossible\n");
}

#[test]
fn test_check_instant_in_timezone() {
    let clues = r#"[{"kind": "whitelist", "year": 2001}, {"kind": "whitelist", "month": 3}, {"kind": "whitelist", "day": 5}]"#;
    clue()
        .args(["--timezone", "America/New_York", "check", "--at", "2001-03-05T04:59:59Z"])
        .write_stdin(clues)
        .assert()
        .success()
        .stdout("impossible\n");
    clue()
        .args(["--timezone", "America/New_York", "check", "--at", "2001-03-05T05:00:00Z"])
        .write_stdin(clues)
        .assert()
        .success()
        .stdout("possible\n");
}

#[test]
fn test_invalid_clue_rejected() {
    clue()
        .arg("resolve")
        .write_stdin(r#"[{"kind": "whitelist", "year": 2001, "hour": 3}]"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid clues"));
}

#[test]
fn test_unknown_timezone_rejected() {
    clue()
        .args(["--timezone", "Mars/Olympus", "resolve"])
        .write_stdin(r#"[{"kind": "whitelist", "year": 2001}]"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timezone"));
}
