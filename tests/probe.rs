//! Integration tests for the `probe` subcommand: end-to-end inference over
//! delimited-text sources, report persistence, and fatal-error reporting.

mod common;

use assert_cmd::Command;
use predicates::str::contains;
use tabular_probe::report::ProbeReport;

use common::TestWorkspace;

#[test]
fn probe_reports_types_and_patterns_for_each_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "orders.csv",
        "id,price,ordered_on,note\n\
         1,9.75,2023-04-15,first\n\
         2,3.50,2023-01-05,second\n",
    );

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("integer"))
        .stdout(contains("float"))
        .stdout(contains("%Y-%m-%d"))
        .stdout(contains("string"));
}

#[test]
fn probe_saves_a_loadable_yaml_report() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("times.csv", "seen_at\n14:30:15\n09:05:00\n");
    let report_path = workspace.path().join("times.yml");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-o",
            report_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let report = ProbeReport::load(&report_path).expect("load report");
    assert_eq!(report.rows, 2);
    assert_eq!(report.columns.len(), 1);
    assert_eq!(report.columns[0].name.as_deref(), Some("seen_at"));
    assert_eq!(report.columns[0].pattern.as_deref(), Some("%H:%M:%S"));
}

#[test]
fn probe_resolves_ambiguous_dates_from_later_evidence() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("dates.csv", "when\n03-04-05\n03-25-05\n");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("%m-%d-%y"));
}

#[test]
fn probe_fails_loudly_when_a_format_never_resolves() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("dates.csv", "when\n03-04-05\n04-05-06\n");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("no parse format could be inferred"));
}

#[test]
fn probe_fails_loudly_on_type_contradictions() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("mixed.csv", "amount\n12\nhello\n");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("does not parse as integer"))
        .stderr(contains("hello"));
}

#[test]
fn probe_handles_headerless_and_limited_input() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("plain.csv", "1,alpha\n2,beta\nnot-a-number,gamma\n");
    let report_path = workspace.path().join("plain.yml");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-o",
            report_path.to_str().unwrap(),
            "--no-headers",
            "--limit",
            "2",
        ])
        .assert()
        .success()
        .stdout(contains("(column 1)"));

    let report = ProbeReport::load(&report_path).expect("load report");
    assert_eq!(report.rows, 2);
    assert_eq!(report.columns[0].name, None);
}

#[test]
fn probe_treats_custom_sentinels_as_absent() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("gaps.csv", "n\nN/A\nNone\n17\n");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "--absent",
            "n/a",
        ])
        .assert()
        .success()
        .stdout(contains("integer"));
}

#[test]
fn probe_on_empty_file_reports_no_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("empty.csv", "");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("No columns inferred"));
}

#[test]
fn probe_reads_tab_delimited_input_by_extension() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("plain.tsv", "a\tb\n1\tx\n");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("integer"))
        .stdout(contains("string"));
}

#[test]
fn probe_rejects_sheet_for_delimited_text() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("plain.csv", "a\n1\n");

    Command::cargo_bin("tabular-probe")
        .expect("binary exists")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "--sheet",
            "Sheet1",
        ])
        .assert()
        .failure()
        .stderr(contains("--sheet"));
}
