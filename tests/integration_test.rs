//! Integration tests for the carbon ledger CLI.
//!
//! These tests run the actual binary and verify output against expected CSV files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Run the binary with the given arguments and return stdout
fn run_ledger(args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("carbon-ledger").unwrap();
    let assert = cmd
        .env_remove("CARBON_LEDGER_OWNER")
        .env_remove("CARBON_LEDGER_OFFSET_RATE")
        .args(args)
        .assert()
        .success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

/// Normalize CSV for comparison (sort lines, trim whitespace)
fn normalize_csv(csv: &str) -> Vec<String> {
    let mut lines: Vec<String> = csv
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    // Keep header first, sort the rest
    if lines.len() > 1 {
        let header = lines.remove(0);
        lines.sort();
        lines.insert(0, header);
    }

    lines
}

fn assert_matches_expected(output: &str, expected_file: &str) {
    let expected = fs::read_to_string(test_data_path(expected_file)).unwrap();
    assert_eq!(normalize_csv(output), normalize_csv(&expected));
}

fn write_calls(csv: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(csv.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_product_lifecycle_report() {
    let output = run_ledger(&[&test_data_path("sample_lifecycle.csv")]);
    assert_matches_expected(&output, "expected_lifecycle.csv");
}

#[test]
fn test_explicit_products_report_matches_default() {
    let default = run_ledger(&[&test_data_path("sample_lifecycle.csv")]);
    let explicit = run_ledger(&[&test_data_path("sample_lifecycle.csv"), "products"]);
    assert_eq!(default, explicit);
}

#[test]
fn test_consumer_offsets_and_budgets_report() {
    let output = run_ledger(&[&test_data_path("sample_offsets.csv"), "consumers"]);
    assert_matches_expected(&output, "expected_offsets.csv");
}

#[test]
fn test_rejected_calls_are_skipped() {
    let output = run_ledger(&[&test_data_path("sample_edge_cases.csv")]);
    assert_matches_expected(&output, "expected_edge_cases.csv");
}

#[test]
fn test_owner_and_rate_from_environment() {
    let calls = write_calls(
        "op,caller,time,arg1\n\
         fund,carol,1,500\n\
         purchase_offset,carol,2,4\n\
         set_offset_rate,owner,3,1\n",
    );

    let mut cmd = Command::cargo_bin("carbon-ledger").unwrap();
    let assert = cmd
        .env("CARBON_LEDGER_OWNER", "admin")
        .env("CARBON_LEDGER_OFFSET_RATE", "100")
        .arg(calls.path())
        .arg("consumers")
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(output.contains("carol,4,400,,,"));
}

#[test]
fn test_invalid_rate_configuration_fails() {
    let calls = write_calls("op,caller,time,arg1\n");

    let mut cmd = Command::cargo_bin("carbon-ledger").unwrap();
    cmd.env("CARBON_LEDGER_OFFSET_RATE", "0")
        .arg(calls.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_unknown_report_fails() {
    let mut cmd = Command::cargo_bin("carbon-ledger").unwrap();
    cmd.arg(test_data_path("sample_lifecycle.csv"))
        .arg("listings")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown report"));
}

#[test]
fn test_missing_file_error() {
    let mut cmd = Command::cargo_bin("carbon-ledger").unwrap();
    cmd.arg("nonexistent.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error").or(predicate::str::contains("Error")));
}

#[test]
fn test_missing_argument_error() {
    let mut cmd = Command::cargo_bin("carbon-ledger").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Missing input file"));
}

#[test]
fn test_empty_input_still_prints_header() {
    let calls = write_calls("op,caller,time,arg1,arg2,arg3,arg4\n");
    let output = run_ledger(&[calls.path().to_str().unwrap()]);
    assert_eq!(
        output.trim(),
        "product,name,manufacturer,owner,production_g,total_g,total_kg,finalized,logistics_entries"
    );
}

#[test]
fn test_kilograms_have_three_decimal_places() {
    let output = run_ledger(&[&test_data_path("sample_lifecycle.csv")]);

    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split(',').collect();
        let kg = parts[6];
        let dot_pos = kg.find('.').expect("kilograms carry a decimal point");
        assert_eq!(kg.len() - dot_pos - 1, 3, "Expected 3 decimal places in: {}", kg);
    }
}
