//! E2E tests for the rentledger commands

use std::process::{Command, Output};

const SNAPSHOT: &str = "tests/data/snapshot.json";

fn rentledger(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rentledger"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Owner statement for a month splits income by share and charges expenses
#[test]
fn owners_month_statement() {
    let output = rentledger(&["owners", "-s", SNAPSHOT, "--month", "2024-03"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("OWNER STATEMENT (2024-03-01 to 2024-03-31)"));

    let alice = stdout.lines().find(|l| l.contains("alice")).unwrap();
    assert!(alice.contains("490.00"));
    assert!(alice.contains("120.00"));
    assert!(alice.contains("370.00"));

    let bob = stdout.lines().find(|l| l.contains("bob")).unwrap();
    assert!(bob.contains("160.00"));
    assert!(bob.contains("130.00"));
    assert!(bob.contains("30.00"));

    assert!(stdout.contains("Total income: 650.00 | Total expenses: 250.00 | Net: 400.00"));
    // pending expense e3 is not charged
    assert!(!stdout.contains("999"));
}

/// Owner filter keeps other owners out of the output
#[test]
fn owners_filter_and_detail() {
    let output = rentledger(&[
        "owners", "-s", SNAPSHOT, "--from", "2024-03-01", "--to", "2024-03-31", "--owner", "bob",
        "--detail",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(!stdout.contains("alice"));
    assert!(stdout.contains("bob (3 transactions)"));
    assert!(stdout.contains("pay1 (p1)"));
    assert!(stdout.contains("e2 plumbing (p1)"));
    assert!(stdout.contains("-80.00"));
}

/// Extra payments from CSV join the snapshot, including secondary currency ones
#[test]
fn owners_with_csv_payments() {
    let output = rentledger(&[
        "owners", "-s", SNAPSHOT, "-p", "tests/data/payments.csv", "--month", "2024-04", "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = report["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["owner_id"], "alice");
    assert_eq!(items[0]["payments"].as_array().unwrap().len(), 2);
    assert_eq!(items[1]["owner_id"], "bob");
    assert_eq!(items[1]["payments"].as_array().unwrap().len(), 1);
    assert!(report["anomalies"].as_array().unwrap().is_empty());
}

/// Converting without a rate aborts, unless invalid records are skipped
#[test]
fn owners_missing_rate_abort_or_skip() {
    let output = rentledger(&["owners", "-s", SNAPSHOT, "--month", "2024-03", "-c", "secondary"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exchange rate required"));

    let output = rentledger(&[
        "owners", "-s", SNAPSHOT, "--month", "2024-03", "-c", "secondary", "--skip-invalid",
    ]);
    let stdout = stdout(&output);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("SkippedRecord"));
}

/// Same input, same digest
#[test]
fn owners_digest_is_stable() {
    let args = ["owners", "-s", SNAPSHOT, "--month", "2024-03", "--csv", "--digest"];
    let first = stdout(&rentledger(&args));
    let second = stdout(&rentledger(&args));

    assert!(first.starts_with("owner_id,property_count,total_income,total_expenses,net_balance"));
    let digest = first.lines().find(|l| l.starts_with("digest: ")).unwrap();
    assert_eq!(digest.len(), "digest: ".len() + 64);
    assert_eq!(first, second);
}

/// Balance counts approved and pending payments, including converted ones
#[test]
fn balance_partial_month() {
    let output = rentledger(&["balance", "-s", SNAPSHOT, "-t", "t2", "-m", "3", "-y", "2024"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("tenant t2 (contract c2)"));
    let row = stdout.lines().find(|l| l.contains("Partial")).unwrap();
    assert!(row.contains("500.00"));
    assert!(row.contains("250.00"));
    assert!(row.contains("100.00"));
    assert!(row.contains("350.00"));
    assert!(row.contains("150.00"));
}

#[test]
fn balance_account_json() {
    let output = rentledger(&[
        "balance", "-s", SNAPSHOT, "-t", "t2", "-m", "3", "-y", "2024", "--account", "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let account: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(account["contract_id"], "c2");
    assert_eq!(account["months_due"], 2);
    assert_eq!(account["paid_months"], 0);
    assert!(account["anomalies"].as_array().unwrap().is_empty());
    let months = account["months"].as_array().unwrap();
    assert_eq!(months.len(), 2);
    // rejected payment does not count
    assert_eq!(months[0]["is_complete"], false);
    assert_eq!(months[0]["is_partial"], false);
    assert_eq!(months[1]["is_partial"], true);
}

/// A tenant on two active contracts is reported, not just resolved to the latest one
#[test]
fn balance_surfaces_ambiguous_obligation() {
    let snapshot = "tests/data/ambiguous_snapshot.json";
    let output = rentledger(&["balance", "-s", snapshot, "-t", "t1", "-m", "3", "-y", "2024"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("tenant t1 (contract c2)"));
    assert!(stdout.contains("[AmbiguousObligation] Tenant t1 has 2 active contracts, latest is c2"));

    let output = rentledger(&[
        "balance", "-s", snapshot, "-t", "t1", "-m", "3", "-y", "2024", "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let balance: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(balance["rent_amount"], "900");
    assert_eq!(balance["is_complete"], true);
    let anomalies = balance["anomalies"].as_array().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0]["type"], "AmbiguousObligation");
    assert_eq!(anomalies[0]["count"], 2);
    assert_eq!(anomalies[0]["authoritative_contract"], "c2");
}

#[test]
fn balance_unknown_tenant_is_noop() {
    let output = rentledger(&["balance", "-s", SNAPSHOT, "-t", "nobody", "-m", "3", "-y", "2024"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("No active contract for tenant nobody"));
}

/// A plan needing more months than the cap is refused instead of built
#[test]
fn spread_refuses_endless_plan() {
    let output = rentledger(&["spread", "-a", "1000000", "-r", "0.01", "-m", "1", "-y", "2024"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("needs more than 1200 months"));
}

/// Lump sum fills whole months first and rolls into the next year
#[test]
fn spread_lump_sum() {
    let output = rentledger(&[
        "spread", "-a", "1000", "-r", "400", "-m", "11", "-y", "2024", "--csv",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "month,amount,full_month",
            "2024-11,400.00,yes",
            "2024-12,400.00,yes",
            "2025-01,200.00,no",
        ]
    );
}

#[test]
fn validate_clean_snapshot() {
    let output = rentledger(&["validate", "-s", SNAPSHOT]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("No issues found"));
}

#[test]
fn validate_reports_issues_and_fails() {
    let output = rentledger(&["validate", "-s", "tests/data/invalid_snapshot.json", "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["issue_count"], 2);
    let types: Vec<&str> = result["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["OwnershipSum", "MissingExchangeRate"]);
}

#[test]
fn schema_csv_header() {
    let output = rentledger(&["schema", "csv-header"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_eq!(
        stdout(&output).trim(),
        "id,contract_id,tenant_id,date,amount,currency,exchange_rate,status,billing_period"
    );
}

#[test]
fn schema_json_lists_snapshot_sections() {
    let output = rentledger(&["schema"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = stdout(&output);
    assert!(stdout.contains("\"obligations\""));
    assert!(stdout.contains("\"payments\""));
}
