//! Validate command - surface data quality issues without generating full reports

use crate::cmd::{format_percentage, read_snapshot};
use clap::Args;
use rentledger::core::ledger::PropertyResolver;
use rentledger::core::{
    obligation_anomalies, ownership_anomalies, require_active_obligation, Anomaly, Currency,
    EngineError,
};
use rentledger::input::LedgerSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// JSON snapshot of ledger records ("-" for stdin)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Extra payments from a CSV file
    #[arg(short, long)]
    payments: Option<PathBuf>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    subject: String,
    message: String,
}

impl ValidationIssue {
    fn new(issue_type: &str, subject: &str, message: String) -> Self {
        ValidationIssue {
            issue_type: issue_type.to_string(),
            subject: subject.to_string(),
            message,
        }
    }

    fn from_error(subject: &str, err: &EngineError) -> Self {
        ValidationIssue::new(err.kind(), subject, err.to_string())
    }
}

impl From<Anomaly> for ValidationIssue {
    fn from(anomaly: Anomaly) -> Self {
        let subject = match &anomaly {
            Anomaly::OwnershipSum { property_id, .. } => property_id.clone(),
            Anomaly::AmbiguousObligation { tenant_id, .. } => tenant_id.clone(),
            Anomaly::OrphanedIncome { payment_id, .. } => payment_id.clone(),
            Anomaly::UnattributedExpense { expense_id, .. } => expense_id.clone(),
            Anomaly::SkippedRecord { record_id, .. } => record_id.clone(),
        };
        ValidationIssue {
            issue_type: anomaly.kind().to_string(),
            subject,
            message: anomaly.message(),
        }
    }
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let snapshot = read_snapshot(&self.snapshot, self.payments.as_deref())?;
        let issues = collect_issues(&snapshot);

        if self.json {
            self.print_json(&issues)?;
        } else {
            self.print_text(&issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS");
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();

            for (i, issue) in issues.iter().enumerate() {
                println!("  {}. [{}] {}", i + 1, issue.issue_type, issue.subject);
                println!("     {}", issue.message);
                println!();
            }
        }
    }

    fn print_json(&self, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn collect_issues(snapshot: &LedgerSnapshot) -> Vec<ValidationIssue> {
    let ownership = snapshot.ownership();
    let mut issues: Vec<ValidationIssue> = ownership_anomalies(&ownership)
        .into_iter()
        .map(ValidationIssue::from)
        .collect();

    for id in snapshot.duplicate_property_ids() {
        issues.push(ValidationIssue::new(
            "DuplicateProperty",
            id,
            format!(
                "Property {} is listed more than once, only its last ownership table is used",
                id
            ),
        ));
    }

    for property in &snapshot.properties {
        for share in &property.owners {
            if share.percentage < Decimal::ZERO || share.percentage > dec!(100) {
                issues.push(ValidationIssue::new(
                    "InvalidPercentage",
                    &property.id,
                    format!(
                        "Owner {} holds {}, shares must be between 0% and 100%",
                        share.owner_id,
                        format_percentage(share.percentage)
                    ),
                ));
            }
        }
    }

    issues.extend(
        obligation_anomalies(&snapshot.obligations)
            .into_iter()
            .map(ValidationIssue::from),
    );

    for obligation in snapshot.obligations.iter().filter(|o| o.monthly_rent <= Decimal::ZERO) {
        let err = EngineError::InvalidRent {
            contract_id: obligation.contract_id.clone(),
            rent: obligation.monthly_rent,
        };
        issues.push(ValidationIssue::from_error(&obligation.contract_id, &err));
    }

    let resolver = PropertyResolver::new(&snapshot.contracts, &snapshot.units);
    let mut tenants_without_obligation = BTreeSet::new();
    for payment in &snapshot.payments {
        if let Err(err) = payment.money.normalize(Currency::Primary) {
            issues.push(ValidationIssue::from_error(&payment.id, &err));
        }
        if resolver.property_of(&payment.contract_id).is_none() {
            issues.push(ValidationIssue::new(
                "UnresolvedContract",
                &payment.id,
                format!(
                    "Contract {} does not lead to a property, income cannot be attributed",
                    payment.contract_id
                ),
            ));
        }
        if let Err(err) = require_active_obligation(&snapshot.obligations, &payment.tenant_id) {
            if tenants_without_obligation.insert(payment.tenant_id.as_str()) {
                issues.push(ValidationIssue::from_error(&payment.tenant_id, &err));
            }
        }
    }

    for expense in &snapshot.expenses {
        if let Err(err) = expense.money.normalize(Currency::Primary) {
            issues.push(ValidationIssue::from_error(&expense.id, &err));
        }
    }

    log::info!("Validation found {} issue(s)", issues.len());
    issues
}
