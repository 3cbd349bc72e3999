//! Balance command - how much of a month a tenant has covered, or their whole account

use crate::cmd::{format_amount, read_snapshot};
use clap::Args;
use rentledger::core::{
    find_active_obligation, monthly_balance, tenant_account, Anomaly, BillingPeriod,
    MonthlyBalance, ObligationLookup, TenantAccount,
};
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct BalanceCommand {
    /// JSON snapshot of ledger records ("-" for stdin)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Extra payments from a CSV file
    #[arg(short, long)]
    payments: Option<PathBuf>,

    /// Tenant to reconcile
    #[arg(short, long)]
    tenant: String,

    /// Billing month (1-12)
    #[arg(short, long)]
    month: u32,

    /// Billing year
    #[arg(short, long)]
    year: i32,

    /// Show every month from the contract start through the given month
    #[arg(long)]
    account: bool,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Tabled)]
struct BalanceRow {
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Rent")]
    rent: String,
    #[tabled(rename = "Paid")]
    paid: String,
    #[tabled(rename = "Pending")]
    pending: String,
    #[tabled(rename = "Covered")]
    covered: String,
    #[tabled(rename = "Debt")]
    debt: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

impl From<&MonthlyBalance> for BalanceRow {
    fn from(balance: &MonthlyBalance) -> Self {
        BalanceRow {
            month: balance.period.to_string(),
            rent: format_amount(balance.rent_amount),
            paid: format_amount(balance.paid_amount),
            pending: format_amount(balance.pending_amount),
            covered: format_amount(balance.total_covered),
            debt: format_amount(balance.remaining_debt),
            status: status(balance),
        }
    }
}

/// JSON output: the balance or account plus anything wrong with the tenant's contracts
#[derive(Debug, Serialize)]
struct BalanceOutput<'a, T: Serialize> {
    #[serde(flatten)]
    result: &'a T,
    anomalies: &'a [Anomaly],
}

fn status(balance: &MonthlyBalance) -> &'static str {
    if balance.is_complete {
        "Paid"
    } else if balance.is_partial {
        "Partial"
    } else {
        "Unpaid"
    }
}

impl BalanceCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let period = BillingPeriod::new(self.year, self.month)?;
        let snapshot = read_snapshot(&self.snapshot, self.payments.as_deref())?;

        let mut anomalies = Vec::new();
        let obligation = match find_active_obligation(&snapshot.obligations, &self.tenant) {
            ObligationLookup::None => {
                println!("No active contract for tenant {}, nothing to reconcile", self.tenant);
                return Ok(());
            }
            ObligationLookup::Single(obligation) => obligation,
            ObligationLookup::Ambiguous {
                authoritative,
                count,
            } => {
                let anomaly = Anomaly::AmbiguousObligation {
                    tenant_id: self.tenant.clone(),
                    count,
                    authoritative_contract: authoritative.contract_id.clone(),
                };
                log::warn!("{}", anomaly);
                anomalies.push(anomaly);
                authoritative
            }
        };

        if self.account {
            let account = tenant_account(obligation, &snapshot.payments, period)?;
            if self.json {
                print_json(&account, &anomalies)?;
            } else {
                self.print_account(&account);
                print_anomalies(&anomalies);
            }
        } else {
            let balance = monthly_balance(obligation, &snapshot.payments, period)?;
            if self.json {
                print_json(&balance, &anomalies)?;
            } else {
                println!();
                println!(
                    "BALANCE {} - tenant {} (contract {})",
                    period, obligation.tenant_id, obligation.contract_id
                );
                print_table(&[BalanceRow::from(&balance)]);
                print_anomalies(&anomalies);
            }
        }
        Ok(())
    }

    fn print_account(&self, account: &TenantAccount) {
        println!();
        println!(
            "ACCOUNT through {} - tenant {} (contract {})",
            account.as_of, account.tenant_id, account.contract_id
        );
        let rows: Vec<BalanceRow> = account.months.iter().map(BalanceRow::from).collect();
        if rows.is_empty() {
            println!("  Contract starts after {}", account.as_of);
        } else {
            print_table(&rows);
        }
        println!(
            "  Months due: {} | Due: {} | Paid: {} | Pending: {}",
            account.months_due,
            format_amount(account.total_due),
            format_amount(account.total_paid),
            format_amount(account.total_pending)
        );
        println!(
            "  Outstanding: {} | Credit: {} | Fully paid months: {}",
            format_amount(account.outstanding),
            format_amount(account.credit),
            account.paid_months
        );
        println!();
    }
}

fn print_json<T: Serialize>(result: &T, anomalies: &[Anomaly]) -> anyhow::Result<()> {
    let output = BalanceOutput { result, anomalies };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_anomalies(anomalies: &[Anomaly]) {
    if anomalies.is_empty() {
        return;
    }
    println!();
    println!("\u{26A0} {} anomaly(ies):", anomalies.len());
    for anomaly in anomalies {
        println!("  [{}] {}", anomaly.kind(), anomaly);
    }
}

fn print_table(rows: &[BalanceRow]) {
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
