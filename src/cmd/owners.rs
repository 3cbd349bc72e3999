//! Owners command - per-owner statement of distributed income, expenses and net balance

use crate::cmd::{format_amount, format_percentage, read_snapshot};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rentledger::core::{
    build_report, BillingPeriod, Currency, FailurePolicy, OwnerReport, OwnerReportItem,
    ReportPeriod, ReportRequest,
};
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct OwnersCommand {
    /// JSON snapshot of ledger records ("-" for stdin)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Extra payments from a CSV file
    #[arg(short, long)]
    payments: Option<PathBuf>,

    /// First day of the statement (YYYY-MM-DD)
    #[arg(long, requires = "to", conflicts_with = "month")]
    from: Option<NaiveDate>,

    /// Last day of the statement (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Whole calendar month (YYYY-MM) instead of --from/--to
    #[arg(short, long)]
    month: Option<BillingPeriod>,

    /// Only show these owners (repeatable)
    #[arg(short, long = "owner")]
    owners: Vec<String>,

    /// Currency the statement is expressed in
    #[arg(short, long, value_enum, default_value_t = CurrencyArg::Primary)]
    currency: CurrencyArg,

    /// Leave out records that cannot be converted instead of failing
    #[arg(long)]
    skip_invalid: bool,

    /// Also list the payments and expenses behind each owner's totals
    #[arg(short, long)]
    detail: bool,

    /// Print the statement digest (SHA-256) after the output
    #[arg(long)]
    digest: bool,

    /// Output as JSON instead of a table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output as CSV instead of a table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CurrencyArg {
    #[default]
    Primary,
    Secondary,
}

impl From<CurrencyArg> for Currency {
    fn from(arg: CurrencyArg) -> Self {
        match arg {
            CurrencyArg::Primary => Currency::Primary,
            CurrencyArg::Secondary => Currency::Secondary,
        }
    }
}

/// Row for the owner totals table
#[derive(Debug, Clone, Tabled, serde::Serialize)]
struct OwnerRow {
    #[tabled(rename = "Owner")]
    owner_id: String,
    #[tabled(rename = "Properties")]
    property_count: usize,
    #[tabled(rename = "Income")]
    total_income: String,
    #[tabled(rename = "Expenses")]
    total_expenses: String,
    #[tabled(rename = "Net")]
    net_balance: String,
}

impl From<&OwnerReportItem> for OwnerRow {
    fn from(item: &OwnerReportItem) -> Self {
        OwnerRow {
            owner_id: item.owner_id.clone(),
            property_count: item.property_count,
            total_income: format_amount(item.total_income),
            total_expenses: format_amount(item.total_expenses),
            net_balance: format_amount(item.net_balance),
        }
    }
}

/// Row for the per-owner transaction detail table
#[derive(Debug, Clone, Tabled)]
struct DetailRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Original")]
    original: String,
    #[tabled(rename = "Rate")]
    rate: String,
    #[tabled(rename = "Converted")]
    converted: String,
    #[tabled(rename = "Share")]
    percentage: String,
    #[tabled(rename = "Amount")]
    share_amount: String,
}

fn detail_rows(item: &OwnerReportItem) -> Vec<DetailRow> {
    let rate = |r: Option<rust_decimal::Decimal>| r.map(|r| r.normalize().to_string()).unwrap_or_default();

    let income = item.payments.iter().map(|p| DetailRow {
        date: p.date.to_string(),
        kind: "Income",
        reference: format!("{} ({})", p.payment_id, p.property_id),
        original: format!("{} {}", format_amount(p.amount.original_amount), p.amount.currency),
        rate: rate(p.amount.exchange_rate),
        converted: format_amount(p.amount.normalized),
        percentage: format_percentage(p.percentage),
        share_amount: format_amount(p.share_amount),
    });

    let expenses = item.expenses.iter().map(|e| DetailRow {
        date: e.date.to_string(),
        kind: "Expense",
        reference: match &e.property_id {
            Some(property_id) => format!("{} {} ({})", e.expense_id, e.category, property_id),
            None => format!("{} {}", e.expense_id, e.category),
        },
        original: format!("{} {}", format_amount(e.amount.original_amount), e.amount.currency),
        rate: rate(e.amount.exchange_rate),
        converted: format_amount(e.amount.normalized),
        percentage: format_percentage(e.percentage),
        share_amount: format!("-{}", format_amount(e.share_amount)),
    });

    let mut rows: Vec<DetailRow> = income.chain(expenses).collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date));
    rows
}

impl OwnersCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let period = self.period()?;
        let snapshot = read_snapshot(&self.snapshot, self.payments.as_deref())?;
        let ownership = snapshot.ownership();

        let request = ReportRequest {
            period,
            owners_filter: self.owners.clone(),
            currency: self.currency.into(),
            policy: if self.skip_invalid {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
        };
        let report = build_report(&request, snapshot.ledger_input(&ownership))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if self.csv {
            self.write_csv(&report)?;
        } else {
            self.print_report(&report)?;
        }

        if self.digest {
            println!("digest: {}", report.digest()?);
        }
        Ok(())
    }

    fn period(&self) -> anyhow::Result<ReportPeriod> {
        match (self.month, self.from, self.to) {
            (Some(month), _, _) => Ok(ReportPeriod::month(month)),
            (None, Some(from), Some(to)) if from <= to => Ok(ReportPeriod::new(from, to)),
            (None, Some(from), Some(to)) => {
                anyhow::bail!("--from {} is after --to {}", from, to)
            }
            _ => anyhow::bail!("Provide --month, or both --from and --to"),
        }
    }

    fn print_report(&self, report: &OwnerReport) -> anyhow::Result<()> {
        println!();
        println!("OWNER STATEMENT ({}) - {}", report.period, report.currency);
        println!();

        if report.items.is_empty() {
            println!("No owners found matching filters");
        } else {
            let rows: Vec<OwnerRow> = report.items.iter().map(OwnerRow::from).collect();
            print_table(Table::new(&rows));
            println!(
                "  Total income: {} | Total expenses: {} | Net: {}",
                format_amount(report.total_income()?),
                format_amount(report.total_expenses()?),
                format_amount(report.net_balance()?)
            );
        }

        if self.detail {
            for item in &report.items {
                let rows = detail_rows(item);
                println!();
                println!("{} ({} transactions)", item.owner_id, rows.len());
                if !rows.is_empty() {
                    print_table(Table::new(&rows));
                }
            }
        }

        if !report.anomalies.is_empty() {
            println!();
            println!("\u{26A0} {} anomaly(ies):", report.anomalies.len());
            for anomaly in &report.anomalies {
                println!("  [{}] {}", anomaly.kind(), anomaly);
            }
        }
        println!();
        Ok(())
    }

    fn write_csv(&self, report: &OwnerReport) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for item in &report.items {
            wtr.serialize(OwnerRow::from(item))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn print_table(mut table: Table) {
    let table = table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
