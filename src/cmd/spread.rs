//! Spread command - split one lump-sum payment over consecutive months of rent

use crate::cmd::format_amount;
use clap::Args;
use rentledger::core::{distribute_lump_sum, AllocationPlan, BillingPeriod, EngineError};
use rust_decimal::Decimal;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SpreadCommand {
    /// Total amount received
    #[arg(short, long)]
    amount: Decimal,

    /// Monthly rent to fill each month up to
    #[arg(short, long)]
    rent: Decimal,

    /// First month to fill (1-12)
    #[arg(short, long)]
    month: u32,

    /// Year of the first month
    #[arg(short, long)]
    year: i32,

    /// Output as JSON instead of a table
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output as CSV instead of a table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Clone, Tabled, serde::Serialize)]
struct PlanRow {
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Full Month")]
    full_month: String,
}

impl TryFrom<&AllocationPlan> for PlanRow {
    type Error = EngineError;

    fn try_from(plan: &AllocationPlan) -> Result<Self, Self::Error> {
        Ok(PlanRow {
            month: plan.period()?.to_string(),
            amount: format_amount(plan.amount),
            full_month: if plan.is_full_month { "yes" } else { "no" }.to_string(),
        })
    }
}

impl SpreadCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let start = BillingPeriod::new(self.year, self.month)?;
        let plan = distribute_lump_sum(self.amount, start, self.rent)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }

        let rows = plan
            .iter()
            .map(PlanRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if self.csv {
            let mut wtr = csv::Writer::from_writer(io::stdout());
            for row in &rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
            return Ok(());
        }

        if rows.is_empty() {
            println!("Nothing to spread: amount and rent must both be positive");
            return Ok(());
        }

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!(
            "Note: months already paid are not taken into account; check existing balances first."
        );
        Ok(())
    }
}
