pub mod balance;
pub mod owners;
pub mod schema;
pub mod spread;
pub mod validate;

use anyhow::Context;
use rentledger::input::{self, LedgerSnapshot};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read a ledger snapshot (JSON, or stdin with "-") plus optional extra payments from CSV
pub fn read_snapshot(path: &Path, payments_csv: Option<&Path>) -> anyhow::Result<LedgerSnapshot> {
    let mut snapshot = if path.as_os_str() == "-" {
        read_from_stdin()?
    } else {
        let file = File::open(path)
            .with_context(|| format!("cannot open snapshot {}", path.display()))?;
        input::read_snapshot_json(BufReader::new(file))?
    };

    if let Some(csv_path) = payments_csv {
        let file = File::open(csv_path)
            .with_context(|| format!("cannot open payments {}", csv_path.display()))?;
        let payments = input::read_payments_csv(BufReader::new(file))?;
        snapshot.extend_payments(payments);
    }
    Ok(snapshot)
}

fn read_from_stdin() -> anyhow::Result<LedgerSnapshot> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a snapshot file or pipe JSON to stdin.");
    }

    input::read_snapshot_json(io::Cursor::new(buffer))
}

/// Two decimal places, for display only
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

pub fn format_percentage(pct: Decimal) -> String {
    format!("{}%", pct.normalize())
}
