//! Snapshot boundary: records already fetched from the property database, as JSON or CSV

use crate::core::{
    BillingPeriod, Contract, Currency, ExpenseRecord, LedgerInput, MonetaryRecord, OwnershipMap,
    OwnershipShare, PaymentRecord, PaymentStatus, RentObligation, Unit,
};
use chrono::NaiveDate;
use rentledger_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid date '{value}' on payment {id}")]
    InvalidDate { id: String, value: String },
    #[error("unknown payment status '{value}' on payment {id}")]
    InvalidStatus { id: String, value: String },
    #[error("unknown currency '{value}' on payment {id}")]
    InvalidCurrency { id: String, value: String },
    #[error("{reason} on payment {id}")]
    InvalidBillingPeriod { id: String, reason: String },
}

/// Input root for snapshot JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub obligations: Vec<RentObligation>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
}

/// A property together with its ownership table
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owners: Vec<OwnershipShare>,
}

impl LedgerSnapshot {
    /// Property id -> ownership shares. A property listed twice keeps its last table,
    /// see [`LedgerSnapshot::duplicate_property_ids`].
    pub fn ownership(&self) -> OwnershipMap {
        for id in self.duplicate_property_ids() {
            log::warn!("Property {} is listed more than once, using its last ownership table", id);
        }
        self.properties
            .iter()
            .map(|p| (p.id.clone(), p.owners.clone()))
            .collect()
    }

    /// Property ids that appear more than once, each reported once in first-seen order
    pub fn duplicate_property_ids(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for property in &self.properties {
            let id = property.id.as_str();
            if !seen.insert(id) && !duplicates.contains(&id) {
                duplicates.push(id);
            }
        }
        duplicates
    }

    pub fn ledger_input<'a>(&'a self, ownership: &'a OwnershipMap) -> LedgerInput<'a> {
        LedgerInput {
            ownership,
            contracts: &self.contracts,
            units: &self.units,
            payments: &self.payments,
            expenses: &self.expenses,
        }
    }

    /// Add extra payments (e.g. from CSV), keeping payments in date order
    pub fn extend_payments(&mut self, payments: Vec<PaymentRecord>) {
        self.payments.extend(payments);
        self.payments.sort_by_key(|p| p.date());
    }
}

/// Read a snapshot from JSON
pub fn read_snapshot_json<R: Read>(reader: R) -> anyhow::Result<LedgerSnapshot> {
    let mut snapshot: LedgerSnapshot = serde_json::from_reader(reader)?;
    snapshot.payments.sort_by_key(|p| p.date());
    snapshot.expenses.sort_by_key(|e| e.money.date);
    log::info!(
        "Read snapshot: {} properties, {} obligations, {} payments, {} expenses",
        snapshot.properties.len(),
        snapshot.obligations.len(),
        snapshot.payments.len(),
        snapshot.expenses.len()
    );
    Ok(snapshot)
}

/// Description of one CSV column, generated by `#[derive(CsvSchema)]`
#[derive(Debug, Clone, Copy)]
pub struct CsvColumn {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// CSV row format for tenant payments
#[derive(Debug, Clone, Deserialize, CsvSchema)]
pub struct PaymentCsvRow {
    /// Payment identifier
    pub id: String,
    /// Contract the payment is made against
    pub contract_id: String,
    /// Tenant who made the payment
    pub tenant_id: String,
    /// Date the payment was made (YYYY-MM-DD)
    pub date: String,
    /// Amount in the currency paid
    pub amount: Decimal,
    /// PRIMARY or SECONDARY (default PRIMARY)
    pub currency: Option<String>,
    /// Secondary units per primary unit (required for SECONDARY)
    pub exchange_rate: Option<Decimal>,
    /// pending, approved or rejected
    pub status: String,
    /// Month the payment is for (YYYY-MM-01); falls back to the payment date
    pub billing_period: Option<String>,
}

impl TryFrom<PaymentCsvRow> for PaymentRecord {
    type Error = InputError;

    fn try_from(row: PaymentCsvRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").map_err(|_| {
            InputError::InvalidDate {
                id: row.id.clone(),
                value: row.date.clone(),
            }
        })?;

        let status = PaymentStatus::from_str(&row.status).ok_or_else(|| InputError::InvalidStatus {
            id: row.id.clone(),
            value: row.status.clone(),
        })?;

        let currency = match row.currency.as_deref().map(str::trim) {
            None | Some("") => Currency::Primary,
            Some(value) => Currency::from_str(value).ok_or_else(|| InputError::InvalidCurrency {
                id: row.id.clone(),
                value: value.to_string(),
            })?,
        };

        let billing_period = match row.billing_period.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<BillingPeriod>().map_err(|reason| {
                InputError::InvalidBillingPeriod {
                    id: row.id.clone(),
                    reason,
                }
            })?),
        };

        Ok(PaymentRecord {
            id: row.id,
            contract_id: row.contract_id,
            tenant_id: row.tenant_id,
            money: MonetaryRecord::new(row.amount, currency, row.exchange_rate, date),
            status,
            billing_period,
        })
    }
}

/// Read tenant payments from CSV
pub fn read_payments_csv<R: Read>(reader: R) -> anyhow::Result<Vec<PaymentRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut payments = Vec::new();
    for row in rdr.deserialize::<PaymentCsvRow>() {
        payments.push(PaymentRecord::try_from(row?)?);
    }
    payments.sort_by_key(|p| p.date());
    log::info!("Read {} csv records", payments.len());
    Ok(payments)
}
