//! Owner statements: distributed rent income and owner expenses per owner for a period

use super::anomaly::Anomaly;
use super::error::EngineError;
use super::money::{checked_total, Converted, Currency, MonetaryRecord};
use super::ownership::{check_shares, distribute, property_counts, OwnershipCheck, OwnershipMap};
use super::period::ReportPeriod;
use super::rent::{PaymentRecord, PaymentStatus};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pending,
    Paid,
    Cancelled,
}

/// Who carries an expense: one owner directly, or every owner of a property by share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseAttribution {
    Owner(String),
    Property(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseRecord {
    pub id: String,
    #[serde(flatten)]
    pub money: MonetaryRecord,
    pub attribution: ExpenseAttribution,
    #[serde(default)]
    pub category: String,
    pub status: ExpenseStatus,
    #[serde(default)]
    pub description: Option<String>,
}

/// Rental contract linking a tenant to a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Contract {
    pub id: String,
    pub unit_id: String,
    pub tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Unit {
    pub id: String,
    pub property_id: String,
}

/// Follows contract -> unit -> property
#[derive(Debug, Default)]
pub struct PropertyResolver<'a> {
    contract_units: HashMap<&'a str, &'a str>,
    unit_properties: HashMap<&'a str, &'a str>,
}

impl<'a> PropertyResolver<'a> {
    pub fn new(contracts: &'a [Contract], units: &'a [Unit]) -> Self {
        PropertyResolver {
            contract_units: contracts
                .iter()
                .map(|c| (c.id.as_str(), c.unit_id.as_str()))
                .collect(),
            unit_properties: units
                .iter()
                .map(|u| (u.id.as_str(), u.property_id.as_str()))
                .collect(),
        }
    }

    pub fn property_of(&self, contract_id: &str) -> Option<&'a str> {
        let unit = self.contract_units.get(contract_id)?;
        self.unit_properties.get(unit).copied()
    }
}

/// What to do with a record that cannot be calculated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole report on the first bad record
    #[default]
    Abort,
    /// Leave the record out, log it and list it as an anomaly
    Skip,
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub period: ReportPeriod,
    /// Restrict output to these owners; empty means everyone
    pub owners_filter: Vec<String>,
    /// Currency the statement is expressed in
    pub currency: Currency,
    pub policy: FailurePolicy,
}

/// Already-fetched records a statement is built from
#[derive(Debug, Clone, Copy)]
pub struct LedgerInput<'a> {
    pub ownership: &'a OwnershipMap,
    pub contracts: &'a [Contract],
    pub units: &'a [Unit],
    pub payments: &'a [PaymentRecord],
    pub expenses: &'a [ExpenseRecord],
}

/// An owner's share of one rent payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDetail {
    pub payment_id: String,
    pub date: NaiveDate,
    pub property_id: String,
    pub tenant_id: String,
    #[serde(flatten)]
    pub amount: Converted,
    pub percentage: Decimal,
    pub share_amount: Decimal,
}

/// An owner's share of one expense (100% for owner-attributed expenses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseDetail {
    pub expense_id: String,
    pub date: NaiveDate,
    pub category: String,
    pub property_id: Option<String>,
    #[serde(flatten)]
    pub amount: Converted,
    pub percentage: Decimal,
    pub share_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerReportItem {
    pub owner_id: String,
    pub property_count: usize,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_balance: Decimal,
    pub payments: Vec<PaymentDetail>,
    pub expenses: Vec<ExpenseDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerReport {
    pub period: ReportPeriod,
    pub currency: Currency,
    /// Sorted by owner id
    pub items: Vec<OwnerReportItem>,
    pub anomalies: Vec<Anomaly>,
}

impl OwnerReport {
    pub fn total_income(&self) -> Result<Decimal, EngineError> {
        checked_total(self.items.iter().map(|i| i.total_income), "total income")
    }

    pub fn total_expenses(&self) -> Result<Decimal, EngineError> {
        checked_total(self.items.iter().map(|i| i.total_expenses), "total expenses")
    }

    pub fn net_balance(&self) -> Result<Decimal, EngineError> {
        checked_total(self.items.iter().map(|i| i.net_balance), "net balance")
    }

    /// SHA-256 of the report's JSON. Identical inputs give an identical digest.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

#[derive(Debug, Default)]
struct OwnerTotals {
    income: Decimal,
    expenses: Decimal,
    payments: Vec<PaymentDetail>,
    expense_details: Vec<ExpenseDetail>,
}

/// A record's effect on the ledger, fully worked out before anything is applied
enum Contribution {
    Income(Vec<(String, PaymentDetail)>),
    Expense(Vec<(String, ExpenseDetail)>),
    Unattributed(Anomaly),
}

/// Build per-owner statements for `request.period`.
///
/// Approved payments are split across the owners of the property their contract leads to.
/// Paid expenses go to their owner, or are split like income when charged to a property.
/// The owner filter is applied after everything is aggregated.
pub fn build_report(
    request: &ReportRequest,
    input: LedgerInput<'_>,
) -> Result<OwnerReport, EngineError> {
    let resolver = PropertyResolver::new(input.contracts, input.units);
    let mut anomalies = ownership_anomalies(input.ownership);
    let mut owners: BTreeMap<String, OwnerTotals> = BTreeMap::new();

    for owner in input.ownership.values().flatten() {
        owners.entry(owner.owner_id.clone()).or_default();
    }

    let payments = input
        .payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Approved && request.period.contains(p.date()))
        .map(|p| (p.id.as_str(), payment_contribution(p, request.currency, &resolver, input.ownership)));

    let expenses = input
        .expenses
        .iter()
        .filter(|e| e.status == ExpenseStatus::Paid && request.period.contains(e.money.date))
        .map(|e| (e.id.as_str(), expense_contribution(e, request.currency, input.ownership)));

    let mut applied = 0usize;
    for (record_id, contribution) in payments.chain(expenses) {
        let outcome = contribution.and_then(|c| apply(&mut owners, &mut anomalies, c));
        match (outcome, request.policy) {
            (Ok(()), _) => applied += 1,
            (Err(err), FailurePolicy::Abort) => return Err(err),
            (Err(err), FailurePolicy::Skip) => {
                log::warn!("Skipping record {}: {}", record_id, err);
                anomalies.push(Anomaly::SkippedRecord {
                    record_id: record_id.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    log::info!("Applied {} record(s) for {}", applied, request.period);

    let counts = property_counts(input.ownership);
    let items = owners
        .into_iter()
        .filter(|(owner_id, _)| {
            request.owners_filter.is_empty() || request.owners_filter.contains(owner_id)
        })
        .map(|(owner_id, totals)| {
            let net_balance = totals
                .income
                .checked_sub(totals.expenses)
                .ok_or_else(|| EngineError::overflow(format!("net balance of {}", owner_id)))?;
            Ok(OwnerReportItem {
                property_count: counts.get(&owner_id).copied().unwrap_or(0),
                total_income: totals.income,
                total_expenses: totals.expenses,
                net_balance,
                payments: totals.payments,
                expenses: totals.expense_details,
                owner_id,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    Ok(OwnerReport {
        period: request.period,
        currency: request.currency,
        items,
        anomalies,
    })
}

/// One anomaly per property whose shares do not add up to 100%
pub fn ownership_anomalies(ownership: &OwnershipMap) -> Vec<Anomaly> {
    ownership
        .iter()
        .filter_map(|(property_id, shares)| match check_shares(shares) {
            OwnershipCheck::Balanced(_) => None,
            OwnershipCheck::Anomalous { actual_sum, .. } => {
                log::warn!(
                    "Property {} ownership sums to {}%",
                    property_id,
                    actual_sum
                );
                Some(Anomaly::OwnershipSum {
                    property_id: property_id.clone(),
                    actual_sum,
                })
            }
        })
        .collect()
}

fn payment_contribution(
    payment: &PaymentRecord,
    currency: Currency,
    resolver: &PropertyResolver<'_>,
    ownership: &OwnershipMap,
) -> Result<Contribution, EngineError> {
    let amount = payment.money.convert(currency)?;
    let property = resolver.property_of(&payment.contract_id);

    let (property_id, shares) = match property.and_then(|id| ownership.get(id).map(|s| (id, s))) {
        Some((id, shares)) if !shares.is_empty() => (id, shares),
        _ => {
            return Ok(Contribution::Unattributed(Anomaly::OrphanedIncome {
                payment_id: payment.id.clone(),
                property_id: property.map(str::to_string),
                amount: amount.normalized,
            }))
        }
    };

    let details = distribute(amount.normalized, shares)?
        .into_iter()
        .map(|allocation| {
            let detail = PaymentDetail {
                payment_id: payment.id.clone(),
                date: payment.date(),
                property_id: property_id.to_string(),
                tenant_id: payment.tenant_id.clone(),
                amount: amount.clone(),
                percentage: allocation.percentage,
                share_amount: allocation.share_amount,
            };
            (allocation.owner_id, detail)
        })
        .collect();
    Ok(Contribution::Income(details))
}

fn expense_contribution(
    expense: &ExpenseRecord,
    currency: Currency,
    ownership: &OwnershipMap,
) -> Result<Contribution, EngineError> {
    let amount = expense.money.convert(currency)?;
    let detail = |property_id: Option<&str>, percentage: Decimal, share_amount: Decimal| ExpenseDetail {
        expense_id: expense.id.clone(),
        date: expense.money.date,
        category: expense.category.clone(),
        property_id: property_id.map(str::to_string),
        amount: amount.clone(),
        percentage,
        share_amount,
    };

    match &expense.attribution {
        ExpenseAttribution::Owner(owner_id) => Ok(Contribution::Expense(vec![(
            owner_id.clone(),
            detail(None, dec!(100), amount.normalized),
        )])),
        ExpenseAttribution::Property(property_id) => {
            match ownership.get(property_id).filter(|shares| !shares.is_empty()) {
                Some(shares) => Ok(Contribution::Expense(
                    distribute(amount.normalized, shares)?
                        .into_iter()
                        .map(|a| {
                            let d = detail(Some(property_id.as_str()), a.percentage, a.share_amount);
                            (a.owner_id, d)
                        })
                        .collect(),
                )),
                None => Ok(Contribution::Unattributed(Anomaly::UnattributedExpense {
                    expense_id: expense.id.clone(),
                    property_id: property_id.clone(),
                    amount: amount.normalized,
                })),
            }
        }
    }
}

/// Add a contribution to the owners' running totals.
///
/// New totals are worked out before anything is written, so a record that would
/// overflow any owner's total leaves every owner untouched.
fn apply(
    owners: &mut BTreeMap<String, OwnerTotals>,
    anomalies: &mut Vec<Anomaly>,
    contribution: Contribution,
) -> Result<(), EngineError> {
    match contribution {
        Contribution::Income(details) => {
            let after = running_totals(owners, &details, |d| d.share_amount, |t| t.income)?;
            for ((owner_id, detail), income) in details.into_iter().zip(after) {
                let totals = owners.entry(owner_id).or_default();
                totals.income = income;
                totals.payments.push(detail);
            }
        }
        Contribution::Expense(details) => {
            let after = running_totals(owners, &details, |d| d.share_amount, |t| t.expenses)?;
            for ((owner_id, detail), expenses) in details.into_iter().zip(after) {
                let totals = owners.entry(owner_id).or_default();
                totals.expenses = expenses;
                totals.expense_details.push(detail);
            }
        }
        Contribution::Unattributed(anomaly) => {
            log::warn!("{}", anomaly);
            anomalies.push(anomaly);
        }
    }
    Ok(())
}

/// Owner's total after each detail, in order. An owner listed twice keeps accumulating.
fn running_totals<D>(
    owners: &BTreeMap<String, OwnerTotals>,
    details: &[(String, D)],
    amount: impl Fn(&D) -> Decimal,
    current: impl Fn(&OwnerTotals) -> Decimal,
) -> Result<Vec<Decimal>, EngineError> {
    let mut scratch: BTreeMap<&str, Decimal> = BTreeMap::new();
    details
        .iter()
        .map(|(owner_id, detail)| {
            let total = scratch
                .entry(owner_id.as_str())
                .or_insert_with(|| owners.get(owner_id).map(&current).unwrap_or_default());
            *total = total
                .checked_add(amount(detail))
                .ok_or_else(|| EngineError::overflow(format!("totals of owner {}", owner_id)))?;
            Ok(*total)
        })
        .collect()
}
