use super::anomaly::Anomaly;
use super::error::EngineError;
use super::money::{checked_total, Currency, MonetaryRecord};
use super::period::BillingPeriod;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tolerance for "covered" comparisons, one minor currency unit
pub const EPSILON: Decimal = dec!(0.01);

/// Longest lump-sum plan `distribute_lump_sum` will build, 100 years of months
pub const MAX_PLAN_MONTHS: u32 = 1200;

/// Approval state of a tenant payment, owned by the external approval workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn from_str(s: &str) -> Option<PaymentStatus> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "approved" => Some(PaymentStatus::Approved),
            "rejected" => Some(PaymentStatus::Rejected),
            _ => None,
        }
    }

    /// Rejected payments never count toward a balance
    pub fn counts_toward_balance(self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Pending)
    }
}

/// Monthly rent owed on a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RentObligation {
    pub contract_id: String,
    pub tenant_id: String,
    #[schemars(with = "f64")]
    pub monthly_rent: Decimal,
    #[schemars(with = "String")]
    pub start_date: NaiveDate,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RentObligation {
    fn ensure_positive_rent(&self) -> Result<(), EngineError> {
        if self.monthly_rent <= Decimal::ZERO {
            return Err(EngineError::InvalidRent {
                contract_id: self.contract_id.clone(),
                rent: self.monthly_rent,
            });
        }
        Ok(())
    }

    pub fn start_period(&self) -> BillingPeriod {
        BillingPeriod::from_date(self.start_date)
    }
}

/// A tenant payment as submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaymentRecord {
    pub id: String,
    pub contract_id: String,
    pub tenant_id: String,
    #[serde(flatten)]
    pub money: MonetaryRecord,
    pub status: PaymentStatus,
    /// Month the payment is meant for (yyyy-mm-01); legacy records may lack it
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub billing_period: Option<BillingPeriod>,
}

impl PaymentRecord {
    /// Whether this payment is meant for `period`.
    ///
    /// Untagged legacy payments fall back to the calendar month they were made in.
    pub fn applies_to(&self, period: BillingPeriod) -> bool {
        match self.billing_period {
            Some(billing_period) => billing_period == period,
            None => period.contains(self.money.date),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.money.date
    }

    /// Month the payment counts toward: its tag, or the month it was made in
    pub fn period(&self) -> BillingPeriod {
        self.billing_period
            .unwrap_or_else(|| BillingPeriod::from_date(self.money.date))
    }
}

/// Coverage of one month of rent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyBalance {
    pub period: BillingPeriod,
    pub rent_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub total_covered: Decimal,
    pub remaining_debt: Decimal,
    pub is_partial: bool,
    pub is_complete: bool,
}

/// One month's slice of a lump-sum payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
    pub is_full_month: bool,
}

impl AllocationPlan {
    pub fn period(&self) -> Result<BillingPeriod, EngineError> {
        BillingPeriod::new(self.year, self.month)
    }
}

/// How much of `target` is covered by approved and pending payments on the obligation's contract
pub fn monthly_balance(
    obligation: &RentObligation,
    payments: &[PaymentRecord],
    target: BillingPeriod,
) -> Result<MonthlyBalance, EngineError> {
    obligation.ensure_positive_rent()?;

    let mut paid_amount = Decimal::ZERO;
    let mut pending_amount = Decimal::ZERO;

    for payment in payments
        .iter()
        .filter(|p| p.contract_id == obligation.contract_id)
        .filter(|p| p.status.counts_toward_balance())
        .filter(|p| p.applies_to(target))
    {
        let amount = payment.money.normalize(Currency::Primary)?;
        let bucket = match payment.status {
            PaymentStatus::Approved => &mut paid_amount,
            PaymentStatus::Pending => &mut pending_amount,
            PaymentStatus::Rejected => continue,
        };
        *bucket = bucket
            .checked_add(amount)
            .ok_or_else(|| EngineError::overflow(format!("payments on {} for {}", obligation.contract_id, target)))?;
    }

    let overflow = || EngineError::overflow(format!("balance of {} for {}", obligation.contract_id, target));
    let rent_amount = obligation.monthly_rent;
    let total_covered = paid_amount.checked_add(pending_amount).ok_or_else(overflow)?;
    let remaining_debt = rent_amount
        .checked_sub(total_covered)
        .ok_or_else(overflow)?
        .max(Decimal::ZERO);
    let is_complete = total_covered >= rent_amount - EPSILON;
    let is_partial = total_covered > Decimal::ZERO && !is_complete;

    log::debug!(
        "Balance {} {}: rent={}, paid={}, pending={}, debt={}",
        obligation.contract_id,
        target,
        rent_amount,
        paid_amount,
        pending_amount,
        remaining_debt
    );

    Ok(MonthlyBalance {
        period: target,
        rent_amount,
        paid_amount,
        pending_amount,
        total_covered,
        remaining_debt,
        is_partial,
        is_complete,
    })
}

/// Count of fully paid months: all approved payments ever made on the contract, divided by
/// the monthly rent and floored. A partly paid final month does not count.
pub fn paid_months(
    obligation: &RentObligation,
    payments: &[PaymentRecord],
) -> Result<u32, EngineError> {
    obligation.ensure_positive_rent()?;
    let total_paid = total_with_status(obligation, payments, PaymentStatus::Approved, None)?;
    whole_months(obligation, total_paid)
}

fn whole_months(obligation: &RentObligation, total_paid: Decimal) -> Result<u32, EngineError> {
    let months = total_paid
        .checked_div(obligation.monthly_rent)
        .ok_or_else(|| EngineError::overflow(format!("paid months on {}", obligation.contract_id)))?
        .floor();
    Ok(months.max(Decimal::ZERO).to_u32().unwrap_or(u32::MAX))
}

/// Normalized total of the contract's payments with `status`, optionally only those
/// counting toward months up to and including `through`
fn total_with_status(
    obligation: &RentObligation,
    payments: &[PaymentRecord],
    status: PaymentStatus,
    through: Option<BillingPeriod>,
) -> Result<Decimal, EngineError> {
    let amounts = payments
        .iter()
        .filter(|p| p.contract_id == obligation.contract_id && p.status == status)
        .filter(|p| through.map_or(true, |last| p.period() <= last))
        .map(|p| p.money.normalize(Currency::Primary))
        .collect::<Result<Vec<_>, _>>()?;
    checked_total(amounts, &format!("{:?} payments on {}", status, obligation.contract_id))
}

/// Spread a lump sum over consecutive months starting at `start`, filling each month up
/// to `monthly_rent` before moving on. The last month takes whatever is left.
///
/// This does not look at which months are already covered by earlier payments;
/// reconciling against existing coverage is up to the caller.
///
/// Plans longer than [`MAX_PLAN_MONTHS`] are refused with `PlanTooLong`.
pub fn distribute_lump_sum(
    total_amount: Decimal,
    start: BillingPeriod,
    monthly_rent: Decimal,
) -> Result<Vec<AllocationPlan>, EngineError> {
    if total_amount <= Decimal::ZERO || monthly_rent <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let too_long = || EngineError::PlanTooLong {
        amount: total_amount,
        monthly_rent,
        limit: MAX_PLAN_MONTHS,
    };
    let months_needed = total_amount.checked_div(monthly_rent).ok_or_else(too_long)?.ceil();
    if months_needed > Decimal::from(MAX_PLAN_MONTHS) {
        return Err(too_long());
    }

    let mut plan = Vec::new();
    let mut remaining = total_amount;
    let mut period = start;

    while remaining > EPSILON {
        // fails once `next` has walked past the calendar's range
        BillingPeriod::new(period.year(), period.month())?;
        let amount = remaining.min(monthly_rent);
        plan.push(AllocationPlan {
            month: period.month(),
            year: period.year(),
            amount,
            is_full_month: amount >= monthly_rent - EPSILON,
        });
        remaining -= amount;
        period = period.next();
    }

    log::debug!(
        "Spread {} over {} month(s) from {} at rent {}",
        total_amount,
        plan.len(),
        start,
        monthly_rent
    );
    Ok(plan)
}

/// Outcome of looking up a tenant's active obligation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObligationLookup<'a> {
    None,
    Single(&'a RentObligation),
    /// More than one active obligation. The latest started one is authoritative.
    Ambiguous {
        authoritative: &'a RentObligation,
        count: usize,
    },
}

impl<'a> ObligationLookup<'a> {
    pub fn authoritative(&self) -> Option<&'a RentObligation> {
        match self {
            ObligationLookup::None => None,
            ObligationLookup::Single(obligation) => Some(obligation),
            ObligationLookup::Ambiguous { authoritative, .. } => Some(authoritative),
        }
    }
}

pub fn find_active_obligation<'a>(
    obligations: &'a [RentObligation],
    tenant_id: &str,
) -> ObligationLookup<'a> {
    let active: Vec<_> = obligations
        .iter()
        .filter(|o| o.active && o.tenant_id == tenant_id)
        .collect();

    match active.as_slice() {
        [] => ObligationLookup::None,
        [single] => ObligationLookup::Single(*single),
        many => {
            // max_by_key keeps the last of equal keys, so ties go to the later record
            match many.iter().copied().max_by_key(|o| o.start_date) {
                Some(authoritative) => ObligationLookup::Ambiguous {
                    authoritative,
                    count: many.len(),
                },
                None => ObligationLookup::None,
            }
        }
    }
}

/// The tenant's active obligation, or `NoActiveObligation`
pub fn require_active_obligation<'a>(
    obligations: &'a [RentObligation],
    tenant_id: &str,
) -> Result<&'a RentObligation, EngineError> {
    let lookup = find_active_obligation(obligations, tenant_id);
    if let ObligationLookup::Ambiguous {
        authoritative,
        count,
    } = &lookup
    {
        log::warn!(
            "Tenant {} has {} active obligations, using contract {} started {}",
            tenant_id,
            count,
            authoritative.contract_id,
            authoritative.start_date
        );
    }
    lookup
        .authoritative()
        .ok_or_else(|| EngineError::NoActiveObligation {
            tenant_id: tenant_id.to_string(),
        })
}

/// One anomaly per tenant with more than one active obligation
pub fn obligation_anomalies(obligations: &[RentObligation]) -> Vec<Anomaly> {
    let tenants: BTreeSet<&str> = obligations.iter().map(|o| o.tenant_id.as_str()).collect();
    tenants
        .into_iter()
        .filter_map(|tenant_id| match find_active_obligation(obligations, tenant_id) {
            ObligationLookup::Ambiguous {
                authoritative,
                count,
            } => Some(Anomaly::AmbiguousObligation {
                tenant_id: tenant_id.to_string(),
                count,
                authoritative_contract: authoritative.contract_id.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Running account of a tenant from the start of the obligation through `as_of`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantAccount {
    pub contract_id: String,
    pub tenant_id: String,
    pub as_of: BillingPeriod,
    pub months_due: u32,
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
    pub outstanding: Decimal,
    pub credit: Decimal,
    pub paid_months: u32,
    pub months: Vec<MonthlyBalance>,
}

pub fn tenant_account(
    obligation: &RentObligation,
    payments: &[PaymentRecord],
    as_of: BillingPeriod,
) -> Result<TenantAccount, EngineError> {
    obligation.ensure_positive_rent()?;

    let start = obligation.start_period();
    let months_due = start.months_through(as_of);
    let months = start
        .iter(months_due)
        .map(|period| monthly_balance(obligation, payments, period))
        .collect::<Result<Vec<_>, _>>()?;

    // payments meant for months after `as_of` stay out of the totals
    let through = Some(as_of);
    let overflow = || EngineError::overflow(format!("account of {} through {}", obligation.contract_id, as_of));
    let total_due = obligation
        .monthly_rent
        .checked_mul(Decimal::from(months_due))
        .ok_or_else(overflow)?;
    let total_paid = total_with_status(obligation, payments, PaymentStatus::Approved, through)?;
    let total_pending = total_with_status(obligation, payments, PaymentStatus::Pending, through)?;
    let covered = total_paid.checked_add(total_pending).ok_or_else(overflow)?;
    let balance = total_due.checked_sub(covered).ok_or_else(overflow)?;

    Ok(TenantAccount {
        contract_id: obligation.contract_id.clone(),
        tenant_id: obligation.tenant_id.clone(),
        as_of,
        months_due,
        total_due,
        total_paid,
        total_pending,
        outstanding: balance.max(Decimal::ZERO),
        credit: (-balance).max(Decimal::ZERO),
        paid_months: whole_months(obligation, total_paid)?,
        months,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn period(year: i32, month: u32) -> BillingPeriod {
        BillingPeriod::new(year, month).unwrap()
    }

    fn obligation(rent: Decimal) -> RentObligation {
        RentObligation {
            contract_id: "c1".to_string(),
            tenant_id: "t1".to_string(),
            monthly_rent: rent,
            start_date: date("2024-01-01"),
            active: true,
        }
    }

    fn payment(
        amount: Decimal,
        status: PaymentStatus,
        billing_period: Option<BillingPeriod>,
        on: &str,
    ) -> PaymentRecord {
        PaymentRecord {
            id: format!("pay-{on}-{amount}"),
            contract_id: "c1".to_string(),
            tenant_id: "t1".to_string(),
            money: MonetaryRecord::new(amount, Currency::Primary, None, date(on)),
            status,
            billing_period,
        }
    }

    #[test]
    fn partial_month() {
        let payments = vec![payment(
            dec!(200),
            PaymentStatus::Approved,
            Some(period(2024, 3)),
            "2024-03-05",
        )];
        let balance = monthly_balance(&obligation(dec!(400)), &payments, period(2024, 3)).unwrap();
        assert_eq!(balance.paid_amount, dec!(200));
        assert_eq!(balance.pending_amount, dec!(0));
        assert_eq!(balance.total_covered, dec!(200));
        assert_eq!(balance.remaining_debt, dec!(200));
        assert!(balance.is_partial);
        assert!(!balance.is_complete);
    }

    #[test]
    fn pending_counts_separately_and_rejected_never_counts() {
        let target = period(2024, 3);
        let payments = vec![
            payment(dec!(250), PaymentStatus::Approved, Some(target), "2024-03-01"),
            payment(dec!(150), PaymentStatus::Pending, Some(target), "2024-03-02"),
            payment(dec!(400), PaymentStatus::Rejected, Some(target), "2024-03-03"),
        ];
        let balance = monthly_balance(&obligation(dec!(400)), &payments, target).unwrap();
        assert_eq!(balance.paid_amount, dec!(250));
        assert_eq!(balance.pending_amount, dec!(150));
        assert_eq!(balance.remaining_debt, dec!(0));
        assert!(balance.is_complete);
        assert!(!balance.is_partial);
    }

    #[test]
    fn billing_period_wins_over_payment_date() {
        // paid in March but tagged for February
        let payments = vec![payment(
            dec!(400),
            PaymentStatus::Approved,
            Some(period(2024, 2)),
            "2024-03-10",
        )];
        let o = obligation(dec!(400));
        assert!(monthly_balance(&o, &payments, period(2024, 2)).unwrap().is_complete);
        assert_eq!(
            monthly_balance(&o, &payments, period(2024, 3)).unwrap().total_covered,
            dec!(0)
        );
    }

    #[test]
    fn untagged_payment_falls_back_to_date() {
        let payments = vec![payment(dec!(100), PaymentStatus::Approved, None, "2024-04-30")];
        let o = obligation(dec!(400));
        assert_eq!(
            monthly_balance(&o, &payments, period(2024, 4)).unwrap().paid_amount,
            dec!(100)
        );
        assert_eq!(
            monthly_balance(&o, &payments, period(2024, 5)).unwrap().paid_amount,
            dec!(0)
        );
    }

    #[test]
    fn other_contracts_ignored() {
        let mut other = payment(dec!(400), PaymentStatus::Approved, Some(period(2024, 3)), "2024-03-01");
        other.contract_id = "c2".to_string();
        let balance = monthly_balance(&obligation(dec!(400)), &[other], period(2024, 3)).unwrap();
        assert_eq!(balance.total_covered, dec!(0));
        assert_eq!(balance.remaining_debt, dec!(400));
        assert!(!balance.is_partial);
        assert!(!balance.is_complete);
    }

    #[test]
    fn secondary_payment_normalized_to_primary() {
        let mut p = payment(dec!(7300), PaymentStatus::Approved, Some(period(2024, 3)), "2024-03-01");
        p.money.currency = Currency::Secondary;
        p.money.exchange_rate = Some(dec!(36.5));
        let balance = monthly_balance(&obligation(dec!(400)), &[p], period(2024, 3)).unwrap();
        assert_eq!(balance.paid_amount, dec!(200));
    }

    #[test]
    fn secondary_payment_without_rate_fails() {
        let mut p = payment(dec!(7300), PaymentStatus::Pending, Some(period(2024, 3)), "2024-03-01");
        p.money.currency = Currency::Secondary;
        let err = monthly_balance(&obligation(dec!(400)), &[p], period(2024, 3)).unwrap_err();
        assert!(matches!(err, EngineError::MissingExchangeRate { .. }));
    }

    #[test]
    fn within_epsilon_is_complete() {
        let target = period(2024, 3);
        let payments = vec![payment(dec!(399.995), PaymentStatus::Approved, Some(target), "2024-03-01")];
        let balance = monthly_balance(&obligation(dec!(400)), &payments, target).unwrap();
        assert!(balance.is_complete);
        assert!(!balance.is_partial);
    }

    #[test]
    fn coverage_never_decreases_with_more_payments() {
        let target = period(2024, 3);
        let o = obligation(dec!(400));
        let mut payments = Vec::new();
        let mut last = Decimal::ZERO;
        for amount in [dec!(50), dec!(0), dec!(125.5), dec!(300), dec!(10)] {
            payments.push(payment(amount, PaymentStatus::Approved, Some(target), "2024-03-01"));
            let covered = monthly_balance(&o, &payments, target).unwrap().total_covered;
            assert!(covered >= last);
            last = covered;
        }
    }

    #[test]
    fn non_positive_rent_rejected() {
        for rent in [dec!(0), dec!(-400)] {
            let o = obligation(rent);
            assert!(matches!(
                monthly_balance(&o, &[], period(2024, 1)),
                Err(EngineError::InvalidRent { .. })
            ));
            assert!(matches!(paid_months(&o, &[]), Err(EngineError::InvalidRent { .. })));
        }
    }

    #[test]
    fn paid_months_floors() {
        let o = obligation(dec!(400));
        let cases = [
            (vec![dec!(399.99)], 0),
            (vec![dec!(400)], 1),
            (vec![dec!(500), dec!(450)], 2),
            (vec![dec!(1199.99)], 2),
            (vec![dec!(1200)], 3),
        ];
        for (amounts, expected) in cases {
            let payments: Vec<_> = amounts
                .into_iter()
                .map(|a| payment(a, PaymentStatus::Approved, None, "2024-01-15"))
                .collect();
            assert_eq!(paid_months(&o, &payments).unwrap(), expected);
        }
    }

    #[test]
    fn paid_months_only_counts_approved() {
        let o = obligation(dec!(400));
        let payments = vec![
            payment(dec!(400), PaymentStatus::Approved, None, "2024-01-15"),
            payment(dec!(400), PaymentStatus::Pending, None, "2024-02-15"),
            payment(dec!(400), PaymentStatus::Rejected, None, "2024-03-15"),
        ];
        assert_eq!(paid_months(&o, &payments).unwrap(), 1);
    }

    #[test]
    fn lump_sum_fills_greedily() {
        let plan = distribute_lump_sum(dec!(1000), period(2024, 1), dec!(400)).unwrap();
        assert_eq!(
            plan,
            vec![
                AllocationPlan { month: 1, year: 2024, amount: dec!(400), is_full_month: true },
                AllocationPlan { month: 2, year: 2024, amount: dec!(400), is_full_month: true },
                AllocationPlan { month: 3, year: 2024, amount: dec!(200), is_full_month: false },
            ]
        );
    }

    #[test]
    fn lump_sum_wraps_year() {
        let plan = distribute_lump_sum(dec!(1200), period(2024, 11), dec!(400)).unwrap();
        let months: Vec<_> = plan.iter().map(|p| (p.year, p.month)).collect();
        assert_eq!(months, vec![(2024, 11), (2024, 12), (2025, 1)]);
        assert!(plan.iter().all(|p| p.is_full_month));
    }

    #[test]
    fn lump_sum_exhausts_amount() {
        for (total, rent) in [(dec!(1234.56), dec!(400)), (dec!(50), dec!(400)), (dec!(800), dec!(400))] {
            let plan = distribute_lump_sum(total, period(2024, 6), rent).unwrap();
            let sum: Decimal = plan.iter().map(|p| p.amount).sum();
            assert_eq!(sum, total);
            let (last, rest) = plan.split_last().unwrap();
            assert!(rest.iter().all(|p| p.amount == rent));
            assert!(last.amount <= rent);
        }
    }

    #[test]
    fn lump_sum_guards_non_positive_input() {
        assert!(distribute_lump_sum(dec!(0), period(2024, 1), dec!(400)).unwrap().is_empty());
        assert!(distribute_lump_sum(dec!(-10), period(2024, 1), dec!(400)).unwrap().is_empty());
        assert!(distribute_lump_sum(dec!(1000), period(2024, 1), dec!(0)).unwrap().is_empty());
    }

    #[test]
    fn lump_sum_refuses_endless_plans() {
        let err = distribute_lump_sum(dec!(1000000), period(2024, 1), dec!(0.01)).unwrap_err();
        assert_eq!(
            err,
            EngineError::PlanTooLong {
                amount: dec!(1000000),
                monthly_rent: dec!(0.01),
                limit: MAX_PLAN_MONTHS,
            }
        );

        // exactly at the limit is still planned
        let plan = distribute_lump_sum(dec!(1200), period(2024, 1), dec!(1)).unwrap();
        assert_eq!(plan.len(), MAX_PLAN_MONTHS as usize);
        assert_eq!(plan.last().unwrap().period().unwrap(), period(2123, 12));
    }

    #[test]
    fn lump_sum_stops_at_end_of_calendar() {
        let last = BillingPeriod::from_date(NaiveDate::MAX);
        let err = distribute_lump_sum(dec!(1200), last, dec!(400)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBillingPeriod { .. }));

        let beyond = AllocationPlan { month: 1, year: last.year() + 1, amount: dec!(1), is_full_month: false };
        assert!(beyond.period().is_err());
    }

    #[test]
    fn overflowing_payments_are_an_error() {
        let payments = vec![
            payment(Decimal::MAX, PaymentStatus::Approved, Some(period(2024, 3)), "2024-03-01"),
            payment(dec!(1), PaymentStatus::Approved, Some(period(2024, 3)), "2024-03-02"),
        ];
        let o = obligation(dec!(400));
        assert!(matches!(
            monthly_balance(&o, &payments, period(2024, 3)),
            Err(EngineError::Overflow { .. })
        ));
        assert!(matches!(paid_months(&o, &payments), Err(EngineError::Overflow { .. })));
    }

    #[test]
    fn active_obligation_lookup() {
        let mut old = obligation(dec!(300));
        old.contract_id = "c0".to_string();
        old.start_date = date("2023-01-01");
        let mut ended = obligation(dec!(350));
        ended.contract_id = "c-ended".to_string();
        ended.active = false;
        let current = obligation(dec!(400));

        assert_eq!(find_active_obligation(&[], "t1"), ObligationLookup::None);
        assert!(matches!(
            require_active_obligation(&[ended.clone()], "t1"),
            Err(EngineError::NoActiveObligation { .. })
        ));

        let single = vec![ended.clone(), current.clone()];
        assert_eq!(find_active_obligation(&single, "t1"), ObligationLookup::Single(&single[1]));

        let both = vec![current.clone(), old, ended];
        match find_active_obligation(&both, "t1") {
            ObligationLookup::Ambiguous { authoritative, count } => {
                assert_eq!(count, 2);
                assert_eq!(authoritative.contract_id, "c1");
            }
            other => panic!("expected ambiguous lookup, got {other:?}"),
        }
        assert_eq!(require_active_obligation(&both, "t1").unwrap().contract_id, "c1");
    }

    #[test]
    fn ambiguous_obligations_reported_per_tenant() {
        let mut second = obligation(dec!(450));
        second.contract_id = "c9".to_string();
        second.start_date = date("2024-06-01");
        let mut other_tenant = obligation(dec!(500));
        other_tenant.contract_id = "c5".to_string();
        other_tenant.tenant_id = "t5".to_string();

        let anomalies = obligation_anomalies(&[obligation(dec!(400)), other_tenant, second]);
        assert_eq!(
            anomalies,
            vec![Anomaly::AmbiguousObligation {
                tenant_id: "t1".to_string(),
                count: 2,
                authoritative_contract: "c9".to_string(),
            }]
        );
    }

    #[test]
    fn tenant_account_tracks_debt_and_credit() {
        let o = obligation(dec!(400));
        let payments = vec![
            payment(dec!(400), PaymentStatus::Approved, Some(period(2024, 1)), "2024-01-03"),
            payment(dec!(200), PaymentStatus::Approved, Some(period(2024, 2)), "2024-02-03"),
            payment(dec!(100), PaymentStatus::Pending, Some(period(2024, 2)), "2024-02-20"),
        ];
        let account = tenant_account(&o, &payments, period(2024, 3)).unwrap();
        assert_eq!(account.months_due, 3);
        assert_eq!(account.total_due, dec!(1200));
        assert_eq!(account.total_paid, dec!(600));
        assert_eq!(account.total_pending, dec!(100));
        assert_eq!(account.outstanding, dec!(500));
        assert_eq!(account.credit, dec!(0));
        assert_eq!(account.paid_months, 1);
        assert_eq!(account.months.len(), 3);
        assert!(account.months[0].is_complete);
        assert!(account.months[1].is_partial);
        assert_eq!(account.months[2].remaining_debt, dec!(400));

        let prepaid = vec![payment(dec!(2000), PaymentStatus::Approved, None, "2024-01-02")];
        let account = tenant_account(&o, &prepaid, period(2024, 2)).unwrap();
        assert_eq!(account.outstanding, dec!(0));
        assert_eq!(account.credit, dec!(1200));
    }

    #[test]
    fn tenant_account_ignores_payments_after_as_of() {
        let o = obligation(dec!(400));
        let payments = vec![
            payment(dec!(400), PaymentStatus::Approved, Some(period(2024, 1)), "2024-01-03"),
            // tagged for a later month, made early
            payment(dec!(400), PaymentStatus::Approved, Some(period(2024, 4)), "2024-02-03"),
            // untagged, made after as_of
            payment(dec!(400), PaymentStatus::Pending, None, "2024-05-10"),
        ];
        let account = tenant_account(&o, &payments, period(2024, 2)).unwrap();
        assert_eq!(account.total_due, dec!(800));
        assert_eq!(account.total_paid, dec!(400));
        assert_eq!(account.total_pending, dec!(0));
        assert_eq!(account.outstanding, dec!(400));
        assert_eq!(account.credit, dec!(0));
        assert_eq!(account.paid_months, 1);

        // all-time count still sees both approved payments
        assert_eq!(paid_months(&o, &payments).unwrap(), 2);
    }
}
