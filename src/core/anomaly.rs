use rust_decimal::Decimal;
use serde::Serialize;

/// Data-quality findings reported next to results instead of failing the calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Anomaly {
    /// Ownership shares of a property do not add up to 100%.
    /// Amounts were still distributed exactly as the shares say.
    OwnershipSum {
        property_id: String,
        actual_sum: Decimal,
    },
    /// Approved income with no property or no owners to attribute it to.
    OrphanedIncome {
        payment_id: String,
        property_id: Option<String>,
        amount: Decimal,
    },
    /// Paid property expense on a property with no owners.
    UnattributedExpense {
        expense_id: String,
        property_id: String,
        amount: Decimal,
    },
    /// Tenant has more than one active obligation.
    AmbiguousObligation {
        tenant_id: String,
        count: usize,
        authoritative_contract: String,
    },
    /// Record left out of the totals because it could not be calculated.
    SkippedRecord { record_id: String, reason: String },
}

impl Anomaly {
    pub fn kind(&self) -> &'static str {
        match self {
            Anomaly::OwnershipSum { .. } => "OwnershipSum",
            Anomaly::OrphanedIncome { .. } => "OrphanedIncome",
            Anomaly::UnattributedExpense { .. } => "UnattributedExpense",
            Anomaly::AmbiguousObligation { .. } => "AmbiguousObligation",
            Anomaly::SkippedRecord { .. } => "SkippedRecord",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Anomaly::OwnershipSum {
                property_id,
                actual_sum,
            } => format!(
                "Property {} ownership adds up to {}%, amounts distributed as recorded",
                property_id,
                actual_sum.normalize()
            ),
            Anomaly::OrphanedIncome {
                payment_id,
                property_id: Some(property_id),
                amount,
            } => format!(
                "Payment {} of {:.2} on property {} has no owners",
                payment_id, amount, property_id
            ),
            Anomaly::OrphanedIncome {
                payment_id,
                property_id: None,
                amount,
            } => format!(
                "Payment {} of {:.2} cannot be traced to a property",
                payment_id, amount
            ),
            Anomaly::UnattributedExpense {
                expense_id,
                property_id,
                amount,
            } => format!(
                "Expense {} of {:.2} on property {} has no owners",
                expense_id, amount, property_id
            ),
            Anomaly::AmbiguousObligation {
                tenant_id,
                count,
                authoritative_contract,
            } => format!(
                "Tenant {} has {} active contracts, latest is {}",
                tenant_id, count, authoritative_contract
            ),
            Anomaly::SkippedRecord { record_id, reason } => {
                format!("Record {} skipped: {}", record_id, reason)
            }
        }
    }
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}
