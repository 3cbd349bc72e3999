use super::money::Currency;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("exchange rate required to convert {from} to {to}: {record}")]
    MissingExchangeRate {
        record: String,
        from: Currency,
        to: Currency,
    },
    #[error("no active rent obligation for tenant {tenant_id}")]
    NoActiveObligation { tenant_id: String },
    #[error("monthly rent must be positive, got {rent} on contract {contract_id}")]
    InvalidRent { contract_id: String, rent: Decimal },
    #[error("invalid billing period: {year}-{month:02}")]
    InvalidBillingPeriod { year: i32, month: u32 },
    #[error("amount out of range: {record}")]
    Overflow { record: String },
    #[error("spreading {amount} at {monthly_rent} a month needs more than {limit} months")]
    PlanTooLong {
        amount: Decimal,
        monthly_rent: Decimal,
        limit: u32,
    },
}

impl EngineError {
    pub fn overflow(record: impl Into<String>) -> Self {
        EngineError::Overflow {
            record: record.into(),
        }
    }

    /// Short machine-friendly name, used when a record is skipped rather than failed
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::MissingExchangeRate { .. } => "MissingExchangeRate",
            EngineError::NoActiveObligation { .. } => "NoActiveObligation",
            EngineError::InvalidRent { .. } => "InvalidRent",
            EngineError::InvalidBillingPeriod { .. } => "InvalidBillingPeriod",
            EngineError::Overflow { .. } => "Overflow",
            EngineError::PlanTooLong { .. } => "PlanTooLong",
        }
    }
}
