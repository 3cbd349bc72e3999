use super::error::EngineError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The two currencies the ledger accounts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Reference currency all tenant balances are kept in
    #[default]
    Primary,
    /// Needs a per-transaction exchange rate to become Primary
    Secondary,
}

impl Currency {
    pub fn from_str(s: &str) -> Option<Currency> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Some(Currency::Primary),
            "secondary" => Some(Currency::Secondary),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Primary => write!(f, "PRIMARY"),
            Currency::Secondary => write!(f, "SECONDARY"),
        }
    }
}

/// Amount as recorded, in the currency it was paid in.
///
/// `exchange_rate` is units of Secondary per one unit of Primary,
/// so `secondary / rate = primary` and `primary * rate = secondary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MonetaryRecord {
    #[schemars(with = "f64")]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub exchange_rate: Option<Decimal>,
    #[schemars(with = "String")]
    pub date: NaiveDate,
}

/// A record's amount alongside its value in the report currency, kept for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Converted {
    pub original_amount: Decimal,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub normalized: Decimal,
}

impl MonetaryRecord {
    pub fn new(amount: Decimal, currency: Currency, exchange_rate: Option<Decimal>, date: NaiveDate) -> Self {
        MonetaryRecord {
            amount,
            currency,
            exchange_rate,
            date,
        }
    }

    /// Express this record in `target`, see [`normalize`]
    pub fn normalize(&self, target: Currency) -> Result<Decimal, EngineError> {
        normalize(self, target)
    }

    pub fn convert(&self, target: Currency) -> Result<Converted, EngineError> {
        Ok(Converted {
            original_amount: self.amount,
            currency: self.currency,
            exchange_rate: self.exchange_rate,
            normalized: normalize(self, target)?,
        })
    }

    fn usable_rate(&self) -> Option<Decimal> {
        self.exchange_rate.filter(|rate| *rate > Decimal::ZERO)
    }
}

/// Convert a recorded amount into `target`.
///
/// Same currency is always the identity and never looks at the rate.
/// Secondary to Primary divides by the rate, Primary to Secondary multiplies.
/// A missing or non-positive rate is an error; a rate of 1 is never assumed.
pub fn normalize(record: &MonetaryRecord, target: Currency) -> Result<Decimal, EngineError> {
    if record.currency == target {
        return Ok(record.amount);
    }

    let rate = record
        .usable_rate()
        .ok_or_else(|| EngineError::MissingExchangeRate {
            record: format!("{} {} on {}", record.amount, record.currency, record.date),
            from: record.currency,
            to: target,
        })?;

    let converted = match (record.currency, target) {
        (Currency::Secondary, Currency::Primary) => record.amount.checked_div(rate),
        (Currency::Primary, Currency::Secondary) => record.amount.checked_mul(rate),
        _ => Some(record.amount),
    }
    .ok_or_else(|| {
        EngineError::overflow(format!(
            "{} {} at rate {} on {}",
            record.amount, record.currency, rate, record.date
        ))
    })?;
    log::debug!(
        "Normalized {} {} at rate {} -> {} {}",
        record.amount,
        record.currency,
        rate,
        converted,
        target
    );
    Ok(converted)
}

/// Sum amounts, failing instead of panicking when the total leaves `Decimal`'s range
pub fn checked_total<I>(amounts: I, record: &str) -> Result<Decimal, EngineError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or_else(|| EngineError::overflow(record))
    })
}
