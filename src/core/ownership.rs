use super::error::EngineError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Share of one property held by one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OwnershipShare {
    pub owner_id: String,
    /// Percentage in [0, 100]
    #[schemars(with = "f64")]
    pub percentage: Decimal,
}

impl OwnershipShare {
    pub fn new(owner_id: impl Into<String>, percentage: Decimal) -> Self {
        OwnershipShare {
            owner_id: owner_id.into(),
            percentage,
        }
    }
}

/// Property id -> its ownership shares
pub type OwnershipMap = BTreeMap<String, Vec<OwnershipShare>>;

/// One owner's cut of a distributed amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub owner_id: String,
    pub percentage: Decimal,
    pub share_amount: Decimal,
}

/// Result of checking that a property's shares add up to 100%
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipCheck<'a> {
    Balanced(&'a [OwnershipShare]),
    Anomalous {
        shares: &'a [OwnershipShare],
        actual_sum: Decimal,
    },
}

impl<'a> OwnershipCheck<'a> {
    pub fn shares(&self) -> &'a [OwnershipShare] {
        match self {
            OwnershipCheck::Balanced(shares) => shares,
            OwnershipCheck::Anomalous { shares, .. } => shares,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, OwnershipCheck::Anomalous { .. })
    }
}

/// Sum of the shares' percentages, saturating at the edges of `Decimal`'s range
pub fn total_percentage(shares: &[OwnershipShare]) -> Decimal {
    shares
        .iter()
        .fold(Decimal::ZERO, |total, s| total.saturating_add(s.percentage))
}

/// Flag shares that do not sum to exactly 100. Nothing is corrected.
pub fn check_shares(shares: &[OwnershipShare]) -> OwnershipCheck<'_> {
    let actual_sum = total_percentage(shares);
    if actual_sum == dec!(100) {
        OwnershipCheck::Balanced(shares)
    } else {
        OwnershipCheck::Anomalous { shares, actual_sum }
    }
}

/// Split `total` across owners by percentage.
///
/// Portions are left unrounded so summing them never compounds rounding error;
/// round only for display. Percentages are used as given: a sum under 100
/// under-distributes and a sum over 100 over-distributes. No shares means no
/// allocation, and the caller decides how to report the orphaned amount.
pub fn distribute(total: Decimal, shares: &[OwnershipShare]) -> Result<Vec<Allocation>, EngineError> {
    shares
        .iter()
        .map(|share| {
            let share_amount = share
                .percentage
                .checked_div(dec!(100))
                .and_then(|fraction| total.checked_mul(fraction))
                .ok_or_else(|| {
                    EngineError::overflow(format!(
                        "{}% of {} for owner {}",
                        share.percentage, total, share.owner_id
                    ))
                })?;
            Ok(Allocation {
                owner_id: share.owner_id.clone(),
                percentage: share.percentage,
                share_amount,
            })
        })
        .collect()
}

/// Number of distinct properties each owner holds any share in
pub fn property_counts(ownership: &OwnershipMap) -> BTreeMap<String, usize> {
    let mut properties: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for (property_id, shares) in ownership {
        for share in shares {
            properties
                .entry(share.owner_id.clone())
                .or_default()
                .insert(property_id.as_str());
        }
    }
    properties
        .into_iter()
        .map(|(owner, props)| (owner, props.len()))
        .collect()
}
