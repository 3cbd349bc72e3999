use super::error::EngineError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar month a payment is meant to satisfy.
///
/// Stored records tag it as `yyyy-mm-01`; `yyyy-mm` is accepted on input too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, EngineError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(EngineError::InvalidBillingPeriod { year, month });
        }
        Ok(BillingPeriod { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        BillingPeriod {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month, rolling December over into January of the next year
    pub fn next(&self) -> Self {
        if self.month == 12 {
            BillingPeriod {
                year: self.year + 1,
                month: 1,
            }
        } else {
            BillingPeriod {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whether `date` falls inside this calendar month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Number of months from `self` through `last`, both inclusive. Zero if `last` is earlier.
    pub fn months_through(&self, last: BillingPeriod) -> u32 {
        let span = (last.year - self.year) * 12 + last.month as i32 - self.month as i32 + 1;
        span.max(0) as u32
    }

    /// Iterate `count` consecutive months starting at `self`
    pub fn iter(self, count: u32) -> impl Iterator<Item = BillingPeriod> {
        std::iter::successors(Some(self), |p| Some(p.next())).take(count as usize)
    }

    fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Storage tag, e.g. "2024-03-01"
    pub fn tag(&self) -> String {
        format!("{:04}-{:02}-01", self.year, self.month)
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d"))
            .map_err(|_| format!("invalid billing period '{s}', expected yyyy-mm-01"))?;
        Ok(BillingPeriod::from_date(date))
    }
}

impl TryFrom<String> for BillingPeriod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingPeriod> for String {
    fn from(period: BillingPeriod) -> Self {
        period.tag()
    }
}

/// Inclusive date range an owner statement covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        ReportPeriod { start, end }
    }

    /// The whole calendar month of `period`
    pub fn month(period: BillingPeriod) -> Self {
        let start = period.first_day().unwrap_or(NaiveDate::MIN);
        let end = period
            .next()
            .first_day()
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        ReportPeriod { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn display(&self) -> String {
        format!("{} to {}", self.start, self.end)
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
