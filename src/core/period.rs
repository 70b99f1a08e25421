//! Billing periods and the counter field naming convention

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::AllocationError;

/// First year representable with a two-digit year prefix
pub const FIRST_YEAR: i32 = 2000;

/// Last year representable with a two-digit year prefix
pub const LAST_YEAR: i32 = 2099;

/// A (year, month) pair that partitions the invoice sequence
///
/// Allocations in different periods touch different counter fields and
/// never contend with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period, rejecting years outside 2000-2099 and months outside 1-12
    pub fn new(year: i32, month: u32) -> Result<Self, AllocationError> {
        if !(FIRST_YEAR..=LAST_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(AllocationError::PeriodOutOfRange { year, month });
        }
        Ok(Self { year, month })
    }

    /// Period containing the given instant (UTC calendar)
    pub fn from_datetime(at: DateTime<Utc>) -> Result<Self, AllocationError> {
        Self::new(at.year(), at.month())
    }

    /// Period containing the given epoch-milliseconds instant
    pub fn from_timestamp_millis(millis: i64) -> Result<Self, AllocationError> {
        let at = DateTime::from_timestamp_millis(millis)
            .ok_or(AllocationError::InvalidTimestamp { millis })?;
        Self::from_datetime(at)
    }

    /// Period from the two-digit year used in invoice numbers
    pub fn from_two_digit(yy: u8, month: u32) -> Result<Self, AllocationError> {
        Self::new(FIRST_YEAR + i32::from(yy), month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Two-digit year
    pub fn yy(&self) -> u8 {
        // year is bounded to 2000..=2099 by construction
        (self.year - FIRST_YEAR) as u8
    }

    /// Location of this period's counter inside the counter record
    pub fn counter_field(&self) -> CounterField {
        CounterField {
            year_attr: format!("y{:02}", self.yy()),
            month_attr: format!("m{}", self.month),
        }
    }

    /// Every month of every year in `first..=last`
    pub fn months_between(first: i32, last: i32) -> Result<Vec<Period>, AllocationError> {
        let mut periods = Vec::new();
        for year in first..=last {
            for month in 1..=12 {
                periods.push(Self::new(year, month)?);
            }
        }
        Ok(periods)
    }
}

impl fmt::Display for Period {
    /// Renders the invoice number prefix, e.g. `2403`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.yy(), self.month)
    }
}

/// Nested attribute path of one period counter: `y{yy}.m{m}.cnt`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterField {
    year_attr: String,
    month_attr: String,
}

impl CounterField {
    /// Name of the leaf attribute holding the count
    pub const LEAF: &'static str = "cnt";

    pub fn year_attr(&self) -> &str {
        &self.year_attr
    }

    pub fn month_attr(&self) -> &str {
        &self.month_attr
    }
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.year_attr, self.month_attr, Self::LEAF)
    }
}
