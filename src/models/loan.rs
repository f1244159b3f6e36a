//! Loan (borrow) model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub copy_id: i32,
    pub loanee_id: i32,
    /// Date the copy was taken out
    pub out_timestamp: NaiveDate,
    /// Due date while open; return date once closed
    pub in_timestamp: NaiveDate,
    pub returned: bool,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        !self.returned
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.in_timestamp < today
    }
}

/// Loan with book and loanee context for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub copy_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub loanee_id: i32,
    pub loanee_name: String,
    pub out_timestamp: NaiveDate,
    pub in_timestamp: NaiveDate,
    pub returned: bool,
}

/// Unit for loan durations and extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Days,
    Weeks,
}

/// A loan duration expressed as length + unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct LoanPeriod {
    pub length: i64,
    pub unit: DurationUnit,
}

impl LoanPeriod {
    /// Ceiling on a single period or extension, in days
    pub const MAX_DAYS: i64 = 3650;

    pub fn days(length: i64) -> Self {
        Self { length, unit: DurationUnit::Days }
    }

    pub fn weeks(length: i64) -> Self {
        Self { length, unit: DurationUnit::Weeks }
    }

    /// Total length in days, saturating on overflow
    pub fn total_days(self) -> i64 {
        match self.unit {
            DurationUnit::Days => self.length,
            DurationUnit::Weeks => self.length.saturating_mul(7),
        }
    }

    pub fn is_positive(self) -> bool {
        self.length > 0
    }

    /// Calendar duration of the period. `None` when non-positive or
    /// longer than [`Self::MAX_DAYS`], so arbitrary request values can
    /// never overflow date arithmetic.
    pub fn to_duration(self) -> Option<Duration> {
        let days = self.total_days();
        if days <= 0 || days > Self::MAX_DAYS {
            return None;
        }
        Duration::try_days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_period_days() {
        assert_eq!(LoanPeriod::days(3).to_duration(), Some(Duration::days(3)));
        assert_eq!(LoanPeriod::weeks(2).to_duration(), Some(Duration::days(14)));
    }

    #[test]
    fn test_period_positivity() {
        assert!(LoanPeriod::weeks(1).is_positive());
        assert!(!LoanPeriod::days(0).is_positive());
        assert!(!LoanPeriod::weeks(-1).is_positive());
    }

    #[test]
    fn test_period_rejects_out_of_range_lengths() {
        // Extreme lengths must come back as None, never panic
        assert_eq!(LoanPeriod::weeks(i64::MAX).to_duration(), None);
        assert_eq!(LoanPeriod::days(i64::MAX).to_duration(), None);
        assert_eq!(LoanPeriod::days(i64::MIN).to_duration(), None);
        assert_eq!(LoanPeriod::days(0).to_duration(), None);
        assert_eq!(LoanPeriod::days(LoanPeriod::MAX_DAYS + 1).to_duration(), None);
        assert!(LoanPeriod::days(LoanPeriod::MAX_DAYS).to_duration().is_some());
    }

    #[test]
    fn test_overdue_only_when_open() {
        let mut loan = Loan {
            id: 1,
            copy_id: 1,
            loanee_id: 1,
            out_timestamp: d(2024, 5, 1),
            in_timestamp: d(2024, 5, 15),
            returned: false,
        };
        assert!(loan.is_overdue(d(2024, 5, 16)));
        assert!(!loan.is_overdue(d(2024, 5, 15)));
        loan.returned = true;
        assert!(!loan.is_overdue(d(2024, 5, 16)));
    }
}
