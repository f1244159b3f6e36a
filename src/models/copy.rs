//! Copy (physical instance of a book) status, derived from open loans

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Derived availability status of a copy.
///
/// Never persisted: always recomputed from the copy's open loan so the
/// loan table stays the single source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    OnShelf,
    OnLoan,
    /// Open loan past its due date
    Missing,
}

impl CopyStatus {
    /// Classify a copy from the due date of its open loan, if any.
    pub fn classify(open_loan_due: Option<NaiveDate>, today: NaiveDate) -> Self {
        match open_loan_due {
            None => CopyStatus::OnShelf,
            Some(due) if due < today => CopyStatus::Missing,
            Some(_) => CopyStatus::OnLoan,
        }
    }
}

/// A copy together with its derived status, for book detail views
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CopyWithStatus {
    pub id: i32,
    pub book_id: i32,
    pub status: CopyStatus,
}

/// Per-book tally of copy statuses, for list views
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StatusTally {
    pub on_shelf: i64,
    pub on_loan: i64,
    pub missing: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_no_open_loan_is_on_shelf() {
        assert_eq!(
            CopyStatus::classify(None, d(2024, 6, 1)),
            CopyStatus::OnShelf
        );
    }

    #[test]
    fn test_due_today_is_on_loan() {
        assert_eq!(
            CopyStatus::classify(Some(d(2024, 6, 1)), d(2024, 6, 1)),
            CopyStatus::OnLoan
        );
    }

    #[test]
    fn test_due_in_future_is_on_loan() {
        assert_eq!(
            CopyStatus::classify(Some(d(2024, 6, 15)), d(2024, 6, 1)),
            CopyStatus::OnLoan
        );
    }

    #[test]
    fn test_overdue_is_missing() {
        assert_eq!(
            CopyStatus::classify(Some(d(2024, 5, 31)), d(2024, 6, 1)),
            CopyStatus::Missing
        );
    }
}
