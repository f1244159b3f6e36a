//! Circulation service: loan lifecycle and loanee records

use validator::Validate;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanDetails, LoanPeriod},
        loanee::{CreateLoanee, Loanee, LoaneeLoans},
    },
    repository::Repository,
    search::Synchronizer,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    sync: Synchronizer,
    library: LibraryConfig,
}

impl CirculationService {
    pub fn new(repository: Repository, sync: Synchronizer, library: LibraryConfig) -> Self {
        Self { repository, sync, library }
    }

    /// Check a copy of a book out to a loanee resolved or created by
    /// name (and optional phone). Defaults to the configured loan
    /// duration when no period is given.
    pub async fn checkout(
        &self,
        book_id: i32,
        loanee_name: &str,
        loanee_phone: Option<&str>,
        period: Option<LoanPeriod>,
    ) -> AppResult<LoanDetails> {
        let name = loanee_name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Loanee must have a name".to_string()));
        }

        let period = period.unwrap_or(LoanPeriod::days(self.library.loan_duration_days));
        let Some(due_in) = period.to_duration() else {
            return Err(AppError::Validation(format!(
                "Loan duration must be between 1 and {} days",
                LoanPeriod::MAX_DAYS
            )));
        };

        let (details, changes) = self
            .repository
            .loans
            .checkout(book_id, name, loanee_phone, due_in)
            .await?;
        tracing::info!(
            loan_id = details.id,
            book_id,
            loanee = %details.loanee_name,
            due = %details.in_timestamp,
            "copy checked out"
        );
        self.sync.apply(changes).await;
        Ok(details)
    }

    /// Extend an open loan's due date
    pub async fn extend(&self, loan_id: i32, period: LoanPeriod) -> AppResult<Loan> {
        let Some(delta) = period.to_duration() else {
            return Err(AppError::Validation(format!(
                "Extension must be between 1 and {} days",
                LoanPeriod::MAX_DAYS
            )));
        };
        self.repository.loans.extend(loan_id, delta).await
    }

    /// Close a loan, returning its copy to the shelf
    pub async fn close(&self, loan_id: i32) -> AppResult<Loan> {
        let loan = self.repository.loans.close(loan_id).await?;
        tracing::info!(loan_id, "loan closed");
        Ok(loan)
    }

    /// Open loans due within the horizon, soonest first. A non-positive
    /// horizon yields nothing.
    pub async fn expiring(&self, horizon: Option<LoanPeriod>) -> AppResult<Vec<LoanDetails>> {
        let horizon = horizon.unwrap_or(LoanPeriod::weeks(1));
        if !horizon.is_positive() {
            return Ok(Vec::new());
        }
        let Some(horizon) = horizon.to_duration() else {
            return Err(AppError::Validation(format!(
                "Horizon must be at most {} days",
                LoanPeriod::MAX_DAYS
            )));
        };
        self.repository.loans.expiring(horizon).await
    }

    /// Open and overdue loan counts for the dashboard
    pub async fn open_counts(&self) -> AppResult<(i64, i64)> {
        self.repository.loans.count_open().await
    }

    pub async fn create_loanee(&self, input: CreateLoanee) -> AppResult<Loanee> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let (loanee, changes) = self
            .repository
            .loanees
            .create(input.name.trim(), input.phone.as_deref())
            .await?;
        self.sync.apply(changes).await;
        Ok(loanee)
    }

    /// A loanee's loans split into open and returned
    pub async fn loanee_loans(&self, loanee_id: i32) -> AppResult<LoaneeLoans> {
        let loanee = self.repository.loanees.get_by_id(loanee_id).await?;
        self.partitioned(loanee).await
    }

    pub async fn loanee_loans_by_name(&self, name: &str) -> AppResult<LoaneeLoans> {
        let loanee = self
            .repository
            .loanees
            .get_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loanee \"{}\" not found", name)))?;
        self.partitioned(loanee).await
    }

    pub async fn loanee_loans_by_phone(&self, phone: &str) -> AppResult<LoaneeLoans> {
        let loanee = self
            .repository
            .loanees
            .get_by_phone(phone)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No loanee with phone {}", phone)))?;
        self.partitioned(loanee).await
    }

    async fn partitioned(&self, loanee: Loanee) -> AppResult<LoaneeLoans> {
        let all = self.repository.loans.by_loanee(loanee.id).await?;
        let (current, past) = all.into_iter().partition(|loan| !loan.returned);
        Ok(LoaneeLoans { loanee, current, past })
    }
}
