//! Loans repository: checkout, extension, return, expiry queries

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanDetails},
        loanee::Loanee,
    },
    search::ChangeSet,
};

const ONE_OPEN_LOAN_PER_COPY: &str = "idx_loans_one_open_per_copy";

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.copy_id, c.book_id, b.title AS book_title,
           l.loanee_id, p.name AS loanee_name,
           l.out_timestamp, l.in_timestamp, l.returned
    FROM loans l
    JOIN copies c ON c.id = l.copy_id
    JOIN books b ON b.id = c.book_id
    JOIN loanees p ON p.id = l.loanee_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Check a copy of `book_id` out to a loanee resolved (or created)
    /// by name and optional phone. The whole operation is one
    /// transaction: a failure at any step leaves no half-attached loan.
    pub async fn checkout(
        &self,
        book_id: i32,
        loanee_name: &str,
        loanee_phone: Option<&str>,
        due_in: Duration,
    ) -> AppResult<(LoanDetails, ChangeSet)> {
        let mut tx = self.pool.begin().await?;
        let mut changes = ChangeSet::new();

        let book_title: String = sqlx::query_scalar("SELECT title FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        // Any copy with no open loan will do
        let copy_id: i32 = sqlx::query_scalar(
            r#"
            SELECT c.id FROM copies c
            WHERE c.book_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM loans l
                  WHERE l.copy_id = c.id AND NOT l.returned
              )
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("No available copies of \"{}\"", book_title))
        })?;

        let existing = sqlx::query_as::<_, Loanee>(
            r#"
            SELECT id, name, phone FROM loanees
            WHERE name = $1 AND ($2::text IS NULL OR phone = $2)
            LIMIT 1
            "#,
        )
        .bind(loanee_name)
        .bind(loanee_phone)
        .fetch_optional(&mut *tx)
        .await?;

        let loanee = match existing {
            Some(loanee) => loanee,
            None => {
                let id: i32 = sqlx::query_scalar(
                    "INSERT INTO loanees (name, phone) VALUES ($1, $2) RETURNING id",
                )
                .bind(loanee_name)
                .bind(loanee_phone)
                .fetch_one(&mut *tx)
                .await?;
                let loanee = Loanee {
                    id,
                    name: loanee_name.to_string(),
                    phone: loanee_phone.map(String::from),
                };
                changes.upsert(&loanee);
                loanee
            }
        };

        let today = Utc::now().date_naive();
        let due = today + due_in;

        // A concurrent checkout may have taken this copy between the
        // availability select and here; the loser of that race sees the
        // partial unique index and reports no available copies.
        let loan_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (copy_id, loanee_id, out_timestamp, in_timestamp, returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id
            "#,
        )
        .bind(copy_id)
        .bind(loanee.id)
        .bind(today)
        .bind(due)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some(ONE_OPEN_LOAN_PER_COPY) => {
                AppError::Conflict(format!("No available copies of \"{}\"", book_title))
            }
            _ => AppError::Database(e),
        })?;

        tx.commit().await?;

        let details = LoanDetails {
            id: loan_id,
            copy_id,
            book_id,
            book_title,
            loanee_id: loanee.id,
            loanee_name: loanee.name,
            out_timestamp: today,
            in_timestamp: due,
            returned: false,
        };
        Ok((details, changes))
    }

    /// Push an open loan's due date out by `delta`
    pub async fn extend(&self, loan_id: i32, delta: Duration) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.returned {
            return Err(AppError::Conflict(
                "Cannot extend a loan that has been closed".to_string(),
            ));
        }

        let new_due = loan.in_timestamp + delta;
        sqlx::query("UPDATE loans SET in_timestamp = $2 WHERE id = $1")
            .bind(loan_id)
            .bind(new_due)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Loan { in_timestamp: new_due, ..loan })
    }

    /// Close a loan: record the return date and free the copy. Closing
    /// an overdue loan is always permitted.
    pub async fn close(&self, loan_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.returned {
            return Err(AppError::Conflict("Loan is already closed".to_string()));
        }

        let today = Utc::now().date_naive();
        sqlx::query("UPDATE loans SET in_timestamp = $2, returned = TRUE WHERE id = $1")
            .bind(loan_id)
            .bind(today)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Loan { in_timestamp: today, returned: true, ..loan })
    }

    /// Open loans due within `[today, today + horizon]`, soonest first
    pub async fn expiring(&self, horizon: Duration) -> AppResult<Vec<LoanDetails>> {
        let today = Utc::now().date_naive();
        let limit: NaiveDate = today + horizon;

        Ok(sqlx::query_as::<_, LoanDetails>(&format!(
            r#"{}
            WHERE NOT l.returned
              AND l.in_timestamp >= $1
              AND l.in_timestamp <= $2
            ORDER BY l.in_timestamp
            "#,
            DETAILS_SELECT
        ))
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    /// A book's loans partitioned into open and returned
    pub async fn book_loans(&self, book_id: i32) -> AppResult<(Vec<LoanDetails>, Vec<LoanDetails>)> {
        let all = sqlx::query_as::<_, LoanDetails>(&format!(
            "{} WHERE c.book_id = $1 ORDER BY l.out_timestamp DESC",
            DETAILS_SELECT
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(all.into_iter().partition(|loan| !loan.returned))
    }

    /// All loans made by a loanee, newest first
    pub async fn by_loanee(&self, loanee_id: i32) -> AppResult<Vec<LoanDetails>> {
        Ok(sqlx::query_as::<_, LoanDetails>(&format!(
            "{} WHERE l.loanee_id = $1 ORDER BY l.out_timestamp DESC",
            DETAILS_SELECT
        ))
        .bind(loanee_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Open loan counts for the dashboard
    pub async fn count_open(&self) -> AppResult<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS open,
                   COUNT(*) FILTER (WHERE in_timestamp < CURRENT_DATE) AS overdue
            FROM loans
            WHERE NOT returned
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.get("open"), row.get("overdue")))
    }
}
