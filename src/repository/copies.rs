//! Copies repository: copy-count reconciliation and derived status

use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::copy::{CopyStatus, CopyWithStatus},
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Reconcile a book's copy collection to `desired_total`. Returns
    /// the number of copies created (positive) or deleted (negative);
    /// 0 when nothing changed.
    pub async fn set_copy_count(
        &self,
        book_id: i32,
        desired_total: i64,
        max_allowed: i64,
    ) -> AppResult<i64> {
        let mut tx = self.pool.begin().await?;
        let delta = reconcile_copy_count(&mut tx, book_id, desired_total, max_allowed).await?;
        tx.commit().await?;
        Ok(delta)
    }

    /// All copies of a book with their derived status
    pub async fn list_with_status(&self, book_id: i32) -> AppResult<Vec<CopyWithStatus>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.book_id, l.in_timestamp AS open_due
            FROM copies c
            LEFT JOIN loans l ON l.copy_id = c.id AND NOT l.returned
            WHERE c.book_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        let today = Utc::now().date_naive();
        Ok(rows
            .into_iter()
            .map(|row| {
                let open_due: Option<NaiveDate> = row.get("open_due");
                CopyWithStatus {
                    id: row.get("id"),
                    book_id: row.get("book_id"),
                    status: CopyStatus::classify(open_due, today),
                }
            })
            .collect())
    }
}

/// Copy-count reconciliation inside an open transaction, shared by the
/// standalone operation and book updates.
///
/// Increase fails when `desired_total` exceeds `max_allowed`; decrease
/// fails when fewer copies are available (not on loan) than must go.
/// Deleting every copy is not reachable through reconciliation and
/// surfaces as an internal error, as does a deletion that removes fewer
/// rows than requested despite the availability check.
pub(crate) async fn reconcile_copy_count(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    desired_total: i64,
    max_allowed: i64,
) -> AppResult<i64> {
    if desired_total < 0 {
        return Err(AppError::Validation(
            "Copy count cannot be negative".to_string(),
        ));
    }

    let current_total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM copies WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&mut **tx)
            .await?;

    if desired_total == current_total {
        return Ok(0);
    }

    if desired_total > current_total {
        if desired_total > max_allowed {
            return Err(AppError::Validation(format!(
                "Total number of copies exceeds the maximum of {}",
                max_allowed
            )));
        }
        let to_create = desired_total - current_total;
        sqlx::query("INSERT INTO copies (book_id) SELECT $1 FROM generate_series(1, $2)")
            .bind(book_id)
            .bind(to_create)
            .execute(&mut **tx)
            .await?;
        return Ok(to_create);
    }

    let to_delete = current_total - desired_total;

    let available: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM copies c
        WHERE c.book_id = $1
          AND NOT EXISTS (
              SELECT 1 FROM loans l
              WHERE l.copy_id = c.id AND NOT l.returned
          )
        "#,
    )
    .bind(book_id)
    .fetch_one(&mut **tx)
    .await?;

    if available < to_delete {
        return Err(AppError::Conflict(
            "Cannot delete more copies than are available".to_string(),
        ));
    }

    if to_delete >= current_total {
        return Err(AppError::Internal(format!(
            "Copy reconciliation asked to delete {} of {} copies of book {}",
            to_delete, current_total, book_id
        )));
    }

    // Arbitrary selection among copies with no open loan; closed loans
    // go with their copy (cascade).
    let deleted = sqlx::query(
        r#"
        DELETE FROM copies
        WHERE id IN (
            SELECT c.id FROM copies c
            WHERE c.book_id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM loans l
                  WHERE l.copy_id = c.id AND NOT l.returned
              )
            LIMIT $2
        )
        "#,
    )
    .bind(book_id)
    .bind(to_delete)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if deleted as i64 != to_delete {
        return Err(AppError::Internal(format!(
            "Deleted {} copies of book {} but {} were requested",
            deleted, book_id, to_delete
        )));
    }

    Ok(-to_delete)
}
