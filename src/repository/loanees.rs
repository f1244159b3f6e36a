//! Loanees repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loanee::Loanee,
    search::ChangeSet,
};

#[derive(Clone)]
pub struct LoaneesRepository {
    pool: Pool<Postgres>,
}

impl LoaneesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Loanee> {
        sqlx::query_as::<_, Loanee>("SELECT id, name, phone FROM loanees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loanee with id {} not found", id)))
    }

    /// Exact name match; finds at most one loanee
    pub async fn get_by_name(&self, name: &str) -> AppResult<Option<Loanee>> {
        Ok(sqlx::query_as::<_, Loanee>(
            "SELECT id, name, phone FROM loanees WHERE name = $1 LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Exact phone match; finds at most one loanee
    pub async fn get_by_phone(&self, phone: &str) -> AppResult<Option<Loanee>> {
        Ok(sqlx::query_as::<_, Loanee>(
            "SELECT id, name, phone FROM loanees WHERE phone = $1 LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Create a loanee, staging the index upsert
    pub async fn create(&self, name: &str, phone: Option<&str>) -> AppResult<(Loanee, ChangeSet)> {
        let id: i32 =
            sqlx::query_scalar("INSERT INTO loanees (name, phone) VALUES ($1, $2) RETURNING id")
                .bind(name)
                .bind(phone)
                .fetch_one(&self.pool)
                .await?;

        let loanee = Loanee {
            id,
            name: name.to_string(),
            phone: phone.map(String::from),
        };
        let mut changes = ChangeSet::new();
        changes.upsert(&loanee);
        Ok((loanee, changes))
    }

    /// Fetch loanees by id, for re-resolving fuzzy search hits
    pub async fn resolve(&self, ids: &[i32]) -> AppResult<Vec<Loanee>> {
        Ok(
            sqlx::query_as::<_, Loanee>("SELECT id, name, phone FROM loanees WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Every loanee, for a full reindex
    pub async fn all_for_reindex(&self) -> AppResult<Vec<Loanee>> {
        Ok(
            sqlx::query_as::<_, Loanee>("SELECT id, name, phone FROM loanees ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
