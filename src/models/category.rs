//! Category model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Reserved sentinel category assigned to books without one.
/// Seeded by the initial migration.
pub const MISSING_CATEGORY: &str = "MISSING";

/// Category model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
}
