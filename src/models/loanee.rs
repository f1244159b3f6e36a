//! Loanee (patron) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::loan::LoanDetails;

/// Loanee model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loanee {
    pub id: i32,
    pub name: String,
    /// Some patrons do not provide a phone number
    pub phone: Option<String>,
}

/// A loanee's loans split into open and returned partitions
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoaneeLoans {
    pub loanee: Loanee,
    pub current: Vec<LoanDetails>,
    pub past: Vec<LoanDetails>,
}

/// Create loanee request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoanee {
    #[validate(length(min = 1, message = "Loanee must have a name"))]
    pub name: String,
    pub phone: Option<String>,
}
