//! Loanee (patron) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::{AppError, AppResult},
    models::loanee::{CreateLoanee, Loanee, LoaneeLoans},
    AppState,
};

use super::AuthenticatedUser;

/// Loanee lookup parameters: exactly one of name or phone
#[derive(Deserialize, IntoParams)]
pub struct LoaneeLookup {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Register a loanee
#[utoipa::path(
    post,
    path = "/loanees",
    tag = "loanees",
    security(("bearer_auth" = [])),
    request_body = CreateLoanee,
    responses(
        (status = 201, description = "Loanee created", body = Loanee),
        (status = 400, description = "Missing name")
    )
)]
pub async fn create_loanee(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<CreateLoanee>,
) -> AppResult<(StatusCode, Json<Loanee>)> {
    let loanee = state.services.circulation.create_loanee(request).await?;
    Ok((StatusCode::CREATED, Json(loanee)))
}

/// A loanee's open and past loans
#[utoipa::path(
    get,
    path = "/loanees/{id}/loans",
    tag = "loanees",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loanee ID")),
    responses(
        (status = 200, description = "Loanee with loans", body = LoaneeLoans),
        (status = 404, description = "Loanee not found")
    )
)]
pub async fn loanee_loans(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LoaneeLoans>> {
    Ok(Json(state.services.circulation.loanee_loans(id).await?))
}

/// Look a loanee up by exact name or phone and list their loans
#[utoipa::path(
    get,
    path = "/loanees/loans",
    tag = "loanees",
    security(("bearer_auth" = [])),
    params(LoaneeLookup),
    responses(
        (status = 200, description = "Loanee with loans", body = LoaneeLoans),
        (status = 400, description = "Neither name nor phone given"),
        (status = 404, description = "Loanee not found")
    )
)]
pub async fn lookup_loans(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LoaneeLookup>,
) -> AppResult<Json<LoaneeLoans>> {
    let loans = if let Some(ref name) = query.name {
        state.services.circulation.loanee_loans_by_name(name).await?
    } else if let Some(ref phone) = query.phone {
        state.services.circulation.loanee_loans_by_phone(phone).await?
    } else {
        return Err(AppError::Validation(
            "Provide a name or a phone number".to_string(),
        ));
    };
    Ok(Json(loans))
}
