//! Loan lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::loan::{DurationUnit, Loan, LoanDetails, LoanPeriod},
    AppState,
};

use super::AuthenticatedUser;

/// Checkout request
#[derive(Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub book_id: i32,
    /// Loanee name; an existing loanee is matched, otherwise created
    pub loanee_name: String,
    pub loanee_phone: Option<String>,
    /// Loan duration; defaults to the configured duration
    pub length: Option<i64>,
    pub unit: Option<DurationUnit>,
}

/// Loan extension request
#[derive(Deserialize, ToSchema)]
pub struct ExtendRequest {
    pub length: i64,
    pub unit: DurationUnit,
}

/// Expiring-loans query parameters
#[derive(Deserialize, IntoParams)]
pub struct ExpiringQuery {
    /// Horizon length; defaults to 1 week
    pub length: Option<i64>,
    pub unit: Option<DurationUnit>,
}

fn period_from(length: Option<i64>, unit: Option<DurationUnit>) -> Option<LoanPeriod> {
    length.map(|length| LoanPeriod {
        length,
        unit: unit.unwrap_or(DurationUnit::Days),
    })
}

/// Check a copy of a book out to a loanee
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Copy checked out", body = LoanDetails),
        (status = 400, description = "Invalid loan duration"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No available copies")
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let details = state
        .services
        .circulation
        .checkout(
            request.book_id,
            &request.loanee_name,
            request.loanee_phone.as_deref(),
            period_from(request.length, request.unit),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Extend an open loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ExtendRequest,
    responses(
        (status = 200, description = "Due date extended", body = Loan),
        (status = 400, description = "Invalid extension duration"),
        (status = 409, description = "Loan already closed")
    )
)]
pub async fn extend_loan(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<ExtendRequest>,
) -> AppResult<Json<Loan>> {
    let period = LoanPeriod { length: request.length, unit: request.unit };
    Ok(Json(state.services.circulation.extend(id, period).await?))
}

/// Close a loan and return its copy to the shelf
#[utoipa::path(
    post,
    path = "/loans/{id}/close",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan closed", body = Loan),
        (status = 409, description = "Loan already closed")
    )
)]
pub async fn close_loan(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    Ok(Json(state.services.circulation.close(id).await?))
}

/// Open and overdue loan counts
#[derive(Serialize, ToSchema)]
pub struct LoanStatsResponse {
    pub open: i64,
    pub overdue: i64,
}

/// How many loans are out, and how many of those are past due
#[utoipa::path(
    get,
    path = "/loans/stats",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Open loan counts", body = LoanStatsResponse)
    )
)]
pub async fn loan_stats(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<LoanStatsResponse>> {
    let (open, overdue) = state.services.circulation.open_counts().await?;
    Ok(Json(LoanStatsResponse { open, overdue }))
}

/// Open loans due within the horizon, soonest first
#[utoipa::path(
    get,
    path = "/loans/expiring",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(ExpiringQuery),
    responses(
        (status = 200, description = "Loans due soon", body = Vec<LoanDetails>)
    )
)]
pub async fn expiring_loans(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .circulation
        .expiring(period_from(query.length, query.unit))
        .await?;
    Ok(Json(loans))
}
