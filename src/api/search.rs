//! Search endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{book::Book, loanee::Loanee},
    search::query::{BookSearchRequest, SearchPage},
    AppState,
};

use super::AuthenticatedUser;

/// Loanee name search parameters
#[derive(Deserialize, IntoParams)]
pub struct LoaneeSearchQuery {
    pub name: String,
}

/// Reindex result counts
#[derive(Serialize, ToSchema)]
pub struct ReindexResponse {
    pub books: usize,
    pub loanees: usize,
}

/// Composite book search: fuzzy title/author/keyword predicates plus
/// exact category/year filters
#[utoipa::path(
    get,
    path = "/search/books",
    tag = "search",
    security(("bearer_auth" = [])),
    params(BookSearchRequest),
    responses(
        (status = 200, description = "Paginated matches", body = Object),
        (status = 502, description = "Search index unavailable")
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(request): Query<BookSearchRequest>,
) -> AppResult<Json<SearchPage<Book>>> {
    Ok(Json(state.services.search.search_books(&request).await?))
}

/// Fuzzy loanee lookup by name
#[utoipa::path(
    get,
    path = "/search/loanees",
    tag = "search",
    security(("bearer_auth" = [])),
    params(LoaneeSearchQuery),
    responses(
        (status = 200, description = "Matching loanees", body = Vec<Loanee>)
    )
)]
pub async fn search_loanees(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<LoaneeSearchQuery>,
) -> AppResult<Json<Vec<Loanee>>> {
    Ok(Json(state.services.search.search_loanees(&query.name).await?))
}

/// Rebuild the search indexes from the store
#[utoipa::path(
    post,
    path = "/search/reindex",
    tag = "search",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Indexes rebuilt", body = ReindexResponse),
        (status = 502, description = "Search index unavailable")
    )
)]
pub async fn reindex(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ReindexResponse>> {
    let (books, loanees) = state.services.search.reindex_all().await?;
    Ok(Json(ReindexResponse { books, loanees }))
}
