//! Catalog endpoints: books, copies, metadata lookup

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, BookQuery, BookShort, CreateBook, UpdateBook},
        category::Category,
        copy::CopyWithStatus,
        loan::LoanDetails,
    },
    services::metadata::BookMetadata,
    AppState,
};

use super::AuthenticatedUser;

/// Paginated book listing
#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookShort>,
    pub total: i64,
}

/// Book with the copy-count delta from an update
#[derive(Serialize, ToSchema)]
pub struct BookUpdateResponse {
    pub book: Book,
    /// Copies created (positive) or deleted (negative) by this update
    pub copy_delta: i64,
}

/// Desired copy total for a book
#[derive(Deserialize, ToSchema)]
pub struct SetCopyCountRequest {
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct SetCopyCountResponse {
    pub copy_delta: i64,
}

/// A book's loans, open and past
#[derive(Serialize, ToSchema)]
pub struct BookLoansResponse {
    pub current: Vec<LoanDetails>,
    pub past: Vec<LoanDetails>,
}

/// List books with availability tallies
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Paginated book list", body = BookListResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<BookListResponse>> {
    let (books, total) = state
        .services
        .catalog
        .list_books(query.page, query.per_page)
        .await?;
    Ok(Json(BookListResponse { books, total }))
}

/// Get a book with its authors
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book detail", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.services.catalog.get_book(id).await?))
}

/// Add a book to the collection
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing title or authors"),
        (status = 409, description = "ISBN-13 already in collection")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update a book; a `copies` value reconciles the copy count
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookUpdateResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Cannot delete more copies than are available")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBook>,
) -> AppResult<Json<BookUpdateResponse>> {
    let (book, copy_delta) = state.services.catalog.update_book(id, request).await?;
    Ok(Json(BookUpdateResponse { book, copy_delta }))
}

/// Delete a book; fails while any copy is out on loan
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies still on loan")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a book's copies with derived statuses
#[utoipa::path(
    get,
    path = "/books/{id}/copies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copies with statuses", body = Vec<CopyWithStatus>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_copies(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<CopyWithStatus>>> {
    Ok(Json(state.services.catalog.get_copies(id).await?))
}

/// Reconcile a book's copy count to a desired total
#[utoipa::path(
    put,
    path = "/books/{id}/copies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = SetCopyCountRequest,
    responses(
        (status = 200, description = "Copy count reconciled", body = SetCopyCountResponse),
        (status = 400, description = "Desired total exceeds the maximum"),
        (status = 409, description = "Cannot delete more copies than are available")
    )
)]
pub async fn set_copy_count(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SetCopyCountRequest>,
) -> AppResult<Json<SetCopyCountResponse>> {
    let copy_delta = state
        .services
        .catalog
        .set_copy_count(id, request.total)
        .await?;
    Ok(Json(SetCopyCountResponse { copy_delta }))
}

/// A book's loan history
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Open and past loans", body = BookLoansResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_loans(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookLoansResponse>> {
    let (current, past) = state.services.catalog.get_book_loans(id).await?;
    Ok(Json(BookLoansResponse { current, past }))
}

/// An author and their works
#[derive(Serialize, ToSchema)]
pub struct AuthorWorksResponse {
    pub author: Author,
    pub works: Vec<Book>,
}

/// Find a book by its ISBN-13
#[utoipa::path(
    get,
    path = "/books/isbn/{isbn13}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("isbn13" = String, Path, description = "ISBN-13")),
    responses(
        (status = 200, description = "Book detail", body = Book),
        (status = 404, description = "No book with this ISBN-13")
    )
)]
pub async fn get_book_by_isbn(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(isbn13): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state
        .services
        .catalog
        .get_book_by_isbn(&isbn13)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No book with ISBN-13 {}", isbn13)))?;
    Ok(Json(book))
}

/// All works by an author
#[utoipa::path(
    get,
    path = "/authors/{id}/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author and works", body = AuthorWorksResponse),
        (status = 404, description = "Author not found")
    )
)]
pub async fn author_works(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorWorksResponse>> {
    let (author, works) = state.services.catalog.author_works(id).await?;
    Ok(Json(AuthorWorksResponse { author, works }))
}

/// All categories, including the MISSING sentinel
#[utoipa::path(
    get,
    path = "/categories",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category list", body = Vec<Category>)
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.services.catalog.list_categories().await?))
}

/// Look up book metadata by ISBN in Open Library
#[utoipa::path(
    get,
    path = "/metadata/{isbn}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("isbn" = String, Path, description = "ISBN-10 or ISBN-13")),
    responses(
        (status = 200, description = "Metadata found", body = BookMetadata),
        (status = 404, description = "No metadata for this ISBN")
    )
)]
pub async fn lookup_metadata(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(isbn): Path<String>,
) -> AppResult<Json<BookMetadata>> {
    Ok(Json(state.services.metadata.lookup(&isbn).await?))
}
