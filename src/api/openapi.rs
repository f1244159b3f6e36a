//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loanees, loans, search};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblos API",
        version = "0.3.0",
        description = "Home Library Management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&SecurityAddon),
    paths(
        health::health_check,
        auth::login,
        auth::create_user,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_copies,
        books::set_copy_count,
        books::book_loans,
        books::get_book_by_isbn,
        books::author_works,
        books::list_categories,
        books::lookup_metadata,
        loans::checkout,
        loans::extend_loan,
        loans::close_loan,
        loans::expiring_loans,
        loans::loan_stats,
        loanees::create_loanee,
        loanees::loanee_loans,
        loanees::lookup_loans,
        search::search_books,
        search::search_loanees,
        search::reindex,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::models::book::Book,
        crate::models::book::BookShort,
        crate::models::book::CreateBook,
        crate::models::book::UpdateBook,
        crate::models::author::Author,
        crate::models::category::Category,
        crate::models::copy::CopyStatus,
        crate::models::copy::CopyWithStatus,
        crate::models::copy::StatusTally,
        crate::models::loan::Loan,
        crate::models::loan::LoanDetails,
        crate::models::loan::DurationUnit,
        crate::models::loanee::Loanee,
        crate::models::loanee::LoaneeLoans,
        crate::models::loanee::CreateLoanee,
        crate::models::user::LoginRequest,
        crate::models::user::CreateUser,
        crate::services::metadata::BookMetadata,
        health::HealthResponse,
        auth::LoginResponse,
        books::BookListResponse,
        books::BookUpdateResponse,
        books::SetCopyCountRequest,
        books::SetCopyCountResponse,
        books::BookLoansResponse,
        books::AuthorWorksResponse,
        loans::CheckoutRequest,
        loans::ExtendRequest,
        loans::LoanStatsResponse,
        search::ReindexResponse,
    ))
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
