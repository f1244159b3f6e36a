//! Biblos Server - Home Library Management System

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblos_server::{
    api,
    config::AppConfig,
    repository::Repository,
    search::MeiliSearchIndex,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblos_server={},tower_http=debug", config.logging.level).into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Biblos Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Connect to the search index and pin its settings
    let index = MeiliSearchIndex::new(&config.search.url, config.search.api_key.as_deref())
        .expect("Invalid search index URL");
    if let Err(e) = index.ensure_indexes().await {
        // The server still works without search; a reindex repairs it later.
        tracing::warn!("Search index unavailable at startup: {}", e);
    }

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let repository = Repository::new(pool);
    let services = Services::new(
        repository,
        Arc::new(index),
        config.auth.clone(),
        config.library.clone(),
        config.search.clone(),
    );

    services
        .users
        .ensure_initial_user()
        .await
        .expect("Failed to create initial admin account");

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Authentication
        .route("/auth/login", post(api::auth::login))
        .route("/auth/users", post(api::auth::create_user))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", axum::routing::delete(api::books::delete_book))
        .route("/books/:id/copies", get(api::books::list_copies))
        .route("/books/:id/copies", put(api::books::set_copy_count))
        .route("/books/:id/loans", get(api::books::book_loans))
        .route("/books/isbn/:isbn13", get(api::books::get_book_by_isbn))
        .route("/authors/:id/books", get(api::books::author_works))
        .route("/categories", get(api::books::list_categories))
        .route("/metadata/:isbn", get(api::books::lookup_metadata))
        // Loans
        .route("/loans", post(api::loans::checkout))
        .route("/loans/expiring", get(api::loans::expiring_loans))
        .route("/loans/stats", get(api::loans::loan_stats))
        .route("/loans/:id/extend", post(api::loans::extend_loan))
        .route("/loans/:id/close", post(api::loans::close_loan))
        // Loanees
        .route("/loanees", post(api::loanees::create_loanee))
        .route("/loanees/loans", get(api::loanees::lookup_loans))
        .route("/loanees/:id/loans", get(api::loanees::loanee_loans))
        // Search
        .route("/search/books", get(api::search::search_books))
        .route("/search/loanees", get(api::search::search_loanees))
        .route("/search/reindex", post(api::search::reindex))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
