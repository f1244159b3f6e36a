//! Biblos Library Management System
//!
//! A Rust server for tracking a small library's books, copies, authors,
//! categories and loans, with keyword/fuzzy search backed by an
//! external full-text index.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod search;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
