//! Book (catalog entry) model and request types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::Author;
use super::copy::StatusTally;

/// Full book model (DB + API)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub isbn_10: Option<String>,
    /// Unique when present; older books may not have one
    pub isbn_13: Option<String>,
    pub title: String,
    pub pages: Option<i32>,
    pub publish_date: Option<NaiveDate>,
    pub category_id: Option<i32>,
    pub cover: Option<String>,
    // Relations (loaded separately)
    #[sqlx(skip)]
    #[serde(default)]
    pub authors: Vec<Author>,
    #[sqlx(skip)]
    #[serde(default)]
    pub category_name: Option<String>,
}

impl Book {
    /// Comma-joined author names, as projected into the search index
    pub fn author_repr(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Short book representation for lists, with copy availability tallies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub isbn_13: Option<String>,
    pub cover: Option<String>,
    pub category_name: Option<String>,
    pub authors: String,
    pub tally: StatusTally,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Book must have a title"))]
    pub title: String,
    /// Comma-separated author names; at least one required
    #[validate(length(min = 1, message = "Book must have at least one author"))]
    pub authors: String,
    #[validate(length(equal = 10, message = "ISBN-10 must be 10 characters"))]
    pub isbn_10: Option<String>,
    #[validate(length(equal = 13, message = "ISBN-13 must be 13 characters"))]
    pub isbn_13: Option<String>,
    pub pages: Option<i32>,
    pub publish_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub cover: Option<String>,
    /// Initial number of copies; clamped to 1 when out of range
    pub copies: Option<i64>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Book must have a title"))]
    pub title: Option<String>,
    /// Comma-separated author names; replaces the current set when given
    pub authors: Option<String>,
    pub pages: Option<i32>,
    pub publish_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub cover: Option<String>,
    /// Desired total copy count; reconciled against the current total
    pub copies: Option<i64>,
}

/// Book list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}
