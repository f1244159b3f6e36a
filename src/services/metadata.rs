//! ISBN metadata lookup against Open Library.
//!
//! External collaborator of the catalog core: its result prefills a
//! book form, nothing more. A failed lookup never blocks manual entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

const OPENLIBRARY_URL: &str = "https://openlibrary.org/api/books";

/// Parsed metadata for prefilling a book form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookMetadata {
    pub isbn_13: String,
    pub title: String,
    pub authors: String,
    pub pages: Option<i32>,
    /// Raw publish date string as reported by the catalog
    pub publish_date: Option<String>,
    pub cover: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryBook {
    title: String,
    authors: Option<Vec<OpenLibraryAuthor>>,
    number_of_pages: Option<i32>,
    publish_date: Option<String>,
    cover: Option<OpenLibraryCover>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryCover {
    medium: Option<String>,
    large: Option<String>,
}

#[derive(Clone)]
pub struct MetadataService {
    client: reqwest::Client,
}

impl Default for MetadataService {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataService {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }

    /// Look an ISBN up in Open Library
    pub async fn lookup(&self, isbn: &str) -> AppResult<BookMetadata> {
        let isbn: String = isbn.chars().filter(|c| c.is_ascii_digit() || *c == 'X').collect();
        if isbn.len() != 10 && isbn.len() != 13 {
            return Err(AppError::Validation(format!("Invalid ISBN: {}", isbn)));
        }

        let url = format!(
            "{}?bibkeys=ISBN:{}&format=json&jscmd=data",
            OPENLIBRARY_URL, isbn
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Open Library request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Open Library returned status {}",
                response.status()
            )));
        }

        let mut books: HashMap<String, OpenLibraryBook> = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid Open Library response: {}", e)))?;

        let book = books
            .remove(&format!("ISBN:{}", isbn))
            .ok_or_else(|| AppError::NotFound(format!("No metadata for ISBN {}", isbn)))?;

        let authors = book
            .authors
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.name)
            .collect::<Vec<_>>()
            .join(", ");

        Ok(BookMetadata {
            isbn_13: isbn,
            title: book.title,
            authors,
            pages: book.number_of_pages,
            publish_date: book.publish_date,
            cover: book.cover.and_then(|c| c.medium.or(c.large)),
        })
    }
}
