//! Full-text search: index contract, Meilisearch client, commit-time
//! synchronization and query primitives.
//!
//! The relational store is the source of truth; the index is a derived
//! projection kept eventually consistent by [`sync::Synchronizer`] and
//! repaired, when needed, by a full reindex.

pub mod meili;
pub mod query;
pub mod sync;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Book, Loanee};

pub use meili::MeiliSearchIndex;
pub use query::{FuzzyQuery, SearchPage, SearchPlan};
pub use sync::{ChangeSet, Synchronizer};

/// Index name for book documents
pub const BOOKS_INDEX: &str = "books";
/// Index name for loanee documents
pub const LOANEES_INDEX: &str = "loanees";

/// Error from the search index backend
#[derive(Error, Debug)]
#[error("search index: {0}")]
pub struct SearchIndexError(pub String);

impl From<meilisearch_sdk::errors::Error> for SearchIndexError {
    fn from(e: meilisearch_sdk::errors::Error) -> Self {
        SearchIndexError(e.to_string())
    }
}

/// A document stored in the full-text index. The `id` is always the
/// entity's store identifier; there is no secondary lookup path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i32,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SearchDocument {
    pub fn new(id: i32) -> Self {
        Self { id, fields: serde_json::Map::new() }
    }

    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.to_string(), serde_json::Value::String(value.into()));
        self
    }
}

/// Capability of an entity kind to be mirrored into the search index
pub trait Searchable {
    /// Index this entity kind lives in
    const INDEX: &'static str;

    /// Project the entity into its search document
    fn search_document(&self) -> SearchDocument;
}

impl Searchable for Book {
    const INDEX: &'static str = BOOKS_INDEX;

    fn search_document(&self) -> SearchDocument {
        SearchDocument::new(self.id)
            .field("title", self.title.clone())
            .field("authors", self.author_repr())
    }
}

impl Searchable for Loanee {
    const INDEX: &'static str = LOANEES_INDEX;

    fn search_document(&self) -> SearchDocument {
        SearchDocument::new(self.id).field("name", self.name.clone())
    }
}

/// Identifiers of matching documents, ordered by relevance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub ids: Vec<i32>,
    pub total: usize,
}

/// Contract for the external full-text index.
///
/// All writes are best-effort relative to the relational commit that
/// triggered them; see [`sync::Synchronizer`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert or replace documents under their store identifiers
    async fn upsert(
        &self,
        index: &'static str,
        docs: Vec<SearchDocument>,
    ) -> Result<(), SearchIndexError>;

    /// Remove a document by store identifier
    async fn delete_by_id(&self, index: &'static str, id: i32) -> Result<(), SearchIndexError>;

    /// Execute a fuzzy query, returning ids ordered by relevance and the
    /// total hit count
    async fn query(
        &self,
        index: &'static str,
        query: &FuzzyQuery,
        offset: usize,
        limit: usize,
    ) -> Result<SearchHits, SearchIndexError>;

    /// Drop every document in the index (first step of a reindex)
    async fn clear(&self, index: &'static str) -> Result<(), SearchIndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;

    #[test]
    fn test_book_projection() {
        let book = Book {
            id: 7,
            isbn_10: None,
            isbn_13: Some("9780441172719".into()),
            title: "Dune".into(),
            pages: Some(412),
            publish_date: None,
            category_id: None,
            cover: None,
            authors: vec![
                Author { id: 1, name: "Frank Herbert".into() },
                Author { id: 2, name: "Kevin J. Anderson".into() },
            ],
            category_name: None,
        };
        let doc = book.search_document();
        assert_eq!(doc.id, 7);
        assert_eq!(doc.fields["title"], "Dune");
        assert_eq!(doc.fields["authors"], "Frank Herbert, Kevin J. Anderson");
    }

    #[test]
    fn test_loanee_projection() {
        let loanee = Loanee { id: 3, name: "Paul Atreides".into(), phone: None };
        let doc = loanee.search_document();
        assert_eq!(doc.id, 3);
        assert_eq!(doc.fields["name"], "Paul Atreides");
        assert!(doc.fields.get("phone").is_none());
    }
}
