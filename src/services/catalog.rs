//! Catalog management service: books, authors, categories, copy counts

use validator::Validate;

use crate::{
    config::LibraryConfig,
    error::{AppError, AppResult},
    models::{
        author::{split_author_list, Author},
        book::{Book, BookShort, CreateBook, UpdateBook},
        category::Category,
        copy::CopyWithStatus,
        loan::LoanDetails,
    },
    repository::Repository,
    search::Synchronizer,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    sync: Synchronizer,
    library: LibraryConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, sync: Synchronizer, library: LibraryConfig) -> Self {
        Self { repository, sync, library }
    }

    /// Paginated book listing with availability tallies
    pub async fn list_books(
        &self,
        page: Option<usize>,
        per_page: Option<usize>,
    ) -> AppResult<(Vec<BookShort>, i64)> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(self.library.books_per_page);
        self.repository.books.list(page, per_page).await
    }

    /// Get a book with its authors
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn get_book_by_isbn(&self, isbn_13: &str) -> AppResult<Option<Book>> {
        self.repository.books.get_by_isbn13(isbn_13).await
    }

    /// A book's copies with their derived statuses
    pub async fn get_copies(&self, book_id: i32) -> AppResult<Vec<CopyWithStatus>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.copies.list_with_status(book_id).await
    }

    /// A book's loans, open first
    pub async fn get_book_loans(
        &self,
        book_id: i32,
    ) -> AppResult<(Vec<LoanDetails>, Vec<LoanDetails>)> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.loans.book_loans(book_id).await
    }

    /// Create a book, its authors and initial copies, then mirror it
    /// into the search index.
    pub async fn create_book(&self, input: CreateBook) -> AppResult<Book> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let authors = split_author_list(&input.authors);
        if authors.is_empty() {
            return Err(AppError::Validation(
                "Book must have at least one author".to_string(),
            ));
        }

        // Out-of-range requests fall back to a single copy
        let copies = match input.copies {
            Some(n) if n > 0 && n < self.library.max_copies => n,
            _ => 1,
        };

        let (book, changes) = self.repository.books.create(&input, &authors, copies).await?;
        tracing::info!(book_id = book.id, title = %book.title, "book added to collection");
        self.sync.apply(changes).await;
        Ok(book)
    }

    /// Update a book, reconciling its copy count when one is given.
    /// Returns the book and the copy-count delta for caller reporting.
    pub async fn update_book(&self, id: i32, input: UpdateBook) -> AppResult<(Book, i64)> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let authors = match input.authors.as_deref() {
            Some(raw) => {
                let tokens = split_author_list(raw);
                if tokens.is_empty() {
                    return Err(AppError::Validation(
                        "Book must have at least one author".to_string(),
                    ));
                }
                Some(tokens)
            }
            None => None,
        };

        let (book, copy_delta, changes) = self
            .repository
            .books
            .update(id, &input, authors.as_deref(), self.library.max_copies)
            .await?;
        self.sync.apply(changes).await;
        Ok((book, copy_delta))
    }

    /// Reconcile a book's copy count to the desired total
    pub async fn set_copy_count(&self, book_id: i32, desired_total: i64) -> AppResult<i64> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository
            .copies
            .set_copy_count(book_id, desired_total, self.library.max_copies)
            .await
    }

    /// Delete a book (and, by ownership, its copies and their loan
    /// history); fails while any copy is out.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let changes = self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "book removed from collection");
        self.sync.apply(changes).await;
        Ok(())
    }

    /// An author and their works in the collection
    pub async fn author_works(&self, author_id: i32) -> AppResult<(Author, Vec<Book>)> {
        let author = self.repository.books.get_author(author_id).await?;
        let works = self.repository.books.works_by_author(author_id).await?;
        Ok((author, works))
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.books.list_categories().await
    }
}
