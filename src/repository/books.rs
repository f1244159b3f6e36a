//! Books repository: catalog entries, authors, categories

use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, BookShort, CreateBook, UpdateBook},
        category::{Category, MISSING_CATEGORY},
        copy::StatusTally,
    },
    search::ChangeSet,
};

use super::copies::reconcile_copy_count;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

fn book_from_row(row: &PgRow) -> Book {
    Book {
        id: row.get("id"),
        isbn_10: row.get("isbn_10"),
        isbn_13: row.get("isbn_13"),
        title: row.get("title"),
        pages: row.get("pages"),
        publish_date: row.get("publish_date"),
        category_id: row.get("category_id"),
        cover: row.get("cover"),
        authors: Vec::new(),
        category_name: row.get("category_name"),
    }
}

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.isbn_10, b.isbn_13, b.title, b.pages, b.publish_date,
           b.category_id, b.cover, c.name AS category_name
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID with authors loaded
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let row = sqlx::query(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let mut book = book_from_row(&row);
        book.authors = self
            .load_authors(&[book.id])
            .await?
            .remove(&book.id)
            .unwrap_or_default();
        Ok(book)
    }

    /// Find a book by its ISBN-13, if present
    pub async fn get_by_isbn13(&self, isbn_13: &str) -> AppResult<Option<Book>> {
        let row = sqlx::query(&format!("{} WHERE b.isbn_13 = $1", BOOK_SELECT))
            .bind(isbn_13)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut book = book_from_row(&row);
                book.authors = self
                    .load_authors(&[book.id])
                    .await?
                    .remove(&book.id)
                    .unwrap_or_default();
                Ok(Some(book))
            }
            None => Ok(None),
        }
    }

    /// Author sets for a batch of books
    async fn load_authors(&self, book_ids: &[i32]) -> AppResult<HashMap<i32, Vec<Author>>> {
        let rows = sqlx::query(
            r#"
            SELECT ba.book_id, a.id, a.name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY a.name
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<i32, Vec<Author>> = HashMap::new();
        for row in rows {
            map.entry(row.get("book_id")).or_default().push(Author {
                id: row.get("id"),
                name: row.get("name"),
            });
        }
        Ok(map)
    }

    /// Paginated book listing with availability tallies
    pub async fn list(&self, page: usize, per_page: usize) -> AppResult<(Vec<BookShort>, i64)> {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.isbn_13, b.cover, cat.name AS category_name,
                   COALESCE(au.names, '') AS authors,
                   COALESCE(t.on_shelf, 0) AS on_shelf,
                   COALESCE(t.on_loan, 0) AS on_loan,
                   COALESCE(t.missing, 0) AS missing
            FROM books b
            LEFT JOIN categories cat ON cat.id = b.category_id
            LEFT JOIN LATERAL (
                SELECT string_agg(a.name, ', ' ORDER BY a.name) AS names
                FROM book_authors ba
                JOIN authors a ON a.id = ba.author_id
                WHERE ba.book_id = b.id
            ) au ON TRUE
            LEFT JOIN LATERAL (
                SELECT COUNT(*) FILTER (WHERE l.id IS NULL) AS on_shelf,
                       COUNT(*) FILTER (WHERE l.id IS NOT NULL AND l.in_timestamp >= CURRENT_DATE) AS on_loan,
                       COUNT(*) FILTER (WHERE l.id IS NOT NULL AND l.in_timestamp < CURRENT_DATE) AS missing
                FROM copies cp
                LEFT JOIN loans l ON l.copy_id = cp.id AND NOT l.returned
                WHERE cp.book_id = b.id
            ) t ON TRUE
            ORDER BY b.title
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::try_from(per_page).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let books = rows
            .into_iter()
            .map(|row| BookShort {
                id: row.get("id"),
                title: row.get("title"),
                isbn_13: row.get("isbn_13"),
                cover: row.get("cover"),
                category_name: row.get("category_name"),
                authors: row.get("authors"),
                tally: StatusTally {
                    on_shelf: row.get("on_shelf"),
                    on_loan: row.get("on_loan"),
                    missing: row.get("missing"),
                },
            })
            .collect();

        Ok((books, total))
    }

    /// Create a book with its authors, category and initial copies.
    /// `authors` are pre-normalized name tokens; `copies` is the
    /// already-clamped initial copy count.
    pub async fn create(
        &self,
        input: &CreateBook,
        authors: &[String],
        copies: i64,
    ) -> AppResult<(Book, ChangeSet)> {
        let mut tx = self.pool.begin().await?;

        if let Some(ref isbn_13) = input.isbn_13 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn_13 = $1)")
                    .bind(isbn_13)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists {
                return Err(AppError::Conflict(format!(
                    "Book with ISBN-13 {} is already in the collection",
                    isbn_13
                )));
            }
        }

        let category_id = resolve_category(&mut tx, input.category.as_deref()).await?;

        let book_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (isbn_10, isbn_13, title, pages, publish_date, category_id, cover)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&input.isbn_10)
        .bind(&input.isbn_13)
        .bind(&input.title)
        .bind(input.pages)
        .bind(input.publish_date)
        .bind(category_id)
        .bind(&input.cover)
        .fetch_one(&mut *tx)
        .await?;

        let author_rows = attach_authors(&mut tx, book_id, authors).await?;

        sqlx::query("INSERT INTO copies (book_id) SELECT $1 FROM generate_series(1, $2)")
            .bind(book_id)
            .bind(copies)
            .execute(&mut *tx)
            .await?;

        let book = Book {
            id: book_id,
            isbn_10: input.isbn_10.clone(),
            isbn_13: input.isbn_13.clone(),
            title: input.title.clone(),
            pages: input.pages,
            publish_date: input.publish_date,
            category_id: Some(category_id),
            cover: input.cover.clone(),
            authors: author_rows,
            category_name: None,
        };

        let mut changes = ChangeSet::new();
        changes.upsert(&book);

        tx.commit().await?;
        Ok((book, changes))
    }

    /// Update a book. `authors` replaces the author set when given;
    /// a desired copy count in `input` is reconciled within the same
    /// transaction. Returns the updated book, the copy-count delta and
    /// the staged index changes.
    pub async fn update(
        &self,
        id: i32,
        input: &UpdateBook,
        authors: Option<&[String]>,
        max_copies: i64,
    ) -> AppResult<(Book, i64, ChangeSet)> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        sqlx::query(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                pages = COALESCE($3, pages),
                publish_date = COALESCE($4, publish_date),
                cover = COALESCE($5, cover)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(input.pages)
        .bind(input.publish_date)
        .bind(&input.cover)
        .execute(&mut *tx)
        .await?;

        if let Some(category) = input.category.as_deref().filter(|c| !c.trim().is_empty()) {
            let category_id = resolve_category(&mut tx, Some(category)).await?;
            sqlx::query("UPDATE books SET category_id = $2 WHERE id = $1")
                .bind(id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        let author_rows = if let Some(tokens) = authors {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            attach_authors(&mut tx, id, tokens).await?
        } else {
            load_authors_tx(&mut tx, id).await?
        };

        let copy_delta = match input.copies {
            Some(desired) => reconcile_copy_count(&mut tx, id, desired, max_copies).await?,
            None => 0,
        };

        let row = sqlx::query(
            r#"
            SELECT b.id, b.isbn_10, b.isbn_13, b.title, b.pages, b.publish_date,
                   b.category_id, b.cover, c.name AS category_name
            FROM books b
            LEFT JOIN categories c ON c.id = b.category_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let mut book = book_from_row(&row);
        book.authors = author_rows;

        let mut changes = ChangeSet::new();
        changes.upsert(&book);

        tx.commit().await?;
        Ok((book, copy_delta, changes))
    }

    /// Delete a book and, by ownership, its copies and their loan
    /// history. Fails unless every copy is on shelf.
    pub async fn delete(&self, id: i32) -> AppResult<ChangeSet> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let on_loan: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loans l
                JOIN copies c ON c.id = l.copy_id
                WHERE c.book_id = $1 AND NOT l.returned
            )
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if on_loan {
            return Err(AppError::Conflict(
                "Cannot delete a book with copies still on loan".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let mut changes = ChangeSet::new();
        changes.delete::<Book>(id);

        tx.commit().await?;
        Ok(changes)
    }

    /// Fetch books by id with optional exact filters; the caller is
    /// responsible for relevance ordering.
    pub async fn resolve_ordered(
        &self,
        ids: &[i32],
        category: Option<&str>,
        publish_year: Option<i32>,
    ) -> AppResult<Vec<Book>> {
        let rows = sqlx::query(&format!(
            r#"{}
            WHERE b.id = ANY($1)
              AND ($2::text IS NULL OR c.name = $2)
              AND ($3::int IS NULL OR EXTRACT(YEAR FROM b.publish_date)::int = $3)
            "#,
            BOOK_SELECT
        ))
        .bind(ids)
        .bind(category)
        .bind(publish_year)
        .fetch_all(&self.pool)
        .await?;

        self.with_authors(rows).await
    }

    /// Exact-predicate search path, paginated in SQL
    pub async fn find_filtered(
        &self,
        category: Option<&str>,
        publish_year: Option<i32>,
        page: usize,
        per_page: usize,
    ) -> AppResult<(Vec<Book>, i64)> {
        let filter = r#"
            WHERE ($1::text IS NULL OR c.name = $1)
              AND ($2::int IS NULL OR EXTRACT(YEAR FROM b.publish_date)::int = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*)
            FROM books b
            LEFT JOIN categories c ON c.id = b.category_id
            {}
            "#,
            filter
        ))
        .bind(category)
        .bind(publish_year)
        .fetch_one(&self.pool)
        .await?;

        let offset = page.saturating_sub(1).saturating_mul(per_page);
        let rows = sqlx::query(&format!(
            "{} {} ORDER BY b.title LIMIT $3 OFFSET $4",
            BOOK_SELECT, filter
        ))
        .bind(category)
        .bind(publish_year)
        .bind(i64::try_from(per_page).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let books = self.with_authors(rows).await?;
        Ok((books, total))
    }

    /// All works by an author, ordered by title
    pub async fn works_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let rows = sqlx::query(&format!(
            r#"{}
            JOIN book_authors ba ON ba.book_id = b.id
            WHERE ba.author_id = $1
            ORDER BY b.title
            "#,
            BOOK_SELECT
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_authors(rows).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    /// Every book with authors loaded, for a full reindex
    pub async fn all_for_reindex(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query(&format!("{} ORDER BY b.id", BOOK_SELECT))
            .fetch_all(&self.pool)
            .await?;
        self.with_authors(rows).await
    }

    async fn with_authors(&self, rows: Vec<PgRow>) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = rows.iter().map(book_from_row).collect();
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
        let mut authors = self.load_authors(&ids).await?;
        for book in &mut books {
            book.authors = authors.remove(&book.id).unwrap_or_default();
        }
        Ok(books)
    }
}

/// Resolve a category name to its id, creating it on first use. Absent
/// or blank names fall back to the reserved MISSING sentinel.
async fn resolve_category(
    tx: &mut Transaction<'_, Postgres>,
    name: Option<&str>,
) -> AppResult<i32> {
    let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => MISSING_CATEGORY,
    };

    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO categories (name) VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Get-or-create each author token and attach it to the book
async fn attach_authors(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    tokens: &[String],
) -> AppResult<Vec<Author>> {
    let mut authors = Vec::with_capacity(tokens.len());
    for token in tokens {
        let author_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO authors (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(token)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(book_id)
        .bind(author_id)
        .execute(&mut **tx)
        .await?;

        authors.push(Author { id: author_id, name: token.clone() });
    }
    Ok(authors)
}

async fn load_authors_tx(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
) -> AppResult<Vec<Author>> {
    Ok(sqlx::query_as::<_, Author>(
        r#"
        SELECT a.id, a.name
        FROM book_authors ba
        JOIN authors a ON a.id = ba.author_id
        WHERE ba.book_id = $1
        ORDER BY a.name
        "#,
    )
    .bind(book_id)
    .fetch_all(&mut **tx)
    .await?)
}
