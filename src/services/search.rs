//! Search façade: composes index-backed fuzzy predicates with
//! store-backed exact predicates into one paginated result.

use std::sync::Arc;

use crate::{
    config::{LibraryConfig, SearchConfig},
    error::{AppError, AppResult},
    models::{book::Book, loanee::Loanee},
    repository::Repository,
    search::{
        query::{
            intersect_ranked, order_by_rank, page_slice, BookSearchRequest, FuzzyQuery,
            SearchPage, SearchPlan,
        },
        Searchable, SearchIndex, BOOKS_INDEX, LOANEES_INDEX,
    },
};

#[derive(Clone)]
pub struct SearchService {
    repository: Repository,
    index: Arc<dyn SearchIndex>,
    config: SearchConfig,
    library: LibraryConfig,
}

impl SearchService {
    pub fn new(
        repository: Repository,
        index: Arc<dyn SearchIndex>,
        config: SearchConfig,
        library: LibraryConfig,
    ) -> Self {
        Self { repository, index, config, library }
    }

    /// Execute a composite book search.
    ///
    /// Fuzzy predicates run against the index first; hits are then
    /// re-resolved against the store in relevance order and narrowed by
    /// any exact predicates. With no predicates at all the result is
    /// empty, never the whole collection.
    pub async fn search_books(&self, request: &BookSearchRequest) -> AppResult<SearchPage<Book>> {
        let plan = SearchPlan::from_request(request);
        let page = request.page.unwrap_or(1).max(1);
        let per_page = request
            .per_page
            .unwrap_or(self.library.books_per_page)
            .max(1);

        if plan.is_empty() {
            return Ok(SearchPage::empty(page, per_page, plan.describe()));
        }

        if plan.has_fuzzy() {
            // One index query per predicate, then a conjunctive
            // intersection keeping the first predicate's ranking.
            let mut ranked: Option<Vec<i32>> = None;
            for fuzzy in &plan.fuzzy {
                let hits = self
                    .index
                    .query(BOOKS_INDEX, fuzzy, 0, self.config.max_candidates)
                    .await
                    .map_err(|e| AppError::Search(e.to_string()))?;
                ranked = Some(match ranked {
                    None => hits.ids,
                    Some(primary) => intersect_ranked(primary, &hits.ids),
                });
            }
            let ranked = ranked.unwrap_or_default();

            // Hits whose id no longer resolves in the store are orphans
            // and drop out here.
            let books = self
                .repository
                .books
                .resolve_ordered(&ranked, plan.category.as_deref(), plan.publish_year)
                .await?;
            let ordered = order_by_rank(books, &ranked, |b| b.id);
            let total = ordered.len();

            return Ok(SearchPage {
                items: page_slice(ordered, page, per_page),
                total,
                page,
                per_page,
                query: plan.describe(),
            });
        }

        // Exact predicates only: filter and paginate in the store
        let (items, total) = self
            .repository
            .books
            .find_filtered(plan.category.as_deref(), plan.publish_year, page, per_page)
            .await?;

        Ok(SearchPage {
            items,
            total: total as usize,
            page,
            per_page,
            query: plan.describe(),
        })
    }

    /// Fuzzy loanee lookup by name, for the checkout form
    pub async fn search_loanees(&self, name: &str) -> AppResult<Vec<Loanee>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let fuzzy = FuzzyQuery {
            text: name.to_string(),
            fields: Some(vec!["name".to_string()]),
        };
        let hits = self
            .index
            .query(LOANEES_INDEX, &fuzzy, 0, self.library.loans_per_page)
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;

        let loanees = self.repository.loanees.resolve(&hits.ids).await?;
        Ok(order_by_rank(loanees, &hits.ids, |l| l.id))
    }

    /// Rebuild both indexes from the store. This is the recovery path
    /// for index writes lost after a commit; it clears each index and
    /// re-upserts every searchable row.
    pub async fn reindex_all(&self) -> AppResult<(usize, usize)> {
        let books = self.repository.books.all_for_reindex().await?;
        let loanees = self.repository.loanees.all_for_reindex().await?;

        self.index
            .clear(BOOKS_INDEX)
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;
        let book_docs: Vec<_> = books.iter().map(Searchable::search_document).collect();
        let book_count = book_docs.len();
        self.index
            .upsert(BOOKS_INDEX, book_docs)
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;

        self.index
            .clear(LOANEES_INDEX)
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;
        let loanee_docs: Vec<_> = loanees.iter().map(Searchable::search_document).collect();
        let loanee_count = loanee_docs.len();
        self.index
            .upsert(LOANEES_INDEX, loanee_docs)
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;

        tracing::info!(books = book_count, loanees = loanee_count, "search index rebuilt");
        Ok((book_count, loanee_count))
    }
}
