//! Meilisearch implementation of the search index contract

use async_trait::async_trait;
use meilisearch_sdk::client::Client;
use meilisearch_sdk::settings::{MinWordSizeForTypos, TypoToleranceSettings};

use super::{
    FuzzyQuery, SearchDocument, SearchHits, SearchIndex, SearchIndexError, BOOKS_INDEX,
    LOANEES_INDEX,
};

/// Meilisearch-backed search index
#[derive(Clone)]
pub struct MeiliSearchIndex {
    client: Client,
}

impl MeiliSearchIndex {
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self, SearchIndexError> {
        let client = Client::new(url, api_key)?;
        Ok(Self { client })
    }

    /// Create the indexes and pin typo tolerance to a single-character
    /// edit: words of 3+ characters tolerate one typo, never two.
    pub async fn ensure_indexes(&self) -> Result<(), SearchIndexError> {
        for name in [BOOKS_INDEX, LOANEES_INDEX] {
            // Already-existing indexes make this a no-op task.
            let task = self.client.create_index(name, Some("id")).await?;
            task.wait_for_completion(&self.client, None, None).await?;

            let tolerance = TypoToleranceSettings {
                enabled: Some(true),
                disable_on_words: None,
                disable_on_attributes: None,
                disable_on_numbers: None,
                min_word_size_for_typos: Some(MinWordSizeForTypos {
                    one_typo: Some(3),
                    two_typos: Some(255),
                }),
            };
            self.client.index(name).set_typo_tolerance(&tolerance).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for MeiliSearchIndex {
    async fn upsert(
        &self,
        index: &'static str,
        docs: Vec<SearchDocument>,
    ) -> Result<(), SearchIndexError> {
        self.client
            .index(index)
            .add_or_replace(&docs, Some("id"))
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, index: &'static str, id: i32) -> Result<(), SearchIndexError> {
        self.client.index(index).delete_document(id).await?;
        Ok(())
    }

    async fn query(
        &self,
        index: &'static str,
        query: &FuzzyQuery,
        offset: usize,
        limit: usize,
    ) -> Result<SearchHits, SearchIndexError> {
        let index = self.client.index(index);
        let mut search = index.search();
        search
            .with_query(&query.text)
            .with_offset(offset)
            .with_limit(limit);

        let field_refs: Vec<&str>;
        if let Some(ref fields) = query.fields {
            field_refs = fields.iter().map(String::as_str).collect();
            search.with_attributes_to_search_on(&field_refs);
        }

        let results = search.execute::<SearchDocument>().await?;
        let total = results
            .estimated_total_hits
            .or(results.total_hits)
            .unwrap_or(results.hits.len());

        Ok(SearchHits {
            ids: results.hits.into_iter().map(|hit| hit.result.id).collect(),
            total,
        })
    }

    async fn clear(&self, index: &'static str) -> Result<(), SearchIndexError> {
        self.client.index(index).delete_all_documents().await?;
        Ok(())
    }
}
