//! Composite search queries mixing index-backed fuzzy predicates with
//! store-backed exact predicates.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A fuzzy predicate executed against the index. Typo tolerance is a
/// fixed index setting (edit distance 1), not part of the query.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyQuery {
    pub text: String,
    /// Restrict matching to these document fields; `None` searches all
    pub fields: Option<Vec<String>>,
}

/// Book search parameters as received from the API
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookSearchRequest {
    /// Fuzzy match on the title field
    pub title: Option<String>,
    /// Fuzzy match on author names
    pub author: Option<String>,
    /// Fuzzy match across all indexed fields
    pub keyword: Option<String>,
    /// Exact match on category name
    pub category: Option<String>,
    /// Exact match on publication year
    pub publish_year: Option<i32>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// A search request resolved into its fuzzy and exact parts. Each
/// fuzzy predicate is a separate index query restricted to its own
/// field; a document must match all of them.
#[derive(Debug, Clone, Default)]
pub struct SearchPlan {
    pub fuzzy: Vec<FuzzyQuery>,
    pub category: Option<String>,
    pub publish_year: Option<i32>,
    described: Vec<String>,
}

impl SearchPlan {
    pub fn from_request(req: &BookSearchRequest) -> Self {
        let mut plan = SearchPlan::default();

        if let Some(title) = non_empty(&req.title) {
            plan.fuzzy.push(FuzzyQuery {
                text: title.to_string(),
                fields: Some(vec!["title".into()]),
            });
            plan.described.push(format!("Title: {}", title));
        }
        if let Some(author) = non_empty(&req.author) {
            plan.fuzzy.push(FuzzyQuery {
                text: author.to_string(),
                fields: Some(vec!["authors".into()]),
            });
            plan.described.push(format!("Author(s): {}", author));
        }
        if let Some(keyword) = non_empty(&req.keyword) {
            plan.fuzzy.push(FuzzyQuery {
                text: keyword.to_string(),
                fields: None,
            });
            plan.described.push(format!("Keyword: {}", keyword));
        }

        if let Some(category) = non_empty(&req.category) {
            plan.category = Some(category.to_string());
            plan.described.push(format!("Category: {}", category));
        }
        if let Some(year) = req.publish_year {
            plan.publish_year = Some(year);
            plan.described.push(format!("Publication Year: {}", year));
        }

        plan
    }

    pub fn has_fuzzy(&self) -> bool {
        !self.fuzzy.is_empty()
    }

    pub fn has_exact(&self) -> bool {
        self.category.is_some() || self.publish_year.is_some()
    }

    /// No predicate at all: the search is a no-op returning nothing,
    /// never the whole collection.
    pub fn is_empty(&self) -> bool {
        !self.has_fuzzy() && !self.has_exact()
    }

    /// Human-readable summary of the predicates, for result headers
    pub fn describe(&self) -> String {
        self.described.join(", ")
    }
}

fn non_empty(opt: &Option<String>) -> Option<&str> {
    opt.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// One page of search results with the pre-pagination total
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub query: String,
}

impl<T> SearchPage<T> {
    pub fn empty(page: usize, per_page: usize, query: String) -> Self {
        Self { items: Vec::new(), total: 0, page, per_page, query }
    }
}

/// Conjunction of two ranked hit lists: keep only ids also present in
/// `other`, preserving `primary`'s relevance order.
pub fn intersect_ranked(primary: Vec<i32>, other: &[i32]) -> Vec<i32> {
    let keep: HashSet<i32> = other.iter().copied().collect();
    primary.into_iter().filter(|id| keep.contains(id)).collect()
}

/// Reorder store rows to match the index's relevance ordering. Rows
/// whose id does not appear in `ids` sink to the end (they can only
/// come from the exact-predicate path).
pub fn order_by_rank<T>(mut rows: Vec<T>, ids: &[i32], id_of: impl Fn(&T) -> i32) -> Vec<T> {
    let rank: HashMap<i32, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    rows.sort_by_key(|row| rank.get(&id_of(row)).copied().unwrap_or(usize::MAX));
    rows
}

/// In-memory pagination of a filtered result set (1-based page numbers)
pub fn page_slice<T>(rows: Vec<T>, page: usize, per_page: usize) -> Vec<T> {
    let start = page.saturating_sub(1).saturating_mul(per_page);
    rows.into_iter().skip(start).take(per_page).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_title_and_author_are_separate_predicates() {
        // Each predicate matches only its own field; the title text
        // never leaks into the authors field and vice versa.
        let req = BookSearchRequest {
            title: Some("Dune".into()),
            author: Some("Herbert".into()),
            ..Default::default()
        };
        let plan = SearchPlan::from_request(&req);
        assert_eq!(plan.fuzzy.len(), 2);
        assert_eq!(plan.fuzzy[0].text, "Dune");
        assert_eq!(plan.fuzzy[0].fields, Some(vec!["title".into()]));
        assert_eq!(plan.fuzzy[1].text, "Herbert");
        assert_eq!(plan.fuzzy[1].fields, Some(vec!["authors".into()]));
        assert!(!plan.has_exact());
    }

    #[test]
    fn test_plan_keyword_searches_all_fields() {
        let req = BookSearchRequest {
            title: Some("Dune".into()),
            keyword: Some("desert".into()),
            ..Default::default()
        };
        let plan = SearchPlan::from_request(&req);
        assert_eq!(plan.fuzzy.len(), 2);
        assert_eq!(plan.fuzzy[1].fields, None);
    }

    #[test]
    fn test_intersect_ranked_is_conjunctive() {
        // Primary rank order survives; ids missing from either side drop
        assert_eq!(intersect_ranked(vec![5, 3, 9], &[9, 5]), vec![5, 9]);
        assert_eq!(intersect_ranked(vec![5, 3, 9], &[]), Vec::<i32>::new());
        assert_eq!(intersect_ranked(vec![], &[1, 2]), Vec::<i32>::new());
    }

    #[test]
    fn test_plan_empty_request() {
        let plan = SearchPlan::from_request(&BookSearchRequest::default());
        assert!(plan.is_empty());

        // Whitespace-only inputs count as absent
        let req = BookSearchRequest { title: Some("   ".into()), ..Default::default() };
        assert!(SearchPlan::from_request(&req).is_empty());
    }

    #[test]
    fn test_plan_exact_only() {
        let req = BookSearchRequest {
            category: Some("Sci-Fi".into()),
            publish_year: Some(1965),
            ..Default::default()
        };
        let plan = SearchPlan::from_request(&req);
        assert!(!plan.has_fuzzy());
        assert!(plan.has_exact());
        assert_eq!(plan.describe(), "Category: Sci-Fi, Publication Year: 1965");
    }

    #[test]
    fn test_order_by_rank_preserves_index_order() {
        // Store returns rows in id order; index ranked them 3, 1, 2.
        let rows = vec![1, 2, 3];
        let ordered = order_by_rank(rows, &[3, 1, 2], |id| *id);
        assert_eq!(ordered, vec![3, 1, 2]);
    }

    #[test]
    fn test_order_by_rank_unranked_rows_sink() {
        let rows = vec![5, 9, 7];
        let ordered = order_by_rank(rows, &[7, 5], |id| *id);
        assert_eq!(ordered, vec![7, 5, 9]);
    }

    #[test]
    fn test_page_slice() {
        let rows: Vec<i32> = (1..=25).collect();
        assert_eq!(page_slice(rows.clone(), 1, 10), (1..=10).collect::<Vec<_>>());
        assert_eq!(page_slice(rows.clone(), 3, 10), (21..=25).collect::<Vec<_>>());
        assert!(page_slice(rows, 4, 10).is_empty());
    }

    #[test]
    fn test_page_slice_huge_page_does_not_overflow() {
        let rows: Vec<i32> = (1..=5).collect();
        assert!(page_slice(rows, usize::MAX, usize::MAX).is_empty());
    }
}
