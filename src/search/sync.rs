//! Commit-time index synchronization.
//!
//! Repository operations that touch searchable entities build a
//! transaction-scoped [`ChangeSet`] while the transaction is open and
//! return it to the caller. The service layer applies the set to the
//! index only after the transaction has durably committed. Index
//! failures at that point are logged and left for a full reindex to
//! repair; the relational commit is never unwound.

use std::sync::Arc;

use super::{SearchDocument, SearchIndex, Searchable};

/// One pending index mutation
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    Upsert { index: &'static str, doc: SearchDocument },
    Delete { index: &'static str, id: i32 },
}

/// Index mutations staged by a single store transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    ops: Vec<IndexOp>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an upsert for an inserted or modified entity
    pub fn upsert<S: Searchable>(&mut self, entity: &S) {
        self.ops.push(IndexOp::Upsert {
            index: S::INDEX,
            doc: entity.search_document(),
        });
    }

    /// Stage a delete for a removed entity
    pub fn delete<S: Searchable>(&mut self, id: i32) {
        self.ops.push(IndexOp::Delete { index: S::INDEX, id });
    }

    /// Fold another change set into this one
    pub fn merge(&mut self, other: ChangeSet) {
        self.ops.extend(other.ops);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[IndexOp] {
        &self.ops
    }
}

/// Applies committed change sets to the index, best-effort
#[derive(Clone)]
pub struct Synchronizer {
    index: Arc<dyn SearchIndex>,
}

impl Synchronizer {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    /// Apply a change set after its transaction committed. Failures are
    /// logged and skipped: the store commit already happened, so the
    /// only remedy is an out-of-band reindex.
    pub async fn apply(&self, changes: ChangeSet) {
        for op in changes.ops {
            match op {
                IndexOp::Upsert { index, doc } => {
                    let id = doc.id;
                    if let Err(e) = self.index.upsert(index, vec![doc]).await {
                        tracing::warn!(index, id, "index upsert failed, pending reindex: {}", e);
                    }
                }
                IndexOp::Delete { index, id } => {
                    if let Err(e) = self.index.delete_by_id(index, id).await {
                        tracing::warn!(index, id, "index delete failed, pending reindex: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, Loanee};
    use crate::search::{MockSearchIndex, SearchIndexError, BOOKS_INDEX, LOANEES_INDEX};
    use mockall::predicate::eq;

    fn sample_book(id: i32, title: &str) -> Book {
        Book {
            id,
            isbn_10: None,
            isbn_13: None,
            title: title.into(),
            pages: None,
            publish_date: None,
            category_id: None,
            cover: None,
            authors: vec![],
            category_name: None,
        }
    }

    #[test]
    fn test_changeset_staging() {
        let mut changes = ChangeSet::new();
        assert!(changes.is_empty());

        changes.upsert(&sample_book(1, "Dune"));
        changes.delete::<Loanee>(9);
        assert_eq!(changes.ops().len(), 2);
        assert!(matches!(
            changes.ops()[0],
            IndexOp::Upsert { index: BOOKS_INDEX, .. }
        ));
        assert_eq!(
            changes.ops()[1],
            IndexOp::Delete { index: LOANEES_INDEX, id: 9 }
        );
    }

    #[test]
    fn test_changeset_merge() {
        let mut a = ChangeSet::new();
        a.upsert(&sample_book(1, "Dune"));
        let mut b = ChangeSet::new();
        b.delete::<Book>(2);
        a.merge(b);
        assert_eq!(a.ops().len(), 2);
    }

    #[tokio::test]
    async fn test_apply_upserts_and_deletes() {
        let mut mock = MockSearchIndex::new();
        mock.expect_upsert()
            .with(eq(BOOKS_INDEX), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_delete_by_id()
            .with(eq(BOOKS_INDEX), eq(4))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut changes = ChangeSet::new();
        changes.upsert(&sample_book(3, "Dune"));
        changes.delete::<Book>(4);

        Synchronizer::new(Arc::new(mock)).apply(changes).await;
    }

    #[tokio::test]
    async fn test_apply_keeps_going_after_failure() {
        // A failed upsert must not stop later operations or surface an error.
        let mut mock = MockSearchIndex::new();
        mock.expect_upsert()
            .times(1)
            .returning(|_, _| Err(SearchIndexError("connection refused".into())));
        mock.expect_delete_by_id()
            .with(eq(BOOKS_INDEX), eq(8))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut changes = ChangeSet::new();
        changes.upsert(&sample_book(7, "Dune"));
        changes.delete::<Book>(8);

        Synchronizer::new(Arc::new(mock)).apply(changes).await;
    }
}
