//! In-memory storage implementation.
//!
//! Documents are kept per database and collection in insertion order behind an
//! async-aware read-write lock.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use tracing::debug;

use docbank_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Namespace,
    cursor::DocumentCursor,
    document::{ID_FIELD, ensure_id},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
    results::{DeleteResult, UpdateResult},
    update::{Update, UpdateVisitor},
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, same_value},
    path::get_path,
    updater::DocumentUpdater,
};

type CollectionMap = HashMap<String, Vec<Document>>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and every clone shares the same data, so a test can
/// keep a clone around to inspect what a run left behind.
///
/// A database exists while it holds at least one collection, and a collection exists
/// from its first insert until it is dropped. Queries scan the whole collection.
///
/// # Example
///
/// ```ignore
/// use docbank_memory::InMemoryStore;
/// use docbank_core::{backend::StoreBackend, collection::Namespace};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let accounts = Namespace::new("bank", "accounts");
///
/// store.insert_documents(&accounts, vec![doc! { "_id": 1, "balance": 100 }]).await?;
/// assert_eq!(store.count_documents(&accounts, None).await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// database name -> (collection name -> documents)
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn matching<'a>(
        documents: &'a [Document],
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<Vec<(usize, &'a Document)>> {
        let mut matched = Vec::new();

        for (index, document) in documents.iter().enumerate() {
            if DocumentEvaluator::matches(document, filter)? {
                matched.push((index, document));
            }
        }

        Ok(matched)
    }

    fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
        let left = get_path(a, field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = get_path(b, field)
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        left.partial_cmp(&right).unwrap_or(Ordering::Equal)
    }

    fn ensure_unique(existing: &[Document], incoming: &[Document], namespace: &Namespace) -> DocumentStoreResult<()> {
        for (position, document) in incoming.iter().enumerate() {
            let Some(id) = document.get(ID_FIELD) else {
                continue;
            };

            let taken = existing
                .iter()
                .chain(&incoming[..position])
                .filter_map(|other| other.get(ID_FIELD))
                .any(|other| same_value(other, id));

            if taken {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    id.to_string(),
                    namespace.to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    async fn list_database_names(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();
        Ok(names)
    }

    async fn list_collection_names(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .get(database)
            .map(|collections| collections.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        names.sort();
        Ok(names)
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if let Some(collections) = store.get_mut(&namespace.database) {
            collections.remove(&namespace.collection);

            if collections.is_empty() {
                store.remove(&namespace.database);
            }
        }

        debug!(namespace = %namespace, "Dropped collection");
        Ok(())
    }

    async fn insert_documents(
        &self,
        namespace: &Namespace,
        mut documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let ids = documents
            .iter_mut()
            .map(ensure_id)
            .collect::<Vec<_>>();

        let mut store = self.store.write().await;
        let existing = store
            .get(&namespace.database)
            .and_then(|collections| collections.get(&namespace.collection))
            .map(Vec::as_slice)
            .unwrap_or_default();

        Self::ensure_unique(existing, &documents, namespace)?;

        debug!(namespace = %namespace, count = documents.len(), "Inserting documents");

        store
            .entry(namespace.database.clone())
            .or_default()
            .entry(namespace.collection.clone())
            .or_default()
            .extend(documents);

        Ok(ids)
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let Some(documents) = store
            .get(&namespace.database)
            .and_then(|collections| collections.get(&namespace.collection))
        else {
            return Ok(0);
        };

        Ok(Self::matching(documents, filter)?.len() as u64)
    }

    async fn find_documents(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<DocumentCursor> {
        let store = self.store.read().await;
        let Some(documents) = store
            .get(&namespace.database)
            .and_then(|collections| collections.get(&namespace.collection))
        else {
            return Ok(DocumentCursor::empty());
        };

        let mut found = Self::matching(documents, query.filter.as_ref())?
            .into_iter()
            .map(|(_, document)| document.clone())
            .collect::<Vec<_>>();

        if let Some(sort) = &query.sort {
            found.sort_by(|a, b| match sort.direction {
                SortDirection::Asc => Self::compare_field(a, b, &sort.field),
                SortDirection::Desc => Self::compare_field(b, a, &sort.field),
            });
        }

        let found = found
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect::<Vec<_>>();

        debug!(namespace = %namespace, count = found.len(), "Found documents");
        Ok(DocumentCursor::from_items(found))
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        multi: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let mut store = self.store.write().await;
        let Some(documents) = store
            .get_mut(&namespace.database)
            .and_then(|collections| collections.get_mut(&namespace.collection))
        else {
            return Ok(UpdateResult::default());
        };

        let mut matched = Self::matching(documents, Some(filter))?;
        if !multi {
            matched.truncate(1);
        }

        // Apply to copies first so a failing operation leaves every document untouched.
        let mut changed = Vec::new();
        for (index, document) in &matched {
            let mut updated = (*document).clone();
            DocumentUpdater::new(&mut updated).visit_update(update)?;

            if updated != **document {
                changed.push((*index, updated));
            }
        }

        let result = UpdateResult {
            matched_count: matched.len() as u64,
            modified_count: changed.len() as u64,
        };

        for (index, updated) in changed {
            documents[index] = updated;
        }

        debug!(
            namespace = %namespace,
            matched = result.matched_count,
            modified = result.modified_count,
            "Updated documents"
        );
        Ok(result)
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        multi: bool,
    ) -> DocumentStoreResult<DeleteResult> {
        let mut store = self.store.write().await;
        let Some(documents) = store
            .get_mut(&namespace.database)
            .and_then(|collections| collections.get_mut(&namespace.collection))
        else {
            return Ok(DeleteResult::default());
        };

        let mut doomed = Self::matching(documents, Some(filter))?
            .into_iter()
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        if !multi {
            doomed.truncate(1);
        }

        for index in doomed.iter().rev() {
            documents.remove(*index);
        }

        debug!(namespace = %namespace, deleted = doomed.len(), "Deleted documents");
        Ok(DeleteResult {
            deleted_count: doomed.len() as u64,
        })
    }
}

/// Builder for [`InMemoryStore`]. Building always succeeds.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docbank_core::query::Filter;
    use pretty_assertions::assert_eq;

    fn accounts() -> Namespace {
        Namespace::new("bank", "accounts")
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::builder().build().await.unwrap();
        store
            .insert_documents(
                &accounts(),
                vec![
                    doc! { "_id": 1, "account_type": "checking", "balance": 100 },
                    doc! { "_id": 2, "account_type": "savings", "balance": 900 },
                    doc! { "_id": 3, "account_type": "checking", "balance": 40 },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn insert_creates_database_and_collection() {
        let store = seeded().await;

        assert_eq!(store.list_database_names().await.unwrap(), vec!["bank".to_string()]);
        assert_eq!(store.list_collection_names("bank").await.unwrap(), vec!["accounts".to_string()]);
        assert!(store.list_collection_names("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_generates_missing_ids() {
        let store = InMemoryStore::new();
        let ids = store
            .insert_documents(&accounts(), vec![doc! { "balance": 1 }])
            .await
            .unwrap();

        assert!(matches!(ids.as_slice(), [Bson::ObjectId(_)]));
    }

    #[tokio::test]
    async fn duplicate_id_rejects_whole_batch() {
        let store = seeded().await;
        let result = store
            .insert_documents(&accounts(), vec![doc! { "_id": 4 }, doc! { "_id": 2 }])
            .await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
        assert_eq!(store.count_documents(&accounts(), None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn find_sorts_and_paginates() {
        let store = seeded().await;
        let query = Query::builder()
            .sort("balance", SortDirection::Desc)
            .offset(1)
            .limit(1)
            .build();

        let found = store
            .find_documents(&accounts(), query)
            .await
            .unwrap()
            .into_vec()
            .await
            .unwrap();

        assert_eq!(found, vec![doc! { "_id": 1, "account_type": "checking", "balance": 100 }]);
    }

    #[tokio::test]
    async fn find_on_missing_collection_is_empty() {
        let store = InMemoryStore::new();
        let found = store
            .find_documents(&accounts(), Query::new())
            .await
            .unwrap()
            .into_vec()
            .await
            .unwrap();

        assert!(found.is_empty());
        assert_eq!(store.count_documents(&accounts(), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_one_touches_first_match_only() {
        let store = seeded().await;
        let result = store
            .update_documents(
                &accounts(),
                &Filter::eq("account_type", "checking"),
                &Update::new().inc("balance", 10),
                false,
            )
            .await
            .unwrap();

        assert_eq!(result, UpdateResult { matched_count: 1, modified_count: 1 });
        assert_eq!(
            store.count_documents(&accounts(), Some(&Filter::eq("balance", 110))).await.unwrap(),
            1
        );
        assert_eq!(
            store.count_documents(&accounts(), Some(&Filter::eq("balance", 40))).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn update_counts_only_real_changes() {
        let store = seeded().await;
        let result = store
            .update_documents(
                &accounts(),
                &Filter::all(),
                &Update::new().set("account_type", "checking"),
                true,
            )
            .await
            .unwrap();

        assert_eq!(result, UpdateResult { matched_count: 3, modified_count: 1 });
    }

    #[tokio::test]
    async fn failed_update_changes_nothing() {
        let store = seeded().await;
        store
            .insert_documents(&accounts(), vec![doc! { "_id": 4, "balance": "n/a" }])
            .await
            .unwrap();

        let result = store
            .update_documents(&accounts(), &Filter::all(), &Update::new().inc("balance", 1), true)
            .await;

        assert!(matches!(result, Err(DocumentStoreError::InvalidUpdate(_))));
        assert_eq!(
            store.count_documents(&accounts(), Some(&Filter::eq("balance", 100))).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn delete_one_and_many() {
        let store = seeded().await;
        let filter = Filter::eq("account_type", "checking");

        let one = store.delete_documents(&accounts(), &filter, false).await.unwrap();
        assert_eq!(one.deleted_count, 1);

        let many = store.delete_documents(&accounts(), &Filter::all(), true).await.unwrap();
        assert_eq!(many.deleted_count, 2);

        let none = store.delete_documents(&accounts(), &filter, true).await.unwrap();
        assert_eq!(none.deleted_count, 0);
    }

    #[tokio::test]
    async fn dropping_last_collection_removes_database() {
        let store = seeded().await;
        store.drop_collection(&accounts()).await.unwrap();

        assert!(store.list_database_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_data() {
        let store = seeded().await;
        let observer = store.clone();
        store.delete_documents(&accounts(), &Filter::id(1), false).await.unwrap();

        assert_eq!(observer.count_documents(&accounts(), None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn uuid_ids_stay_distinct() {
        let store = InMemoryStore::new();
        let uuid = |byte| {
            Bson::Binary(bson::Binary {
                subtype: bson::spec::BinarySubtype::Uuid,
                bytes: vec![byte; 16],
            })
        };

        store
            .insert_documents(&accounts(), vec![doc! { "_id": uuid(1) }, doc! { "_id": uuid(2) }])
            .await
            .unwrap();

        let found = store
            .find_documents(&accounts(), Filter::id(uuid(1)).into())
            .await
            .unwrap()
            .into_vec()
            .await
            .unwrap();
        assert_eq!(found, vec![doc! { "_id": uuid(1) }]);
        assert_eq!(store.count_documents(&accounts(), Some(&Filter::id(uuid(2)))).await.unwrap(), 1);

        let missing = store.delete_documents(&accounts(), &Filter::id(uuid(9)), false).await.unwrap();
        assert_eq!(missing.deleted_count, 0);

        let deleted = store.delete_documents(&accounts(), &Filter::id(uuid(2)), false).await.unwrap();
        assert_eq!(deleted.deleted_count, 1);
        assert_eq!(store.count_documents(&accounts(), None).await.unwrap(), 1);

        let again = store.insert_documents(&accounts(), vec![doc! { "_id": uuid(1) }]).await;
        assert!(matches!(again, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
    }

    #[tokio::test]
    async fn raw_descriptors_run_against_memory() {
        let store = seeded().await;
        let result = store
            .update_documents(
                &accounts(),
                &Filter::raw(doc! { "balance": { "$lt": 500 } }),
                &Update::new().raw(doc! { "$inc": { "balance": 1 } }),
                true,
            )
            .await
            .unwrap();

        assert_eq!(result, UpdateResult { matched_count: 2, modified_count: 2 });

        let unsupported = store
            .update_documents(
                &accounts(),
                &Filter::all(),
                &Update::new().raw(doc! { "$mul": { "balance": 2 } }),
                true,
            )
            .await;
        assert!(matches!(unsupported, Err(DocumentStoreError::InvalidUpdate(_))));

        let unknown = store
            .count_documents(&accounts(), Some(&Filter::raw(doc! { "$text": { "$search": "x" } })))
            .await;
        assert!(matches!(unknown, Err(DocumentStoreError::InvalidQuery(_))));
    }
}
