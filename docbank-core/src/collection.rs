//! Collection handles.
//!
//! A handle pairs a [`Namespace`] with a borrowed backend. Handles are cheap to create
//! and hold no state of their own; every call goes straight to the backend.
//!
//! - [`Collection`] works with free-form [`bson::Document`]s.
//! - [`TypedCollection`] works with a [`Record`] type and validates records before
//!   writing them.
//!
//! # Example
//!
//! ```ignore
//! use docbank::query::Filter;
//! use docbank::update::Update;
//! use bson::doc;
//!
//! let accounts = store.collection("bank", "accounts");
//! let inserted = accounts.insert_one(doc! { "account_id": "A1", "balance": 100 }).await?;
//! accounts
//!     .update_one(Filter::id(inserted.inserted_id), Update::new().inc("balance", 50))
//!     .await?;
//! ```

use bson::{Bson, Document};
use futures::StreamExt;
use std::{fmt, marker::PhantomData};

use crate::{
    backend::StoreBackend,
    document::{Record, RecordExt, ensure_id},
    error::DocumentStoreResult,
    query::{Expr, Query},
    results::{DeleteResult, FindResult, InsertManyResult, InsertOneResult, UpdateResult},
    update::Update,
};

/// A database name and collection name pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A free-form collection handle.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    namespace: Namespace,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(namespace: Namespace, backend: &'a B) -> Self {
        Self { namespace, backend }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the collection name without the database part.
    pub fn name(&self) -> &str {
        &self.namespace.collection
    }

    /// Views this collection through a record type.
    pub fn typed<R: Record>(&self) -> TypedCollection<'a, B, R> {
        TypedCollection::new(self.namespace.clone(), self.backend)
    }

    /// Inserts a single document, generating an `_id` when it has none.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if the `_id` is taken, or a backend error.
    pub async fn insert_one(&self, mut document: Document) -> DocumentStoreResult<InsertOneResult> {
        ensure_id(&mut document);

        let inserted_id = self
            .backend
            .insert_documents(&self.namespace, vec![document])
            .await?
            .into_iter()
            .next()
            .unwrap_or(Bson::Null);

        Ok(InsertOneResult { inserted_id })
    }

    /// Inserts several documents in one call.
    pub async fn insert_many(&self, documents: Vec<Document>) -> DocumentStoreResult<InsertManyResult> {
        let documents = documents
            .into_iter()
            .map(|mut document| {
                ensure_id(&mut document);
                document
            })
            .collect();

        Ok(InsertManyResult {
            inserted_ids: self
                .backend
                .insert_documents(&self.namespace, documents)
                .await?,
        })
    }

    /// Counts the documents matching the query's filter and opens a cursor over them.
    pub async fn find(&self, query: impl Into<Query>) -> DocumentStoreResult<FindResult> {
        let query = query.into();
        let count = self
            .backend
            .count_documents(&self.namespace, query.filter.as_ref())
            .await?;
        let cursor = self
            .backend
            .find_documents(&self.namespace, query)
            .await?;

        Ok(FindResult { count, cursor })
    }

    /// Returns the first document matching the query, if any.
    pub async fn find_one(&self, query: impl Into<Query>) -> DocumentStoreResult<Option<Document>> {
        let mut query = query.into();
        query.limit = Some(1);

        self.backend
            .find_documents(&self.namespace, query)
            .await?
            .next()
            .await
            .transpose()
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(&self.namespace, filter)
            .await
    }

    /// Applies `update` to at most one matching document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidUpdate`](crate::error::DocumentStoreError::InvalidUpdate)
    /// for updates rejected by [`Update::validate`], before contacting the backend.
    pub async fn update_one(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateResult> {
        update.validate()?;

        self.backend
            .update_documents(&self.namespace, &filter, &update, false)
            .await
    }

    /// Applies `update` to every matching document.
    pub async fn update_many(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateResult> {
        update.validate()?;

        self.backend
            .update_documents(&self.namespace, &filter, &update, true)
            .await
    }

    /// Deletes at most one matching document.
    pub async fn delete_one(&self, filter: Expr) -> DocumentStoreResult<DeleteResult> {
        self.backend
            .delete_documents(&self.namespace, &filter, false)
            .await
    }

    /// Deletes every matching document.
    pub async fn delete_many(&self, filter: Expr) -> DocumentStoreResult<DeleteResult> {
        self.backend
            .delete_documents(&self.namespace, &filter, true)
            .await
    }

    /// Drops the collection and all its documents.
    pub async fn drop(&self) -> DocumentStoreResult<()> {
        self.backend.drop_collection(&self.namespace).await
    }
}

/// A collection handle bound to a record type.
///
/// Reads deserialize into `R`; writes validate with [`Record::validate`] first, so an
/// invalid record never reaches the backend.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, R: Record> {
    inner: Collection<'a, B>,
    _marker: PhantomData<R>,
}

impl<'a, B: StoreBackend, R: Record> TypedCollection<'a, B, R> {
    pub(crate) fn new(namespace: Namespace, backend: &'a B) -> Self {
        Self {
            inner: Collection::new(namespace, backend),
            _marker: PhantomData,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        self.inner.namespace()
    }

    /// Returns the untyped view of the same collection.
    pub fn untyped(&self) -> &Collection<'a, B> {
        &self.inner
    }

    pub async fn insert_one(&self, record: &R) -> DocumentStoreResult<InsertOneResult> {
        record.validate()?;

        self.inner
            .insert_one(record.to_document()?)
            .await
    }

    /// Inserts several records; nothing is sent if any record fails validation.
    pub async fn insert_many(&self, records: &[R]) -> DocumentStoreResult<InsertManyResult> {
        let documents = records
            .iter()
            .map(|record| {
                record.validate()?;
                record.to_document()
            })
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        self.inner
            .insert_many(documents)
            .await
    }

    pub async fn find(&self, query: impl Into<Query>) -> DocumentStoreResult<FindResult<R>> {
        let FindResult { count, cursor } = self.inner.find(query).await?;

        Ok(FindResult {
            count,
            cursor: cursor.into_records::<R>(),
        })
    }

    pub async fn find_one(&self, query: impl Into<Query>) -> DocumentStoreResult<Option<R>> {
        self.inner
            .find_one(query)
            .await?
            .map(R::from_document)
            .transpose()
    }

    pub async fn update_one(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_one(filter, update).await
    }

    pub async fn update_many(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_many(filter, update).await
    }

    pub async fn delete_one(&self, filter: Expr) -> DocumentStoreResult<DeleteResult> {
        self.inner.delete_one(filter).await
    }

    pub async fn delete_many(&self, filter: Expr) -> DocumentStoreResult<DeleteResult> {
        self.inner.delete_many(filter).await
    }
}
