//! Storage backend abstraction.
//!
//! The [`StoreBackend`] trait is the seam between the access layer and a concrete
//! document store. The layer above never talks to a driver directly, so a remote store
//! and the in-memory substitute are interchangeable.
//!
//! # Example
//!
//! ```ignore
//! use docbank::backend::StoreBackend;
//! use docbank::collection::Namespace;
//! use bson::doc;
//!
//! let backend = MyBackend::new();
//! let accounts = Namespace::new("bank", "accounts");
//! backend.insert_documents(&accounts, vec![doc! { "_id": 1, "balance": 100 }]).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;

use crate::{
    collection::Namespace,
    cursor::DocumentCursor,
    error::DocumentStoreResult,
    query::{Expr, Query},
    results::{DeleteResult, UpdateResult},
    update::Update,
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The access layer issues operations one at a
/// time, but handles may be shared across tasks.
///
/// # Documents and identifiers
///
/// Documents handed to [`StoreBackend::insert_documents`] already carry an `_id`; the
/// access layer assigns one when the caller did not. Backends must reject a document
/// whose `_id` is already present in the namespace.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Verifies that the store is reachable.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Lists the names of all databases in the store.
    async fn list_database_names(&self) -> DocumentStoreResult<Vec<String>>;

    /// Lists the names of all collections in a database.
    async fn list_collection_names(&self, database: &str) -> DocumentStoreResult<Vec<String>>;

    /// Drops a collection and all its documents. Dropping a missing collection succeeds.
    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()>;

    /// Inserts documents, returning their `_id` values in input order.
    ///
    /// The database and collection are created on first insert. A duplicate `_id` fails
    /// with `DocumentAlreadyExists` naming that id. Whether the documents before it were
    /// inserted depends on the backend.
    async fn insert_documents(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts documents matching `filter`; `None` counts every document.
    async fn count_documents(
        &self,
        namespace: &Namespace,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64>;

    /// Returns a one-shot cursor over the documents matching `query`.
    async fn find_documents(
        &self,
        namespace: &Namespace,
        query: Query,
    ) -> DocumentStoreResult<DocumentCursor>;

    /// Applies `update` to the first matching document, or to all of them when `multi` is set.
    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        multi: bool,
    ) -> DocumentStoreResult<UpdateResult>;

    /// Deletes the first matching document, or all of them when `multi` is set.
    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        multi: bool,
    ) -> DocumentStoreResult<DeleteResult>;

    /// Cleanly shuts down the backend, releasing connections.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory for backend instances.
///
/// Building validates options and creates the client; it does not have to contact the
/// store. Use [`StoreBackend::ping`] to verify the connection.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
