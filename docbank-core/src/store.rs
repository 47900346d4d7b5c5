//! The connection object.
//!
//! A [`DocumentStore`] owns one backend for the lifetime of a run. Callers pass it (or
//! handles borrowed from it) explicitly to every operation, and consume it with
//! [`DocumentStore::shutdown`], which can therefore only happen once.
//!
//! ```ignore
//! use docbank::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! store.ping().await?;
//! let accounts = store.database("bank").collection("accounts");
//! // ...
//! store.shutdown().await?;
//! ```

use crate::{
    backend::StoreBackend,
    collection::{Collection, Namespace, TypedCollection},
    document::Record,
    error::DocumentStoreResult,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Borrows the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a handle to the named database.
    pub fn database<'a>(&'a self, name: &str) -> Database<'a, B> {
        Database {
            name: name.to_string(),
            backend: &self.backend,
        }
    }

    /// Gets a collection handle for the given namespace.
    pub fn namespace<'a>(&'a self, namespace: &Namespace) -> Collection<'a, B> {
        Collection::new(namespace.clone(), &self.backend)
    }

    /// Shorthand for `store.database(database).collection(collection)`.
    pub fn collection<'a>(&'a self, database: &str, collection: &str) -> Collection<'a, B> {
        Collection::new(Namespace::new(database, collection), &self.backend)
    }

    /// Verifies the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Connection`](crate::error::DocumentStoreError::Connection)
    /// when the store cannot be reached.
    pub async fn ping(&self) -> DocumentStoreResult<()> {
        self.backend.ping().await
    }

    /// Lists the names of all databases in the store.
    pub async fn list_database_names(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_database_names().await
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// This consumes the store.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

/// A handle to one database of a store.
#[derive(Debug)]
pub struct Database<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Database<'a, B> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: &str) -> Collection<'a, B> {
        Collection::new(Namespace::new(self.name.as_str(), name), self.backend)
    }

    /// Gets a typed handle to the record type's default collection.
    pub fn typed_collection<R: Record>(&self) -> TypedCollection<'a, B, R> {
        TypedCollection::new(Namespace::new(self.name.as_str(), R::collection_name()), self.backend)
    }

    pub async fn list_collection_names(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend
            .list_collection_names(&self.name)
            .await
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_collection(&Namespace::new(self.name.as_str(), name))
            .await
    }
}
