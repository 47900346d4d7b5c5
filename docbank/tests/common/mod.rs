#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bson::{Bson, Document};

use docbank::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Namespace,
    cursor::DocumentCursor,
    error::{DocumentStoreError, DocumentStoreResult},
    memory::InMemoryStore,
    query::{Expr, Query},
    results::{DeleteResult, UpdateResult},
    update::Update,
};

/// Which operation the wrapped backend should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Nothing,
    Ping,
    Find,
}

/// Wraps an [`InMemoryStore`] and counts shutdowns.
#[derive(Debug)]
pub struct CountingBackend {
    inner: InMemoryStore,
    failure: Failure,
    shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreBackend for CountingBackend {
    async fn ping(&self) -> DocumentStoreResult<()> {
        if self.failure == Failure::Ping {
            return Err(DocumentStoreError::Connection("server selection timed out".into()));
        }

        self.inner.ping().await
    }

    async fn list_database_names(&self) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_database_names().await
    }

    async fn list_collection_names(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.inner.list_collection_names(database).await
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        self.inner.drop_collection(namespace).await
    }

    async fn insert_documents(&self, namespace: &Namespace, documents: Vec<Document>) -> DocumentStoreResult<Vec<Bson>> {
        self.inner.insert_documents(namespace, documents).await
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.inner.count_documents(namespace, filter).await
    }

    async fn find_documents(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<DocumentCursor> {
        if self.failure == Failure::Find {
            return Err(DocumentStoreError::Backend("cursor killed".into()));
        }

        self.inner.find_documents(namespace, query).await
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        multi: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        self.inner.update_documents(namespace, filter, update, multi).await
    }

    async fn delete_documents(&self, namespace: &Namespace, filter: &Expr, multi: bool) -> DocumentStoreResult<DeleteResult> {
        self.inner.delete_documents(namespace, filter, multi).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.inner.shutdown().await
    }
}

/// Builds a [`CountingBackend`] over a shared in-memory store.
pub struct CountingBuilder {
    pub store: InMemoryStore,
    pub failure: Failure,
    pub shutdowns: Arc<AtomicUsize>,
}

impl CountingBuilder {
    pub fn new(store: &InMemoryStore, failure: Failure) -> Self {
        Self {
            store: store.clone(),
            failure,
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for CountingBuilder {
    type Backend = CountingBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(CountingBackend {
            inner: self.store,
            failure: self.failure,
            shutdowns: self.shutdowns,
        })
    }
}

/// A builder that never produces a backend.
pub struct BrokenBuilder;

#[async_trait]
impl StoreBackendBuilder for BrokenBuilder {
    type Backend = CountingBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Err(DocumentStoreError::Initialization("invalid connection string".into()))
    }
}

pub fn accounts() -> Namespace {
    Namespace::new("bank", "accounts")
}
