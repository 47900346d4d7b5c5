use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::StreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions},
};
use tracing::debug;

use docbank_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::Namespace,
    cursor::DocumentCursor,
    document::ensure_id,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
    results::{DeleteResult, UpdateResult},
    update::Update,
};

use crate::{query::MongoQueryTranslator, update::MongoUpdateTranslator};

const DUPLICATE_KEY: i32 = 11000;

/// Maps a driver error onto the store error enum.
///
/// Server selection failures mean the deployment is unreachable and become
/// [`DocumentStoreError::Connection`]; everything else is a backend error.
fn backend_error(error: MongoError) -> DocumentStoreError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } => DocumentStoreError::Connection(error.to_string()),
        _ => DocumentStoreError::Backend(error.to_string()),
    }
}

/// `(index, code)` of every write error the server reported for an insert.
fn write_errors(error: &MongoError) -> Vec<(usize, i32)> {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) => vec![(0, failure.code)],
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .map(|e| (e.index, e.code))
            .collect(),
        _ => Vec::new(),
    }
}

/// The `_id` of the first document rejected with a duplicate key error.
fn duplicate_id<'a>(errors: &[(usize, i32)], ids: &'a [Bson]) -> Option<&'a Bson> {
    errors
        .iter()
        .find(|(_, code)| *code == DUPLICATE_KEY)
        .and_then(|(index, _)| ids.get(*index))
}

/// Query options for a find. Limits beyond `i64::MAX` saturate.
fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();

    options.limit = query.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
    options.skip = query.offset.map(|skip| u64::try_from(skip).unwrap_or(u64::MAX));
    options.sort = query.sort.as_ref().map(|sort| {
        doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        }
    });

    options
}

/// MongoDB backend.
///
/// `insert_documents` is an ordered `insert_many`: when a document is rejected, the
/// documents before it stay inserted. The in-memory backend checks every `_id` first
/// and inserts all or nothing.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn builder(uri: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri)
    }

    /// Borrows the driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DocumentStoreError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_database_names(&self) -> DocumentStoreResult<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(backend_error)
    }

    async fn list_collection_names(&self, database: &str) -> DocumentStoreResult<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(backend_error)
    }

    async fn drop_collection(&self, namespace: &Namespace) -> DocumentStoreResult<()> {
        self.get_collection(namespace)
            .drop()
            .await
            .map_err(backend_error)
    }

    async fn insert_documents(
        &self,
        namespace: &Namespace,
        mut documents: Vec<Document>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let ids = documents
            .iter_mut()
            .map(ensure_id)
            .collect::<Vec<_>>();

        debug!(namespace = %namespace, count = documents.len(), "Executing insert_many");

        self.get_collection(namespace)
            .insert_many(documents)
            .await
            .map_err(|e| match duplicate_id(&write_errors(&e), &ids) {
                Some(id) => DocumentStoreError::DocumentAlreadyExists(id.to_string(), namespace.to_string()),
                None => backend_error(e),
            })?;

        Ok(ids)
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        let filter = MongoQueryTranslator::translate(filter)?;
        debug!(namespace = %namespace, filter = %filter, "Executing count_documents");

        self.get_collection(namespace)
            .count_documents(filter)
            .await
            .map_err(backend_error)
    }

    async fn find_documents(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<DocumentCursor> {
        let options = find_options(&query);
        let filter = MongoQueryTranslator::translate(query.filter.as_ref())?;
        debug!(namespace = %namespace, filter = %filter, "Executing find");

        let cursor = self
            .get_collection(namespace)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?;

        Ok(DocumentCursor::new(
            cursor.map(|item| item.map_err(backend_error)),
        ))
    }

    async fn update_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        update: &Update,
        multi: bool,
    ) -> DocumentStoreResult<UpdateResult> {
        let filter = MongoQueryTranslator::translate(Some(filter))?;
        let update = MongoUpdateTranslator::translate(update)?;
        let collection = self.get_collection(namespace);

        debug!(namespace = %namespace, filter = %filter, update = %update, multi, "Executing update");

        let result = if multi {
            collection.update_many(filter, update).await
        } else {
            collection.update_one(filter, update).await
        }
        .map_err(backend_error)?;

        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_documents(
        &self,
        namespace: &Namespace,
        filter: &Expr,
        multi: bool,
    ) -> DocumentStoreResult<DeleteResult> {
        let filter = MongoQueryTranslator::translate(Some(filter))?;
        let collection = self.get_collection(namespace);

        debug!(namespace = %namespace, filter = %filter, multi, "Executing delete");

        let result = if multi {
            collection.delete_many(filter).await
        } else {
            collection.delete_one(filter).await
        }
        .map_err(backend_error)?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builds a [`MongoDbStore`] from a connection string.
///
/// Building parses the URI and creates the client. The driver connects lazily, so an
/// unreachable server surfaces on the first operation (usually `ping`).
pub struct MongoDbStoreBuilder {
    uri: String,
    app_name: Option<String>,
    server_selection_timeout: Option<Duration>,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            app_name: None,
            server_selection_timeout: None,
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }
        if self.server_selection_timeout.is_some() {
            options.server_selection_timeout = self.server_selection_timeout;
        }

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_error_names_the_rejected_id() {
        let ids = [ObjectId::new(), ObjectId::new(), ObjectId::new()].map(Bson::ObjectId);

        assert_eq!(duplicate_id(&[(1, DUPLICATE_KEY)], &ids), Some(&ids[1]));
        assert_eq!(duplicate_id(&[(0, 121), (2, DUPLICATE_KEY)], &ids), Some(&ids[2]));
        assert_eq!(duplicate_id(&[(0, 121)], &ids), None);
        assert_eq!(duplicate_id(&[(7, DUPLICATE_KEY)], &ids), None);
    }

    #[test]
    fn oversized_limit_saturates() {
        let options = find_options(&Query::builder().limit(usize::MAX).offset(3).build());

        assert_eq!(options.limit, Some(i64::MAX));
        assert_eq!(options.skip, Some(3));
        assert_eq!(options.sort, None);
    }

    #[test]
    fn sort_direction_maps_to_sign() {
        let options = find_options(&Query::builder().sort("balance", SortDirection::Desc).limit(10).build());

        assert_eq!(options.sort, Some(doc! { "balance": -1 }));
        assert_eq!(options.limit, Some(10));
    }

    #[tokio::test]
    async fn malformed_uri_fails_to_build() {
        let result = MongoDbStore::builder("postgres://localhost").build().await;

        assert!(matches!(result, Err(DocumentStoreError::Initialization(_))));
    }

    #[tokio::test]
    async fn building_does_not_contact_the_server() {
        let store = MongoDbStore::builder("mongodb://localhost:1")
            .app_name("docbank-test")
            .build()
            .await;

        assert!(store.is_ok());
    }
}
