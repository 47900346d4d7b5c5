//! Logged wrappers around the store's operations, plus the `run` and `tour` drivers.
//!
//! Every wrapper reports its outcome through `tracing` and hands the typed result back
//! to the caller. The drivers decide what a failure means: [`run`] stops at the first
//! one but still closes the connection, [`tour`] logs it and moves on.
//!
//! ```ignore
//! use docbank::{memory::InMemoryStore, query::Filter, script};
//!
//! let outcome = script::run(InMemoryStore::builder(), &config.namespace(), Filter::id(id)).await;
//! ```

use bson::{Bson, Document, oid::ObjectId};
use futures::StreamExt;
use tracing::{error, info, warn};

use docbank_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, Namespace, TypedCollection},
    cursor::DocumentCursor,
    document::Record,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter, Query},
    results::{DeleteResult, FindResult, InsertManyResult, InsertOneResult, UpdateResult},
    store::DocumentStore,
    update::Update,
};

use crate::account::{Account, AccountType};

/// Builds the backend and wraps it in a store. Nothing is sent to the server yet.
pub async fn open<Bu: StoreBackendBuilder>(builder: Bu) -> DocumentStoreResult<DocumentStore<Bu::Backend>> {
    match builder.build().await {
        Ok(backend) => Ok(DocumentStore::new(backend)),
        Err(e) => {
            error!(error = %e, "Error creating database client");
            Err(e)
        }
    }
}

/// Verifies the store answers. No retry.
pub async fn connect<B: StoreBackend>(store: &DocumentStore<B>) -> DocumentStoreResult<()> {
    match store.ping().await {
        Ok(()) => {
            info!("Connection established");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Error connecting to database");
            Err(e)
        }
    }
}

pub async fn list_database_names<B: StoreBackend>(store: &DocumentStore<B>) -> DocumentStoreResult<Vec<String>> {
    match store.list_database_names().await {
        Ok(names) => {
            info!("Databases:");
            for name in &names {
                info!(" - {name}");
            }
            Ok(names)
        }
        Err(e) => {
            error!(error = %e, "Error listing database names");
            Err(e)
        }
    }
}

pub async fn insert_one<B: StoreBackend>(
    collection: &Collection<'_, B>,
    document: Document,
) -> DocumentStoreResult<InsertOneResult> {
    match collection.insert_one(document).await {
        Ok(result) => {
            info!("Inserted document: {}", display_id(&result.inserted_id));
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error inserting document");
            Err(e)
        }
    }
}

/// Inserts a record after checking it with [`Record::validate`].
pub async fn insert_record<B: StoreBackend, R: Record>(
    collection: &TypedCollection<'_, B, R>,
    record: &R,
) -> DocumentStoreResult<InsertOneResult> {
    match collection.insert_one(record).await {
        Ok(result) => {
            info!("Inserted document: {}", display_id(&result.inserted_id));
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error inserting document");
            Err(e)
        }
    }
}

pub async fn insert_many<B: StoreBackend>(
    collection: &Collection<'_, B>,
    documents: Vec<Document>,
) -> DocumentStoreResult<InsertManyResult> {
    match collection.insert_many(documents).await {
        Ok(result) => {
            info!("Inserted {} documents", result.inserted_ids.len());
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error inserting documents");
            Err(e)
        }
    }
}

/// Counts the matches and returns a cursor that logs each document as it is drained.
pub async fn find_matching<B: StoreBackend>(
    collection: &Collection<'_, B>,
    query: impl Into<Query>,
) -> DocumentStoreResult<FindResult> {
    match collection.find(query).await {
        Ok(FindResult { count, cursor }) => {
            info!("Found {count} document/s");
            Ok(FindResult {
                count,
                cursor: DocumentCursor::new(cursor.inspect(|item| match item {
                    Ok(document) => info!("{document}"),
                    Err(e) => error!(error = %e, "Error reading document"),
                })),
            })
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error finding document");
            Err(e)
        }
    }
}

pub async fn find_one<B: StoreBackend>(
    collection: &Collection<'_, B>,
    query: impl Into<Query>,
) -> DocumentStoreResult<Option<Document>> {
    match collection.find_one(query).await {
        Ok(Some(document)) => {
            info!("Found document: {document}");
            Ok(Some(document))
        }
        Ok(None) => {
            info!("Found 0 document/s");
            Ok(None)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error finding document");
            Err(e)
        }
    }
}

pub async fn update_one<B: StoreBackend>(
    collection: &Collection<'_, B>,
    filter: Expr,
    update: Update,
) -> DocumentStoreResult<UpdateResult> {
    match collection.update_one(filter, update).await {
        Ok(result) => {
            if result.modified_count == 1 {
                info!("Updated one document");
            } else {
                info!("No documents updated");
            }
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error updating document");
            Err(e)
        }
    }
}

pub async fn update_many<B: StoreBackend>(
    collection: &Collection<'_, B>,
    filter: Expr,
    update: Update,
) -> DocumentStoreResult<UpdateResult> {
    match collection.update_many(filter, update).await {
        Ok(result) => {
            if result.modified_count > 0 {
                info!("Updated {} documents", result.modified_count);
            } else {
                info!("No documents updated");
            }
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error updating documents");
            Err(e)
        }
    }
}

pub async fn delete_one<B: StoreBackend>(collection: &Collection<'_, B>, filter: Expr) -> DocumentStoreResult<DeleteResult> {
    match collection.delete_one(filter).await {
        Ok(result) => {
            if result.deleted_count == 1 {
                info!("Deleted one document");
            } else {
                info!("No documents deleted");
            }
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error deleting document");
            Err(e)
        }
    }
}

pub async fn delete_many<B: StoreBackend>(collection: &Collection<'_, B>, filter: Expr) -> DocumentStoreResult<DeleteResult> {
    match collection.delete_many(filter).await {
        Ok(result) => {
            if result.deleted_count > 0 {
                info!("Deleted {} documents", result.deleted_count);
            } else {
                info!("No documents deleted");
            }
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, namespace = %collection.namespace(), "Error deleting documents");
            Err(e)
        }
    }
}

/// Shuts the connection down. Takes the store by value, so it happens at most once.
pub async fn close<B: StoreBackend>(store: DocumentStore<B>) -> DocumentStoreResult<()> {
    match store.shutdown().await {
        Ok(()) => {
            info!("Connection closed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Error closing connection");
            Err(e)
        }
    }
}

/// Connects, drains one lookup and closes the connection.
///
/// The connection is closed whether or not the lookup succeeded. The lookup's error wins
/// over a close error; a close error is returned only after a successful lookup.
pub async fn run<Bu: StoreBackendBuilder>(
    builder: Bu,
    namespace: &Namespace,
    lookup: Expr,
) -> DocumentStoreResult<Vec<Document>> {
    let store = open(builder).await?;
    let outcome = lookup_once(&store, namespace, lookup).await;
    let closed = close(store).await;

    let documents = outcome?;
    closed?;

    Ok(documents)
}

async fn lookup_once<B: StoreBackend>(
    store: &DocumentStore<B>,
    namespace: &Namespace,
    lookup: Expr,
) -> DocumentStoreResult<Vec<Document>> {
    connect(store).await?;

    let collection = store.namespace(namespace);
    let FindResult { cursor, .. } = find_matching(&collection, lookup).await?;

    cursor.into_vec().await
}

/// What happened at each step of a [`tour`].
#[derive(Debug, Default)]
pub struct TourReport {
    pub inserted_id: Option<Bson>,
    pub found: Option<u64>,
    pub updated_one: Option<UpdateResult>,
    pub updated_many: Option<UpdateResult>,
    pub deleted_one: Option<DeleteResult>,
    pub deleted_many: Option<DeleteResult>,
    /// Number of steps that failed.
    pub failures: usize,
}

impl TourReport {
    fn record<T>(&mut self, outcome: DocumentStoreResult<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(_) => {
                self.failures += 1;
                None
            }
        }
    }
}

/// Walks every wrapper against the sample account, continuing past failed steps.
///
/// Inserts [`Account::sample`], finds it by `_id`, credits it 100 with `$inc`, moves
/// every checking account to savings, deletes the inserted account and finally deletes
/// every remaining savings account with a zero or negative balance.
pub async fn tour<B: StoreBackend>(store: &DocumentStore<B>, namespace: &Namespace) -> TourReport {
    let mut report = TourReport::default();
    let collection = store.namespace(namespace);

    let inserted = insert_record(&collection.typed::<Account>(), &Account::sample()).await;
    report.inserted_id = report.record(inserted).map(|result| result.inserted_id);

    // Without an inserted id the single-document steps target an id nothing uses.
    let target = report
        .inserted_id
        .clone()
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let found = match find_matching(&collection, Filter::id(target.clone())).await {
        Ok(FindResult { count, cursor }) => cursor.into_vec().await.map(|_| count),
        Err(e) => Err(e),
    };
    report.found = report.record(found);

    let updated = update_one(&collection, Filter::id(target.clone()), Update::new().inc("balance", 100)).await;
    report.updated_one = report.record(updated);

    let updated = update_many(
        &collection,
        Filter::eq("account_type", AccountType::Checking.as_str()),
        Update::new()
            .set("account_type", AccountType::Savings.as_str())
            .set("last_updated", bson::DateTime::from_chrono(chrono::Utc::now())),
    )
    .await;
    report.updated_many = report.record(updated);

    let deleted = delete_one(&collection, Filter::id(target)).await;
    report.deleted_one = report.record(deleted);

    let deleted = delete_many(
        &collection,
        Filter::eq("account_type", AccountType::Savings.as_str()).and(Filter::lte("balance", 0)),
    )
    .await;
    report.deleted_many = report.record(deleted);

    if report.failures > 0 {
        warn!(failures = report.failures, "Tour finished with failed steps");
    }

    report
}

/// `ObjectId("..")` prints as its hex string, everything else as BSON.
fn display_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

/// Parses a hex object id for use as a lookup key.
pub fn parse_object_id(hex: &str) -> DocumentStoreResult<ObjectId> {
    ObjectId::parse_str(hex.trim())
        .map_err(|e| DocumentStoreError::InvalidQuery(format!("invalid object id {hex:?}: {e}")))
}
