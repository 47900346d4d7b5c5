mod common;

use std::sync::atomic::Ordering;

use bson::{Bson, doc};
use pretty_assertions::assert_eq;

use docbank::{
    account::{Account, AccountType},
    error::DocumentStoreError,
    memory::InMemoryStore,
    prelude::*,
    script,
};

use common::{BrokenBuilder, CountingBuilder, Failure, accounts};

async fn memory_store() -> DocumentStore<InMemoryStore> {
    script::open(InMemoryStore::builder()).await.unwrap()
}

#[tokio::test]
async fn insert_then_find_by_generated_id() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    let document = doc! { "account_id": "A1", "account_holder": "Ada", "balance": 100 };

    let inserted = script::insert_one(&collection, document.clone()).await.unwrap();
    assert!(matches!(inserted.inserted_id, Bson::ObjectId(_)));

    let found = script::find_matching(&collection, Filter::id(inserted.inserted_id.clone()))
        .await
        .unwrap();
    assert_eq!(found.count, 1);

    let mut documents = found.cursor.into_vec().await.unwrap();
    assert_eq!(documents.len(), 1);

    let mut stored = documents.remove(0);
    assert_eq!(stored.remove("_id"), Some(inserted.inserted_id));
    assert_eq!(stored, document);
}

#[tokio::test]
async fn increment_balance_of_one_account() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    script::insert_one(&collection, doc! { "account_id": "A1", "balance": 100 }).await.unwrap();

    let result = script::update_one(&collection, Filter::eq("account_id", "A1"), Update::new().inc("balance", 50))
        .await
        .unwrap();
    assert_eq!(result.modified_count, 1);

    let account = script::find_one(&collection, Filter::eq("account_id", "A1")).await.unwrap().unwrap();
    assert_eq!(account.get_i32("balance").unwrap(), 150);
}

#[tokio::test]
async fn update_of_missing_document_changes_nothing() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    script::insert_one(&collection, doc! { "account_id": "A1", "balance": 100 }).await.unwrap();

    let result = script::update_one(&collection, Filter::eq("account_id", "ZZ"), Update::new().inc("balance", 1))
        .await
        .unwrap();

    assert_eq!(result, UpdateResult { matched_count: 0, modified_count: 0 });
}

#[tokio::test]
async fn delete_one_then_find_returns_nothing() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    let inserted = script::insert_one(&collection, doc! { "account_id": "A1" }).await.unwrap();

    let missing = script::delete_one(&collection, Filter::eq("account_id", "ZZ")).await.unwrap();
    assert_eq!(missing.deleted_count, 0);

    let deleted = script::delete_one(&collection, Filter::id(inserted.inserted_id.clone()))
        .await
        .unwrap();
    assert_eq!(deleted.deleted_count, 1);

    let found = script::find_matching(&collection, Filter::id(inserted.inserted_id)).await.unwrap();
    assert_eq!(found.count, 0);
    assert!(found.cursor.into_vec().await.unwrap().is_empty());
}

#[tokio::test]
async fn bulk_update_and_delete_cover_every_match() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    script::insert_many(
        &collection,
        vec![
            doc! { "account_id": "A1", "account_type": "checking", "balance": 10 },
            doc! { "account_id": "A2", "account_type": "checking", "balance": 20 },
            doc! { "account_id": "A3", "account_type": "checking", "balance": 30 },
            doc! { "account_id": "B1", "account_type": "savings", "balance": 40 },
        ],
    )
    .await
    .unwrap();

    let checking = Filter::eq("account_type", "checking");
    let updated = script::update_many(&collection, checking.clone(), Update::new().set("frozen", true))
        .await
        .unwrap();
    assert_eq!(updated, UpdateResult { matched_count: 3, modified_count: 3 });

    let frozen = script::find_matching(&collection, checking.clone().and(Filter::eq("frozen", true)))
        .await
        .unwrap();
    assert_eq!(frozen.count, 3);

    let deleted = script::delete_many(&collection, checking.clone()).await.unwrap();
    assert_eq!(deleted.deleted_count, 3);

    let remaining = script::find_matching(&collection, checking).await.unwrap();
    assert_eq!(remaining.count, 0);
    assert_eq!(collection.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn bulk_operations_without_matches_report_zero() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());

    let updated = script::update_many(&collection, Filter::all(), Update::new().inc("balance", 1))
        .await
        .unwrap();
    let deleted = script::delete_many(&collection, Filter::all()).await.unwrap();

    assert_eq!(updated.modified_count, 0);
    assert_eq!(deleted.deleted_count, 0);
}

#[tokio::test]
async fn invalid_updates_are_rejected() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    script::insert_one(&collection, doc! { "account_id": "A1" }).await.unwrap();

    let empty = script::update_one(&collection, Filter::all(), Update::new()).await;
    let primary_key = script::update_many(&collection, Filter::all(), Update::new().set("_id", 7)).await;

    assert!(matches!(empty, Err(DocumentStoreError::InvalidUpdate(_))));
    assert!(matches!(primary_key, Err(DocumentStoreError::InvalidUpdate(_))));
}

#[tokio::test]
async fn duplicate_id_insert_fails() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());

    script::insert_one(&collection, doc! { "_id": "A1" }).await.unwrap();
    let again = script::insert_one(&collection, doc! { "_id": "A1" }).await;

    assert!(matches!(again, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
}

#[tokio::test]
async fn invalid_account_never_reaches_the_store() {
    let store = memory_store().await;
    let accounts = store.database("bank").typed_collection::<Account>();
    let nameless = Account::new("", "MDB1", AccountType::Checking, 5);

    let result = script::insert_record(&accounts, &nameless).await;

    assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
    assert!(script::list_database_names(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn typed_round_trip() {
    let store = memory_store().await;
    let accounts = store.database("bank").typed_collection::<Account>();
    let account = Account::sample();

    let inserted = script::insert_record(&accounts, &account).await.unwrap();
    let found = accounts.find_one(Filter::id(inserted.inserted_id.clone())).await.unwrap().unwrap();

    assert_eq!(found.id.map(Bson::ObjectId), Some(inserted.inserted_id));
    assert_eq!(Account { id: None, ..found }, account);
}

#[tokio::test]
async fn run_closes_once_after_successful_lookup() {
    let store = InMemoryStore::new();
    let inserted = store
        .insert_documents(&accounts(), vec![doc! { "account_id": "A1" }])
        .await
        .unwrap();

    let builder = CountingBuilder::new(&store, Failure::Nothing);
    let shutdowns = builder.shutdowns.clone();

    let found = script::run(builder, &accounts(), Filter::id(inserted[0].clone())).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_closes_once_when_lookup_fails() {
    let builder = CountingBuilder::new(&InMemoryStore::new(), Failure::Find);
    let shutdowns = builder.shutdowns.clone();

    let result = script::run(builder, &accounts(), Filter::all()).await;

    assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_closes_once_when_connect_fails() {
    let builder = CountingBuilder::new(&InMemoryStore::new(), Failure::Ping);
    let shutdowns = builder.shutdowns.clone();

    let result = script::run(builder, &accounts(), Filter::all()).await;

    assert!(matches!(result, Err(DocumentStoreError::Connection(_))));
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_reports_unbuildable_backend() {
    let result = script::run(BrokenBuilder, &accounts(), Filter::all()).await;

    assert!(matches!(result, Err(DocumentStoreError::Initialization(_))));
}

#[tokio::test]
async fn tour_exercises_every_operation() {
    let store = memory_store().await;
    let collection = store.namespace(&accounts());
    script::insert_one(
        &collection,
        doc! { "account_id": "OLD", "account_type": "checking", "balance": -5_i64 },
    )
    .await
    .unwrap();

    let report = script::tour(&store, &accounts()).await;

    assert_eq!(report.failures, 0);
    assert!(report.inserted_id.is_some());
    assert_eq!(report.found, Some(1));
    assert_eq!(report.updated_one.map(|r| r.modified_count), Some(1));
    assert_eq!(report.updated_many.map(|r| r.modified_count), Some(2));
    assert_eq!(report.deleted_one.map(|r| r.deleted_count), Some(1));
    assert_eq!(report.deleted_many.map(|r| r.deleted_count), Some(1));
    assert_eq!(collection.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn tour_continues_past_failed_steps() {
    let store = DocumentStore::new(
        CountingBuilder::new(&InMemoryStore::new(), Failure::Find)
            .build()
            .await
            .unwrap(),
    );

    let report = script::tour(&store, &accounts()).await;

    assert_eq!(report.failures, 1);
    assert_eq!(report.found, None);
    assert_eq!(report.deleted_one.map(|r| r.deleted_count), Some(1));
}
