//! Main docbank crate: a small data-access layer over a document store.
//!
//! This crate re-exports the core types from `docbank-core`, exposes the available
//! backends, and adds the banking pieces built on top of them: the [`account::Account`]
//! record, environment [`config`], and the logged operations in [`script`].
//!
//! # Quick Start
//!
//! ```ignore
//! use docbank::{prelude::*, memory::InMemoryStore, script};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = script::open(InMemoryStore::builder()).await?;
//!     script::connect(&store).await?;
//!
//!     let accounts = store.collection("bank", "accounts");
//!     let inserted = script::insert_one(&accounts, doc! { "account_id": "A1", "balance": 100 }).await?;
//!     script::update_one(
//!         &accounts,
//!         Filter::eq("account_id", "A1"),
//!         Update::new().inc("balance", 50),
//!     )
//!     .await?;
//!
//!     let found = script::find_matching(&accounts, Filter::id(inserted.inserted_id)).await?;
//!     let documents = found.cursor.into_vec().await?;
//!
//!     script::close(store).await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature, on by default)

pub mod account;
pub mod config;
pub mod prelude;
pub mod script;

pub use docbank_core::{backend, collection, cursor, document, error, query, results, store, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbank_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbank_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
