//! Core of the docbank data-access layer.
//!
//! This crate defines everything that does not depend on a particular store:
//!
//! - **Records** ([`document`]) - The [`Record`](document::Record) trait for explicit record types
//! - **Filters and queries** ([`query`]) - Filter expression tree, sort and pagination
//! - **Updates** ([`update`]) - Field mutation expressions (`$set`, `$unset`, `$inc`, `$rename`)
//! - **Backends** ([`backend`]) - The trait every store implementation provides
//! - **Handles** ([`collection`], [`store`]) - Connection, database and collection handles
//! - **Cursors and results** ([`cursor`], [`results`]) - What operations hand back
//! - **Errors** ([`error`]) - The error enum and result alias
//!
//! # Example
//!
//! ```ignore
//! use docbank::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let accounts = store.collection("bank", "accounts");
//!
//! let inserted = accounts.insert_one(doc! { "account_id": "A1", "balance": 100 }).await?;
//! let found = accounts.find(Filter::id(inserted.inserted_id)).await?;
//! assert_eq!(found.count, 1);
//! ```

pub mod backend;
pub mod collection;
pub mod cursor;
pub mod document;
pub mod error;
pub mod query;
pub mod results;
pub mod store;
pub mod update;
