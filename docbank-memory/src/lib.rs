//! In-memory document storage backend for docbank.
//!
//! [`InMemoryStore`] implements the `StoreBackend` trait without any external service.
//! It backs the test suite and the `memory` backend of the command-line tool.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Store-like matching** - Numbers compare by value, missing fields equal `null`,
//!   array fields match any element
//! - **Atomic updates** - An update that fails on one document changes none
//!
//! # Quick Start
//!
//! ```ignore
//! use docbank::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend);
//!     let accounts = store.collection("bank", "accounts");
//!
//!     accounts.insert_one(doc! { "account_id": "A1", "balance": 100 }).await?;
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```

mod evaluator;
mod path;
mod updater;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
