//! MongoDB backend implementation for docbank.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters and updates are translated into MongoDB's native query and update
//! documents, and finds stream straight from the driver's cursor.
//!
//! To use this backend, include the `mongodb` feature (enabled by default):
//!
//! ```toml
//! [dependencies]
//! docbank = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docbank::{backend::StoreBackendBuilder, mongodb::MongoDbStore, store::DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017")
//!         .app_name("docbank")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!     store.ping().await?;
//!     store.shutdown().await?;
//!
//!     Ok(())
//! }
//! ```

mod query;
mod update;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
