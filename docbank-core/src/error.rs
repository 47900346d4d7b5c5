//! Error types and result types for document store operations.
//!
//! Every fallible operation in the workspace returns a [`DocumentStoreResult<T>`].
//! Backends map their driver errors into one of the [`DocumentStoreError`] variants
//! at the backend boundary so callers only ever match on this enum.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backend could not be built from its options (bad URI, bad client options).
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The store could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A configuration value is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A document with the given ID already exists.
    /// The first argument is the document ID, the second is the namespace.
    #[error("Document {0} already exists in {1}")]
    DocumentAlreadyExists(String, String),
    /// The document violates the record's constraints or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The filter expression cannot be evaluated or translated.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The update expression is malformed or cannot be applied.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
