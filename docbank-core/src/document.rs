//! Record traits and document helpers.
//!
//! Free-form data travels through the store as [`bson::Document`]. Typed data is
//! described by the [`Record`] trait, which names the record's default collection
//! and validates values at the access-layer boundary before they reach a backend.

use bson::{Bson, Document, de::deserialize_from_document, oid::ObjectId, ser::serialize_to_document};
use serde::{Deserialize, Serialize};

use crate::error::DocumentStoreResult;

/// Name of the primary-key field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// Core trait for explicit record types stored in a collection.
///
/// # Example
///
/// ```ignore
/// use docbank::document::Record;
/// use bson::oid::ObjectId;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Customer {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
///     pub id: Option<ObjectId>,
///     pub name: String,
/// }
///
/// impl Record for Customer {
///     fn collection_name() -> &'static str {
///         "customers"
///     }
/// }
/// ```
pub trait Record: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the name of the collection this record type lives in by default.
    fn collection_name() -> &'static str;

    /// Checks the record's field constraints.
    ///
    /// Typed collections call this before every insert. The default accepts everything.
    ///
    /// # Errors
    ///
    /// Implementations return [`DocumentStoreError::InvalidDocument`](crate::error::DocumentStoreError::InvalidDocument)
    /// describing the first violated constraint.
    fn validate(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Conversion utilities available on every [`Record`].
pub trait RecordExt: Record {
    /// Converts this record to a BSON document for storage.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Creates a record from a stored BSON document.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}

/// Returns the document's `_id`, generating and storing a fresh [`ObjectId`] when it has none.
///
/// This mirrors what MongoDB drivers do client-side before an insert, so every backend
/// sees documents that already carry their primary key.
pub fn ensure_id(document: &mut Document) -> Bson {
    match document.get(ID_FIELD) {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert(ID_FIELD, id.clone());
            id
        }
    }
}
