//! Outcome types returned by write and read operations.

use bson::{Bson, Document};

use crate::cursor::DocumentCursor;

/// Result of inserting a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document, generated when the document had none.
    pub inserted_id: Bson,
}

/// Result of inserting several documents.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    /// The `_id` of each inserted document, in input order.
    pub inserted_ids: Vec<Bson>,
}

/// Result of an update operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Number of documents the filter selected (at most one for single updates).
    pub matched_count: u64,
    /// Number of selected documents whose content actually changed.
    pub modified_count: u64,
}

/// Result of a delete operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Result of a find: how many documents match the filter, plus a cursor over them.
///
/// `count` ignores the query's limit and offset; the cursor honours them.
#[derive(Debug)]
pub struct FindResult<T = Document> {
    pub count: u64,
    pub cursor: DocumentCursor<T>,
}
