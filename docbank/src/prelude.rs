//! Convenient re-exports of commonly used types from docbank.
//!
//! ```ignore
//! use docbank::prelude::*;
//! ```

pub use docbank_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, Namespace, TypedCollection},
    cursor::DocumentCursor,
    document::{Record, RecordExt},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    results::{DeleteResult, FindResult, InsertManyResult, InsertOneResult, UpdateResult},
    store::{Database, DocumentStore},
    update::Update,
};

pub use crate::account::{Account, AccountType};
