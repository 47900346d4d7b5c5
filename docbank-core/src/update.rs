//! Update expressions.
//!
//! An [`Update`] is an ordered list of field mutations applied to every document a
//! filter selects. Backends consume it through an [`UpdateVisitor`].
//!
//! ```ignore
//! use docbank::update::Update;
//!
//! let update = Update::new()
//!     .inc("balance", 100)
//!     .set("last_updated", bson::DateTime::now());
//! ```

use bson::{Bson, Document};

use crate::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A single field mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Sets the field to a value, creating it when missing.
    Set(String, Bson),
    /// Removes the field.
    Unset(String),
    /// Adds a numeric amount to the field; a missing field is set to the amount.
    Inc(String, Bson),
    /// Moves the field's value to a new name.
    Rename(String, String),
    /// A store-native update document (`{ "$mul": { "balance": 2 } }`), handed to the
    /// backend as is.
    Raw(Document),
}

impl UpdateOp {
    /// Paths this operation writes or removes. A rename touches both names.
    fn paths(&self) -> Vec<&str> {
        match self {
            UpdateOp::Set(field, _) | UpdateOp::Unset(field) | UpdateOp::Inc(field, _) => vec![field.as_str()],
            UpdateOp::Rename(from, to) => vec![from.as_str(), to.as_str()],
            UpdateOp::Raw(update) => update
                .iter()
                .filter_map(|(operator, fields)| Some((operator, fields.as_document()?)))
                .flat_map(|(operator, fields)| {
                    fields.iter().flat_map(move |(field, value)| {
                        let target = match (operator.as_str(), value) {
                            ("$rename", Bson::String(to)) => Some(to.as_str()),
                            _ => None,
                        };
                        std::iter::once(field.as_str()).chain(target)
                    })
                })
                .collect(),
        }
    }
}

/// Whether two dotted paths address the same field or one contains the other.
fn overlaps(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    long.strip_prefix(short)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    pub fn inc(mut self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Inc(field.into(), amount.into()));
        self
    }

    pub fn rename(mut self, field: impl Into<String>, new: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Rename(field.into(), new.into()));
        self
    }

    /// Appends a native update document. Its operators are not interpreted here;
    /// backends that cannot apply one fail with `InvalidUpdate`.
    pub fn raw(mut self, update: Document) -> Self {
        self.ops.push(UpdateOp::Raw(update));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Rejects updates no backend can apply, or that backends would apply differently.
    ///
    /// An update must contain at least one operation, name non-empty fields, never touch
    /// the primary key, and `$inc` amounts must be numeric. No two operations may touch
    /// the same path or paths nested in one another (`owner` and `owner.name`). Raw
    /// documents must be made of `$` operators; their contents are only checked for
    /// path conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidUpdate`] naming the offending operation.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.ops.is_empty() {
            return Err(DocumentStoreError::InvalidUpdate("update has no operations".into()));
        }

        for op in &self.ops {
            match op {
                UpdateOp::Raw(update) => {
                    if update.is_empty() {
                        return Err(DocumentStoreError::InvalidUpdate("raw update is empty".into()));
                    }
                    if let Some(key) = update.keys().find(|key| !key.starts_with('$')) {
                        return Err(DocumentStoreError::InvalidUpdate(format!(
                            "raw update key {key} is not an update operator"
                        )));
                    }
                }
                _ => {
                    for field in op.paths() {
                        if field.is_empty() {
                            return Err(DocumentStoreError::InvalidUpdate(format!("empty field name in {op:?}")));
                        }
                        if field == ID_FIELD || field.starts_with("_id.") {
                            return Err(DocumentStoreError::InvalidUpdate(format!("field {field} is immutable")));
                        }
                    }
                }
            }

            if let UpdateOp::Inc(field, amount) = op {
                if !matches!(amount, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "cannot increment {field} by non-numeric amount {amount}"
                    )));
                }
            }
        }

        let paths = self
            .ops
            .iter()
            .flat_map(UpdateOp::paths)
            .collect::<Vec<_>>();

        for (index, path) in paths.iter().enumerate() {
            if let Some(other) = paths[index + 1..].iter().find(|other| overlaps(path, other)) {
                return Err(DocumentStoreError::InvalidUpdate(format!(
                    "paths {path} and {other} conflict in one update"
                )));
            }
        }

        Ok(())
    }
}

/// Walks the operations of an [`Update`] in order.
pub trait UpdateVisitor {
    type Error: Into<DocumentStoreError>;

    fn visit_set(&mut self, field: &str, value: &Bson) -> Result<(), Self::Error>;
    fn visit_unset(&mut self, field: &str) -> Result<(), Self::Error>;
    fn visit_inc(&mut self, field: &str, amount: &Bson) -> Result<(), Self::Error>;
    fn visit_rename(&mut self, field: &str, new: &str) -> Result<(), Self::Error>;
    fn visit_raw(&mut self, update: &Document) -> Result<(), Self::Error>;

    fn visit_update(&mut self, update: &Update) -> Result<(), Self::Error> {
        for op in update.ops() {
            match op {
                UpdateOp::Set(field, value) => self.visit_set(field, value)?,
                UpdateOp::Unset(field) => self.visit_unset(field)?,
                UpdateOp::Inc(field, amount) => self.visit_inc(field, amount)?,
                UpdateOp::Rename(field, new) => self.visit_rename(field, new)?,
                UpdateOp::Raw(update) => self.visit_raw(update)?,
            }
        }

        Ok(())
    }
}
