//! Filter evaluation for in-memory documents.
//!
//! Matching follows the document store's rules closely enough for the access layer's
//! tests: numbers compare by value across integer and float types, an array field
//! matches an equality filter when any element matches, and a missing field equals
//! `null`. Raw filter documents are evaluated when they only use the operators the
//! typed filters have; anything else is an `InvalidQuery` error.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId, spec::BinarySubtype};

use docbank_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Filter, QueryVisitor},
};

use crate::path::get_path;

/// Comparable view of a BSON value.
///
/// Numeric types are normalized to `f64`. Binary values (UUIDs included) and
/// `Decimal128` compare by their bytes; remaining types fall back to plain BSON
/// equality and have no ordering.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Binary(BinarySubtype, &'a [u8]),
    Decimal128([u8; 16]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(binary.subtype, &binary.bytes),
            Bson::Decimal128(value) => Comparable::Decimal128(value.bytes()),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(a_subtype, a), Comparable::Binary(b_subtype, b)) => a_subtype == b_subtype && a == b,
            (Comparable::Decimal128(a), Comparable::Decimal128(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Whether two BSON values are the same value for matching purposes (`1 == 1.0`).
pub(crate) fn same_value(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Evaluates `expr` against the document. `None` matches everything.
    pub fn matches(document: &'a Document, expr: Option<&Expr>) -> DocumentStoreResult<bool> {
        match expr {
            Some(expr) => DocumentEvaluator::new(document).visit_expr(expr),
            None => Ok(true),
        }
    }

    fn equals(field_value: &Bson, value: &Bson) -> bool {
        if same_value(field_value, value) {
            return true;
        }

        match field_value {
            Bson::Array(items) => items.iter().any(|item| same_value(item, value)),
            _ => false,
        }
    }

    fn member_of(field_value: Option<&Bson>, op: FieldOp, values: &Bson) -> DocumentStoreResult<bool> {
        let Bson::Array(values) = values else {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "{op:?} requires an array of values, got {values}"
            )));
        };

        Ok(values
            .iter()
            .any(|value| match field_value {
                Some(field_value) => Self::equals(field_value, value),
                None => matches!(value, Bson::Null),
            }))
    }
}

/// Rewrites a native filter document as an expression tree the evaluator can walk.
///
/// Top-level fields are ANDed. Supported are `$and`, `$or`, `$nor`, plain equality and
/// the field operators `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin` and
/// `$exists`.
fn raw_expr(filter: &Document) -> DocumentStoreResult<Expr> {
    filter
        .iter()
        .map(|(key, value)| raw_clause(key, value))
        .collect::<DocumentStoreResult<Vec<_>>>()
        .map(Expr::And)
}

fn raw_clause(key: &str, value: &Bson) -> DocumentStoreResult<Expr> {
    match key {
        "$and" | "$or" | "$nor" => {
            let Bson::Array(items) = value else {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "{key} requires an array of filters, got {value}"
                )));
            };

            let exprs = items
                .iter()
                .map(|item| match item {
                    Bson::Document(filter) => raw_expr(filter),
                    other => Err(DocumentStoreError::InvalidQuery(format!(
                        "{key} entry {other} is not a filter document"
                    ))),
                })
                .collect::<DocumentStoreResult<Vec<_>>>()?;

            Ok(match key {
                "$and" => Expr::And(exprs),
                "$or" => Expr::Or(exprs),
                _ => Expr::Or(exprs).not(),
            })
        }
        operator if operator.starts_with('$') => Err(unsupported(operator)),
        field => match value {
            Bson::Document(ops) if ops.keys().next().is_some_and(|op| op.starts_with('$')) => ops
                .iter()
                .map(|(op, operand)| raw_field_op(field, op, operand))
                .collect::<DocumentStoreResult<Vec<_>>>()
                .map(Expr::And),
            other => Ok(Filter::eq(field, other.clone())),
        },
    }
}

fn raw_field_op(field: &str, op: &str, operand: &Bson) -> DocumentStoreResult<Expr> {
    let op = match op {
        "$eq" => FieldOp::Eq,
        "$ne" => FieldOp::Ne,
        "$gt" => FieldOp::Gt,
        "$gte" => FieldOp::Gte,
        "$lt" => FieldOp::Lt,
        "$lte" => FieldOp::Lte,
        "$in" => FieldOp::In,
        "$nin" => FieldOp::NotIn,
        "$exists" => {
            return match operand {
                Bson::Boolean(should_exist) => Ok(Expr::Exists(field.to_string(), *should_exist)),
                other => Err(DocumentStoreError::InvalidQuery(format!(
                    "$exists on {field} requires a boolean, got {other}"
                ))),
            };
        }
        other => return Err(unsupported(other)),
    };

    Ok(Expr::field(field.to_string(), op, operand.clone()))
}

fn unsupported(operator: &str) -> DocumentStoreError {
    DocumentStoreError::InvalidQuery(format!(
        "operator {operator} is not supported by the in-memory store"
    ))
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(get_path(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field_value = get_path(self.document, field);

        match op {
            FieldOp::In => return Self::member_of(field_value, op, value),
            FieldOp::NotIn => return Self::member_of(field_value, op, value).map(|found| !found),
            _ => {}
        }

        let Some(field_value) = field_value else {
            return Ok(match op {
                FieldOp::Eq => matches!(value, Bson::Null),
                FieldOp::Ne => !matches!(value, Bson::Null),
                _ => false,
            });
        };

        Ok(match op {
            FieldOp::Eq => Self::equals(field_value, value),
            FieldOp::Ne => !Self::equals(field_value, value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
            FieldOp::In | FieldOp::NotIn => unreachable!("membership handled above"),
        })
    }

    fn visit_raw(&mut self, filter: &Document) -> Result<Self::Output, Self::Error> {
        let expr = raw_expr(filter)?;
        self.visit_expr(&expr)
    }
}
