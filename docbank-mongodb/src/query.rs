//! Query translation from filter expressions to MongoDB query documents.

use bson::{Bson, Document, doc};

use docbank_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates filter expressions into MongoDB's native query syntax.
///
/// `Not` becomes `$nor` because MongoDB's `$not` only applies to a single field's
/// operator expression. An empty AND matches everything, an empty OR nothing. Raw
/// filter documents are emitted unchanged.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` matches every document.
    pub fn translate(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(Document::new()),
        }
    }

    fn visit_all(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, DocumentStoreError> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(Document::new());
        }

        Ok(doc! { "$and": self.visit_all(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$nor": [{}] });
        }

        Ok(doc! { "$or": self.visit_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::In | FieldOp::NotIn => {
                if !matches!(value, Bson::Array(_)) {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "{op:?} on {field} requires an array of values, got {value}"
                    )));
                }

                if op == FieldOp::In { "$in" } else { "$nin" }
            }
        };

        Ok(doc! {
            field: { operator: value.clone() },
        })
    }

    fn visit_raw(&mut self, filter: &Document) -> Result<Self::Output, Self::Error> {
        Ok(filter.clone())
    }
}
