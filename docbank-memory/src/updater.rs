//! Applies [`Update`](docbank_core::update::Update) operations to a document in place.
//!
//! Raw update documents may use `$set`, `$unset`, `$inc` and `$rename`; any other
//! operator is an `InvalidUpdate` error.

use bson::{Bson, Document};

use docbank_core::{
    error::DocumentStoreError,
    update::UpdateVisitor,
};

use crate::path::{get_path, remove_path, set_path};

pub(crate) struct DocumentUpdater<'a> {
    document: &'a mut Document,
}

impl<'a> DocumentUpdater<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        Self { document }
    }

    fn add(field: &str, current: &Bson, amount: &Bson) -> Result<Bson, DocumentStoreError> {
        let overflow = || DocumentStoreError::InvalidUpdate(format!("incrementing {field} overflows"));

        Ok(match (current, amount) {
            (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
                Some(sum) => Bson::Int32(sum),
                None => Bson::Int64(*a as i64 + *b as i64),
            },
            (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64((*a as i64).checked_add(*b).ok_or_else(overflow)?),
            (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a.checked_add(*b as i64).ok_or_else(overflow)?),
            (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a.checked_add(*b).ok_or_else(overflow)?),
            (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
            (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + *b as f64),
            (Bson::Double(a), Bson::Int64(b)) => Bson::Double(a + *b as f64),
            (Bson::Int32(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
            (Bson::Int64(a), Bson::Double(b)) => Bson::Double(*a as f64 + b),
            _ => {
                return Err(DocumentStoreError::InvalidUpdate(format!(
                    "cannot increment non-numeric field {field} ({current}) by {amount}"
                )));
            }
        })
    }
}

impl UpdateVisitor for DocumentUpdater<'_> {
    type Error = DocumentStoreError;

    fn visit_set(&mut self, field: &str, value: &Bson) -> Result<(), Self::Error> {
        set_path(self.document, field, value.clone())
    }

    fn visit_unset(&mut self, field: &str) -> Result<(), Self::Error> {
        remove_path(self.document, field);
        Ok(())
    }

    fn visit_inc(&mut self, field: &str, amount: &Bson) -> Result<(), Self::Error> {
        let value = match get_path(self.document, field) {
            Some(current) => Self::add(field, current, amount)?,
            None => amount.clone(),
        };

        set_path(self.document, field, value)
    }

    fn visit_rename(&mut self, field: &str, new: &str) -> Result<(), Self::Error> {
        if let Some(value) = remove_path(self.document, field) {
            remove_path(self.document, new);
            set_path(self.document, new, value)?;
        }

        Ok(())
    }

    fn visit_raw(&mut self, update: &Document) -> Result<(), Self::Error> {
        for (operator, fields) in update {
            let Bson::Document(fields) = fields else {
                return Err(DocumentStoreError::InvalidUpdate(format!(
                    "{operator} requires a document of fields, got {fields}"
                )));
            };

            for (field, value) in fields {
                match operator.as_str() {
                    "$set" => self.visit_set(field, value)?,
                    "$unset" => self.visit_unset(field)?,
                    "$inc" => self.visit_inc(field, value)?,
                    "$rename" => match value {
                        Bson::String(new) => self.visit_rename(field, new)?,
                        other => {
                            return Err(DocumentStoreError::InvalidUpdate(format!(
                                "$rename of {field} requires a string target, got {other}"
                            )));
                        }
                    },
                    other => {
                        return Err(DocumentStoreError::InvalidUpdate(format!(
                            "operator {other} is not supported by the in-memory store"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docbank_core::update::Update;
    use pretty_assertions::assert_eq;

    fn apply(mut document: Document, update: Update) -> Result<Document, DocumentStoreError> {
        DocumentUpdater::new(&mut document).visit_update(&update)?;
        Ok(document)
    }

    #[test]
    fn inc_keeps_integer_types() {
        let updated = apply(doc! { "balance": 10 }, Update::new().inc("balance", 5)).unwrap();
        assert_eq!(updated, doc! { "balance": 15 });

        let updated = apply(doc! { "balance": i32::MAX }, Update::new().inc("balance", 1)).unwrap();
        assert_eq!(updated, doc! { "balance": i32::MAX as i64 + 1 });

        let updated = apply(doc! { "balance": 10_i64 }, Update::new().inc("balance", 0.5)).unwrap();
        assert_eq!(updated, doc! { "balance": 10.5 });
    }

    #[test]
    fn inc_on_missing_field_sets_amount() {
        let updated = apply(doc! {}, Update::new().inc("balance", 100)).unwrap();

        assert_eq!(updated, doc! { "balance": 100 });
    }

    #[test]
    fn inc_rejects_non_numeric_field() {
        let result = apply(doc! { "balance": "lots" }, Update::new().inc("balance", 1));

        assert!(matches!(result, Err(DocumentStoreError::InvalidUpdate(_))));
    }

    #[test]
    fn inc_reports_overflow() {
        let result = apply(doc! { "balance": i64::MAX }, Update::new().inc("balance", 1));

        assert!(matches!(result, Err(DocumentStoreError::InvalidUpdate(_))));
    }

    #[test]
    fn set_unset_rename() {
        let updated = apply(
            doc! { "account_holder": "Linus", "legacy": true },
            Update::new()
                .set("owner.country", "FI")
                .unset("legacy")
                .rename("account_holder", "owner.name"),
        )
        .unwrap();

        assert_eq!(updated, doc! { "owner": { "country": "FI", "name": "Linus" } });
    }

    #[test]
    fn raw_updates_apply_supported_operators() {
        let updated = apply(
            doc! { "balance": 10, "legacy": true, "holder": "Ada" },
            Update::new().raw(doc! {
                "$inc": { "balance": 5 },
                "$unset": { "legacy": "" },
                "$rename": { "holder": "owner" },
            }),
        )
        .unwrap();

        assert_eq!(updated, doc! { "balance": 15, "owner": "Ada" });
    }

    #[test]
    fn raw_updates_with_unknown_operators_fail() {
        let unknown = [
            doc! { "$mul": { "balance": 2 } },
            doc! { "$set": 5 },
            doc! { "$rename": { "holder": 1 } },
        ];

        for update in unknown {
            let result = apply(doc! { "balance": 10, "holder": "Ada" }, Update::new().raw(update));

            assert!(matches!(result, Err(DocumentStoreError::InvalidUpdate(_))));
        }
    }
}
