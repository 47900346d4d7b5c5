//! Update translation to MongoDB update documents.

use bson::{Bson, Document};

use docbank_core::{
    error::DocumentStoreError,
    update::{Update, UpdateVisitor},
};

/// Collects update operations into `{ "$set": {..}, "$unset": {..}, .. }`.
///
/// Operations on the same field under the same operator keep the last value, matching
/// how the server treats duplicate keys. Raw update documents are merged in operator
/// by operator, so `{ "$mul": .. }` reaches the server untouched.
#[derive(Default)]
pub(crate) struct MongoUpdateTranslator {
    output: Document,
}

impl MongoUpdateTranslator {
    pub fn translate(update: &Update) -> Result<Document, DocumentStoreError> {
        let mut translator = MongoUpdateTranslator::default();
        translator.visit_update(update)?;

        Ok(translator.output)
    }

    fn push(&mut self, operator: &str, field: &str, value: Bson) -> Result<(), DocumentStoreError> {
        if !self.output.contains_key(operator) {
            self.output.insert(operator, Document::new());
        }

        match self.output.get_mut(operator) {
            Some(Bson::Document(fields)) => {
                fields.insert(field, value);
                Ok(())
            }
            _ => Err(DocumentStoreError::InvalidUpdate(format!("malformed {operator} section"))),
        }
    }
}

impl UpdateVisitor for MongoUpdateTranslator {
    type Error = DocumentStoreError;

    fn visit_set(&mut self, field: &str, value: &Bson) -> Result<(), Self::Error> {
        self.push("$set", field, value.clone())
    }

    fn visit_unset(&mut self, field: &str) -> Result<(), Self::Error> {
        self.push("$unset", field, Bson::String(String::new()))
    }

    fn visit_inc(&mut self, field: &str, amount: &Bson) -> Result<(), Self::Error> {
        self.push("$inc", field, amount.clone())
    }

    fn visit_rename(&mut self, field: &str, new: &str) -> Result<(), Self::Error> {
        self.push("$rename", field, Bson::String(new.to_string()))
    }

    fn visit_raw(&mut self, update: &Document) -> Result<(), Self::Error> {
        for (operator, value) in update {
            match value {
                Bson::Document(fields) => {
                    for (field, value) in fields {
                        self.push(operator, field, value.clone())?;
                    }
                }
                _ if !self.output.contains_key(operator) => {
                    self.output.insert(operator, value.clone());
                }
                _ => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "cannot merge {operator} operand {value} into the update"
                    )));
                }
            }
        }

        Ok(())
    }
}
