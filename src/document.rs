//! # Documents
//!
//! A document is an open mapping from field names to JSON values, annotated
//! with the integer identity it is stored under. The identity lives in the
//! table's key space; it is never written into the field mapping itself.

use std::ops::{Deref, DerefMut};

use serde_json::{Map, Value};

/// Identifier of a document within its table. Allocation starts at 1.
pub type DocId = u64;

/// A document's field storage: field name to JSON value, in insertion order.
pub type FieldMap = Map<String, Value>;

/// A field mapping together with the ID it is stored under.
///
/// Dereferences to its [`FieldMap`], so fields can be read and edited the
/// same way as on a plain mapping while the identity stays immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    doc_id: DocId,
    fields: FieldMap,
}

impl Document {
    pub fn new(doc_id: DocId, fields: FieldMap) -> Self {
        Self { doc_id, fields }
    }

    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

impl Deref for Document {
    type Target = FieldMap;

    fn deref(&self) -> &FieldMap {
        &self.fields
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_are_reachable_through_deref() {
        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), json!("ada"));

        let doc = Document::new(7, fields);
        assert_eq!(doc.doc_id(), 7);
        assert_eq!(doc.get("name"), Some(&json!("ada")));
    }

    #[test]
    fn deref_mut_edits_fields_but_not_identity() {
        let mut doc = Document::new(1, FieldMap::new());
        doc.insert("count".to_string(), json!(3));

        assert_eq!(doc.doc_id(), 1);
        assert_eq!(doc.fields().len(), 1);
    }

    #[test]
    fn equality_covers_identity_and_fields() {
        let mut fields = FieldMap::new();
        fields.insert("a".to_string(), json!(1));

        assert_eq!(
            Document::new(2, fields.clone()),
            Document::new(2, fields.clone())
        );
        assert_ne!(Document::new(2, fields.clone()), Document::new(3, fields));
    }
}
