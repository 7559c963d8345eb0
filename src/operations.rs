//! # Update Operations
//!
//! The payload consumed by the table update methods is an [`Update`]:
//! either a set of fields merged into the target document, or a transform
//! run against the document's fields in place. This module also provides
//! the common field transforms:
//!
//! ```ignore
//! use docketdb::operations::{delete, increment};
//!
//! table.update(increment("age"), &adults)?;
//! table.update(delete("nickname"), &everyone)?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::document::FieldMap;

/// Payload of an update: merge a set of fields, or run a transform.
#[derive(Clone)]
pub enum Update {
    /// Shallow merge: each listed field overwrites or inserts its value;
    /// fields absent from the mapping are left untouched.
    Fields(FieldMap),
    /// In-place mutation of the document's fields.
    Transform(Arc<dyn Fn(&mut FieldMap) + Send + Sync>),
}

impl Update {
    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&mut FieldMap) + Send + Sync + 'static,
    {
        Update::Transform(Arc::new(f))
    }

    pub(crate) fn apply(&self, fields: &mut FieldMap) {
        match self {
            Update::Fields(new_fields) => {
                for (field, value) in new_fields {
                    fields.insert(field.clone(), value.clone());
                }
            }
            Update::Transform(f) => f(fields),
        }
    }
}

impl From<FieldMap> for Update {
    fn from(fields: FieldMap) -> Self {
        Update::Fields(fields)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            Update::Transform(_) => f.write_str("Transform"),
        }
    }
}

/// Removes `field` from the document; no-op when absent.
pub fn delete(field: &str) -> Update {
    let field = field.to_string();
    Update::transform(move |doc| {
        doc.remove(&field);
    })
}

/// Adds `n` to `field`. Integer fields stay integers, float fields stay
/// floats; absent or non-numeric fields are left untouched.
pub fn add(field: &str, n: i64) -> Update {
    let field = field.to_string();
    Update::transform(move |doc| apply_delta(doc, &field, n))
}

/// Subtracts `n` from `field`; same numeric handling as [`add`].
pub fn subtract(field: &str, n: i64) -> Update {
    let field = field.to_string();
    Update::transform(move |doc| apply_delta(doc, &field, -n))
}

/// Sets `field` to `value`, inserting it when absent.
pub fn set(field: &str, value: impl Into<Value>) -> Update {
    let field = field.to_string();
    let value = value.into();
    Update::transform(move |doc| {
        doc.insert(field.clone(), value.clone());
    })
}

/// Adds 1 to `field`.
pub fn increment(field: &str) -> Update {
    add(field, 1)
}

/// Subtracts 1 from `field`.
pub fn decrement(field: &str) -> Update {
    subtract(field, 1)
}

fn apply_delta(doc: &mut FieldMap, field: &str, delta: i64) {
    let Some(value) = doc.get_mut(field) else {
        return;
    };
    if let Some(i) = value.as_i64() {
        *value = Value::from(i + delta);
    } else if let Some(f) = value.as_f64() {
        *value = Value::from(f + delta as f64);
    }
}
