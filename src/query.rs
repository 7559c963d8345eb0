//! # Query Handles
//!
//! A [`Query`] wraps an arbitrary predicate over a document's fields behind
//! a cloneable handle. The handle's pointer identity doubles as the query
//! cache key: clones of one handle share a cache slot, while two separately
//! constructed queries never collide, even when they test the same thing.
//! Structural equality over closures is deliberately not attempted.

use std::fmt;
use std::sync::Arc;

use crate::document::FieldMap;

/// Opaque predicate over a document's fields.
#[derive(Clone)]
pub struct Query {
    predicate: Arc<dyn Fn(&FieldMap) -> bool + Send + Sync>,
}

impl Query {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&FieldMap) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluates the predicate against one document's fields.
    pub fn matches(&self, fields: &FieldMap) -> bool {
        (self.predicate)(fields)
    }

    /// Cache identity: the address of the shared predicate allocation. Two
    /// handles share a key iff they clone the same allocation. Whoever keys
    /// a cache on this must also hold a clone of the handle, so the
    /// allocation cannot be freed and its address recycled while the cache
    /// entry is live.
    pub(crate) fn cache_key(&self) -> usize {
        Arc::as_ptr(&self.predicate) as *const () as usize
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.cache_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_evaluates_the_predicate() {
        let query = Query::new(|doc| doc.get("kind") == Some(&json!("book")));

        let mut fields = FieldMap::new();
        fields.insert("kind".to_string(), json!("book"));
        assert!(query.matches(&fields));

        fields.insert("kind".to_string(), json!("film"));
        assert!(!query.matches(&fields));
    }

    #[test]
    fn clones_share_a_cache_key() {
        let query = Query::new(|_| true);
        let clone = query.clone();

        assert_eq!(query.cache_key(), clone.cache_key());
    }

    #[test]
    fn separately_built_queries_are_distinct() {
        let a = Query::new(|_| true);
        let b = Query::new(|_| true);

        assert_ne!(a.cache_key(), b.cache_key());
    }
}
