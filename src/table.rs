//! # Tables
//!
//! A [`Table`] is a named collection of schema-less documents identified by
//! integer IDs. It owns a query cache and the ID allocator, and borrows a
//! shared handle to snapshot storage; everything it does is expressed as
//! one round trip against that handle.
//!
//! ## Snapshot Protocol
//!
//! Storage only exposes whole-snapshot read and write, so every mutating
//! operation runs a single read-modify-write cycle: lock the storage
//! handle, read the snapshot, mutate this table's sub-collection in place,
//! write the snapshot back, then release the lock and invalidate the query
//! cache. Holding the lock across the full cycle means two in-process
//! writers can never interleave their cycles and lose an update.
//! Operations that touch many documents (`insert_multiple`, `update`,
//! `update_multiple`, `remove`, `remove_ids`) batch every mutation into
//! that one cycle — one storage write per public call, regardless of how
//! many documents are affected.
//!
//! Reads never call the storage write path; an absent sub-collection is
//! simply an empty table.
//!
//! ## Query Cache
//!
//! `search` memoizes its result list per query handle in a small LRU cache
//! keyed by the handle's identity (see [`Query`]). Every write clears the
//! whole cache, so a hit is only possible when no write has happened since
//! the entry was produced. The cache stores a clone of each query handle
//! beside its results, keeping the allocation behind the identity key alive
//! for as long as the entry is.
//!
//! ## ID Allocation
//!
//! Document IDs start at 1 and grow strictly upward. The allocator scans
//! the table once (max existing ID plus one) and then counts in memory;
//! the scan and every subsequent allocation happen inside the write lock,
//! against the snapshot just read, so the counter cannot trail storage
//! within one process. [`Table::truncate`] resets the counter, so an
//! emptied table starts over at ID 1.

use std::collections::btree_map;
use std::fmt;

use eyre::{bail, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::LruCache;
use crate::document::{DocId, Document, FieldMap};
use crate::operations::Update;
use crate::query::Query;
use crate::storage::{SharedStorage, TableData};

/// Default capacity of the per-table query cache.
pub const DEFAULT_QUERY_CACHE_CAPACITY: usize = 10;

/// A named table of documents backed by shared snapshot storage.
pub struct Table {
    name: String,
    storage: SharedStorage,
    query_cache: Mutex<LruCache<usize, (Query, Vec<Document>)>>,
    next_id: Mutex<Option<DocId>>,
}

impl Table {
    /// Creates a handle for the table `name` over `storage`, with the
    /// default query-cache capacity.
    pub fn new(storage: SharedStorage, name: impl Into<String>) -> Self {
        Self::with_cache_capacity(storage, name, DEFAULT_QUERY_CACHE_CAPACITY)
    }

    /// Like [`Table::new`] with an explicit query-cache capacity; a
    /// capacity of 0 disables query caching.
    pub fn with_cache_capacity(
        storage: SharedStorage,
        name: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            name: name.into(),
            storage,
            query_cache: Mutex::new(LruCache::new(capacity)),
            next_id: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns every document in the table, in ascending ID order.
    pub fn all(&self) -> Result<Vec<Document>> {
        Ok(self
            .read_table()?
            .into_iter()
            .map(|(doc_id, fields)| Document::new(doc_id, fields))
            .collect())
    }

    /// Returns every document matching `query`.
    ///
    /// Results are memoized per query handle: a repeated search with the
    /// same handle (or a clone of it) is served from the cache until the
    /// next write to this table.
    pub fn search(&self, query: &Query) -> Result<Vec<Document>> {
        if let Some((_, results)) = self.query_cache.lock().get(&query.cache_key()) {
            trace!(table = %self.name, "query cache hit");
            return Ok(results.clone());
        }

        let results: Vec<Document> = self
            .all()?
            .into_iter()
            .filter(|doc| query.matches(doc.fields()))
            .collect();
        trace!(table = %self.name, matches = results.len(), "query cache miss");

        self.query_cache
            .lock()
            .insert(query.cache_key(), (query.clone(), results.clone()));
        Ok(results)
    }

    /// Fetches one document by ID. A document whose field mapping is empty
    /// is still found; `None` means the ID does not exist.
    pub fn get(&self, doc_id: DocId) -> Result<Option<Document>> {
        let mut table = self.read_table()?;
        Ok(table
            .remove(&doc_id)
            .map(|fields| Document::new(doc_id, fields)))
    }

    /// Fetches the documents for the IDs that exist, in the order given.
    /// Missing IDs are skipped silently.
    pub fn get_multiple(&self, doc_ids: &[DocId]) -> Result<Vec<Document>> {
        let table = self.read_table()?;
        Ok(doc_ids
            .iter()
            .filter_map(|doc_id| {
                table
                    .get(doc_id)
                    .map(|fields| Document::new(*doc_id, fields.clone()))
            })
            .collect())
    }

    /// Returns the first document matching `query`, if any.
    pub fn find(&self, query: &Query) -> Result<Option<Document>> {
        Ok(self.search(query)?.into_iter().next())
    }

    /// True iff at least one document matches `query`.
    pub fn contains(&self, query: &Query) -> Result<bool> {
        Ok(!self.search(query)?.is_empty())
    }

    /// True iff a document exists under `doc_id`.
    pub fn contains_id(&self, doc_id: DocId) -> Result<bool> {
        Ok(self.read_table()?.contains_key(&doc_id))
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &Query) -> Result<usize> {
        Ok(self.search(query)?.len())
    }

    /// Total number of documents in the table.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_table()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_table()?.is_empty())
    }

    /// Iterates over a fresh read of the table. Each call starts a new
    /// pass; documents are materialized lazily as the iterator advances.
    pub fn iter(&self) -> Result<TableIter> {
        Ok(TableIter {
            entries: self.read_table()?.into_iter(),
        })
    }

    /// Inserts a document and returns its newly allocated ID.
    pub fn insert(&self, fields: FieldMap) -> Result<DocId> {
        let doc_id = self.with_table_mut(|table| {
            let doc_id = self.allocate_id(table);
            table.insert(doc_id, fields);
            Ok(doc_id)
        })?;
        debug!(table = %self.name, doc_id, "inserted document");
        Ok(doc_id)
    }

    /// Inserts several documents in one snapshot write; returns their IDs
    /// in input order.
    pub fn insert_multiple<I>(&self, documents: I) -> Result<Vec<DocId>>
    where
        I: IntoIterator<Item = FieldMap>,
    {
        let doc_ids = self.with_table_mut(|table| {
            let mut doc_ids = Vec::new();
            for fields in documents {
                let doc_id = self.allocate_id(table);
                table.insert(doc_id, fields);
                doc_ids.push(doc_id);
            }
            Ok(doc_ids)
        })?;
        debug!(table = %self.name, count = doc_ids.len(), "inserted documents");
        Ok(doc_ids)
    }

    /// Applies `update` to every document matching `query` and returns the
    /// updated IDs in match (ascending ID) order.
    ///
    /// Matches are collected before any mutation, so the update cannot
    /// affect which documents are selected. All mutations land in one
    /// snapshot write.
    pub fn update(&self, update: impl Into<Update>, query: &Query) -> Result<Vec<DocId>> {
        let update = update.into();
        let updated = self.with_table_mut(|table| Ok(apply_update(table, &update, query)))?;
        debug!(table = %self.name, count = updated.len(), "updated documents");
        Ok(updated)
    }

    /// Applies `update` to the given IDs that exist, skipping missing ones
    /// silently; returns the updated IDs in input order.
    pub fn update_ids(&self, update: impl Into<Update>, doc_ids: &[DocId]) -> Result<Vec<DocId>> {
        let update = update.into();
        let updated = self.with_table_mut(|table| {
            let mut updated = Vec::new();
            for doc_id in doc_ids {
                if let Some(fields) = table.get_mut(doc_id) {
                    update.apply(fields);
                    updated.push(*doc_id);
                }
            }
            Ok(updated)
        })?;
        debug!(table = %self.name, count = updated.len(), "updated documents by id");
        Ok(updated)
    }

    /// Applies each `(update, query)` pair in order, all inside one
    /// snapshot write; later pairs observe earlier pairs' mutations.
    /// Returns every updated ID in the order the sub-updates ran — an ID
    /// touched by several pairs appears once per touch.
    pub fn update_multiple(&self, updates: &[(Update, Query)]) -> Result<Vec<DocId>> {
        let updated = self.with_table_mut(|table| {
            let mut updated = Vec::new();
            for (update, query) in updates {
                updated.extend(apply_update(table, update, query));
            }
            Ok(updated)
        })?;
        debug!(table = %self.name, count = updated.len(), "applied update batch");
        Ok(updated)
    }

    /// Updates documents if they exist, inserts otherwise.
    ///
    /// When `document` carries an explicit ID (built from a [`Document`]),
    /// that ID is updated in place if present, and the fields are inserted
    /// as a brand-new document (fresh ID) if not; `query` is ignored.
    /// Without an explicit ID, `query` selects the documents to update,
    /// and if nothing matched the fields are inserted. Supplying neither
    /// an ID nor a query is an error.
    pub fn upsert(&self, document: impl Into<Upsert>, query: Option<&Query>) -> Result<Vec<DocId>> {
        let Upsert { doc_id, fields } = document.into();

        if let Some(doc_id) = doc_id {
            return if self.contains_id(doc_id)? {
                self.update_ids(Update::Fields(fields), &[doc_id])
            } else {
                Ok(vec![self.insert(fields)?])
            };
        }

        let Some(query) = query else {
            bail!("upsert needs a document with an ID or a query to match against");
        };
        let updated = self.update(Update::Fields(fields.clone()), query)?;
        if !updated.is_empty() {
            return Ok(updated);
        }
        Ok(vec![self.insert(fields)?])
    }

    /// Removes every document matching `query`; matching happens before
    /// the first deletion, and all deletions land in one snapshot write.
    /// Returns the removed IDs in ascending order.
    pub fn remove(&self, query: &Query) -> Result<Vec<DocId>> {
        let removed = self.with_table_mut(|table| {
            let matched: Vec<DocId> = table
                .iter()
                .filter(|(_, fields)| query.matches(fields))
                .map(|(doc_id, _)| *doc_id)
                .collect();
            for doc_id in &matched {
                table.remove(doc_id);
            }
            Ok(matched)
        })?;
        debug!(table = %self.name, count = removed.len(), "removed documents");
        Ok(removed)
    }

    /// Removes the given IDs that exist, skipping missing ones silently;
    /// one snapshot write for the whole batch.
    pub fn remove_ids(&self, doc_ids: &[DocId]) -> Result<Vec<DocId>> {
        let removed = self.with_table_mut(|table| {
            let mut removed = Vec::new();
            for doc_id in doc_ids {
                if table.remove(doc_id).is_some() {
                    removed.push(*doc_id);
                }
            }
            Ok(removed)
        })?;
        debug!(table = %self.name, count = removed.len(), "removed documents by id");
        Ok(removed)
    }

    /// Drops every document and restarts ID allocation at 1.
    pub fn truncate(&self) -> Result<()> {
        self.with_table_mut(|table| {
            table.clear();
            Ok(())
        })?;
        *self.next_id.lock() = None;
        debug!(table = %self.name, "truncated table");
        Ok(())
    }

    /// Clears the query cache without touching storage.
    pub fn clear_cache(&self) {
        self.query_cache.lock().clear();
    }

    fn read_table(&self) -> Result<TableData> {
        let storage = self.storage.lock();
        let snapshot = storage.read()?;
        Ok(snapshot.get(&self.name).cloned().unwrap_or_default())
    }

    /// Runs one read-modify-write cycle against storage. The storage lock
    /// is held across the whole cycle, and the query cache is cleared only
    /// after the write succeeded — a failure earlier leaves the cache
    /// stale but coherent with the unchanged snapshot.
    fn with_table_mut<T>(&self, mutate: impl FnOnce(&mut TableData) -> Result<T>) -> Result<T> {
        let mut storage = self.storage.lock();
        let mut snapshot = storage.read()?;
        let table = snapshot.entry(self.name.clone()).or_default();
        let out = mutate(table)?;
        storage.write(snapshot)?;
        drop(storage);

        self.query_cache.lock().clear();
        Ok(out)
    }

    /// Next document ID: scans `table` on the first allocation after
    /// construction or truncate, then counts in memory.
    fn allocate_id(&self, table: &TableData) -> DocId {
        let mut next_id = self.next_id.lock();
        let doc_id = match *next_id {
            Some(id) => id,
            None => table.keys().next_back().copied().unwrap_or(0) + 1,
        };
        *next_id = Some(doc_id + 1);
        doc_id
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table").field("name", &self.name).finish()
    }
}

fn apply_update(table: &mut TableData, update: &Update, query: &Query) -> Vec<DocId> {
    let matched: Vec<DocId> = table
        .iter()
        .filter(|(_, fields)| query.matches(fields))
        .map(|(doc_id, _)| *doc_id)
        .collect();
    for doc_id in &matched {
        if let Some(fields) = table.get_mut(doc_id) {
            update.apply(fields);
        }
    }
    matched
}

/// Input to [`Table::upsert`]: a field mapping plus an optional explicit
/// identity. Built from a [`Document`] it carries that document's ID;
/// built from a plain [`FieldMap`] it carries none.
#[derive(Debug, Clone)]
pub struct Upsert {
    doc_id: Option<DocId>,
    fields: FieldMap,
}

impl From<FieldMap> for Upsert {
    fn from(fields: FieldMap) -> Self {
        Self {
            doc_id: None,
            fields,
        }
    }
}

impl From<Document> for Upsert {
    fn from(document: Document) -> Self {
        Self {
            doc_id: Some(document.doc_id()),
            fields: document.into_fields(),
        }
    }
}

/// Iterator over one pass of a table; see [`Table::iter`].
pub struct TableIter {
    entries: btree_map::IntoIter<DocId, FieldMap>,
}

impl Iterator for TableIter {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        self.entries
            .next()
            .map(|(doc_id, fields)| Document::new(doc_id, fields))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for TableIter {}
