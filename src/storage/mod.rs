//! # Snapshot Storage
//!
//! Storage backends persist the entire table set as one snapshot value: a
//! mapping from table name to that table's documents, keyed by ID. The
//! interface is intentionally coarse — `read` returns the whole snapshot,
//! `write` replaces it — which keeps backends trivial to implement and puts
//! all mutation logic in one place, the table's read-modify-write cycle.
//!
//! A table that has never been written is simply absent from the snapshot;
//! backends must not treat that as an error.
//!
//! Two backends ship with the crate: [`MemoryStorage`] for ephemeral
//! databases and tests, and [`JsonStorage`] for a single JSON file on disk.
//! Anything else (a network blob, an encrypted file) can plug in through
//! the [`Storage`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use eyre::Result;
use parking_lot::Mutex;

use crate::document::{DocId, FieldMap};

mod json;
mod memory;

pub use json::JsonStorage;
pub use memory::MemoryStorage;

/// One table's persisted documents, keyed by ID in ascending order.
pub type TableData = BTreeMap<DocId, FieldMap>;

/// The entire persisted state: table name to table data.
pub type Snapshot = BTreeMap<String, TableData>;

/// Whole-snapshot storage backend.
pub trait Storage: Send {
    /// Returns the persisted state, or an empty snapshot when nothing has
    /// been written yet.
    fn read(&self) -> Result<Snapshot>;

    /// Replaces the persisted state with `snapshot`.
    fn write(&mut self, snapshot: Snapshot) -> Result<()>;
}

/// Shared handle to a storage backend.
///
/// The mutex scopes exclusive access for a whole read-modify-write cycle:
/// a writer locks the handle, reads, mutates, writes, and only then
/// unlocks, so two in-process writers can never interleave their cycles
/// and lose an update.
pub type SharedStorage = Arc<Mutex<dyn Storage>>;

/// Wraps a backend into a [`SharedStorage`] handle.
pub fn shared<S: Storage + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}
