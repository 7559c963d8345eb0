//! # Database
//!
//! The front door of the crate: a [`Database`] owns the shared storage
//! handle and hands out one [`Table`] instance per name. Handles are
//! created lazily and shared, so every caller asking for `"users"` talks
//! to the same table object — and therefore the same query cache and ID
//! allocator.
//!
//! Databases are configured through [`DatabaseBuilder`]:
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("./app.json")
//!     .cache_capacity(32)
//!     .open()?;
//!
//! let users = db.table("users");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{bail, Result};
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::storage::{shared, JsonStorage, MemoryStorage, SharedStorage, Snapshot, Storage};
use crate::table::{Table, DEFAULT_QUERY_CACHE_CAPACITY};

/// Name of the table used when none is specified.
pub const DEFAULT_TABLE_NAME: &str = "_default";

/// An embedded document database: shared storage plus a registry of
/// tables.
pub struct Database {
    storage: SharedStorage,
    tables: Mutex<HashMap<String, Arc<Table>>>,
    cache_capacity: usize,
}

impl Database {
    /// Starts building a database; see [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Opens a JSON-file database at `path` with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Creates a database over in-memory storage.
    pub fn in_memory() -> Self {
        Self {
            storage: shared(MemoryStorage::new()),
            tables: Mutex::new(HashMap::new()),
            cache_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
        }
    }

    /// Returns the table registered under `name`, creating the handle on
    /// first use. Repeated calls return the same shared instance.
    pub fn table(&self, name: &str) -> Arc<Table> {
        let mut tables = self.tables.lock();
        match tables.get(name) {
            Some(table) => Arc::clone(table),
            None => {
                let table = Arc::new(Table::with_cache_capacity(
                    Arc::clone(&self.storage),
                    name,
                    self.cache_capacity,
                ));
                tables.insert(name.to_string(), Arc::clone(&table));
                table
            }
        }
    }

    /// The table used when no name is given.
    pub fn default_table(&self) -> Arc<Table> {
        self.table(DEFAULT_TABLE_NAME)
    }

    /// Names of every table present in storage, in snapshot order.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let storage = self.storage.lock();
        Ok(storage.read()?.keys().cloned().collect())
    }

    /// Removes `name`'s documents from storage and forgets its handle.
    /// A handle still held by a caller keeps working over the now-empty
    /// table; its cached query results are invalidated here.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        {
            let mut storage = self.storage.lock();
            let mut snapshot = storage.read()?;
            snapshot.remove(name);
            storage.write(snapshot)?;
        }

        if let Some(table) = self.tables.lock().remove(name) {
            table.clear_cache();
        }
        debug!(table = name, "dropped table");
        Ok(())
    }

    /// Drops every table in one storage write.
    pub fn drop_all_tables(&self) -> Result<()> {
        {
            let mut storage = self.storage.lock();
            storage.write(Snapshot::new())?;
        }

        let mut tables = self.tables.lock();
        for table in tables.values() {
            table.clear_cache();
        }
        tables.clear();
        debug!("dropped all tables");
        Ok(())
    }

    /// The shared storage handle backing this database.
    pub fn storage(&self) -> SharedStorage {
        Arc::clone(&self.storage)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

enum BackendChoice {
    Json(PathBuf),
    Memory,
    Custom(SharedStorage),
}

/// Builder for configuring and opening a [`Database`].
///
/// Exactly one storage backend must be selected before calling `open`.
pub struct DatabaseBuilder {
    backend: Option<BackendChoice>,
    cache_capacity: usize,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            cache_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
        }
    }

    /// Selects JSON-file storage at `path`. The file is created on first
    /// open if it does not exist.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.backend = Some(BackendChoice::Json(path.as_ref().to_path_buf()));
        self
    }

    /// Selects in-memory storage.
    pub fn in_memory(mut self) -> Self {
        self.backend = Some(BackendChoice::Memory);
        self
    }

    /// Selects a custom storage backend.
    pub fn storage<S: Storage + 'static>(mut self, storage: S) -> Self {
        self.backend = Some(BackendChoice::Custom(shared(storage)));
        self
    }

    /// Sets the per-table query-cache capacity; 0 disables query caching.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Opens the database with the configured settings.
    ///
    /// # Errors
    ///
    /// Fails when no storage backend was selected, or when the selected
    /// backend cannot be opened.
    pub fn open(self) -> Result<Database> {
        let storage = match self.backend {
            Some(BackendChoice::Json(path)) => shared(JsonStorage::open(path)?),
            Some(BackendChoice::Memory) => shared(MemoryStorage::new()),
            Some(BackendChoice::Custom(storage)) => storage,
            None => {
                bail!("no storage backend selected: call .path(), .in_memory(), or .storage() first")
            }
        };

        Ok(Database {
            storage,
            tables: Mutex::new(HashMap::new()),
            cache_capacity: self.cache_capacity,
        })
    }

    /// Returns the configured JSON file path, if that backend is selected.
    pub fn get_path(&self) -> Option<&Path> {
        match &self.backend {
            Some(BackendChoice::Json(path)) => Some(path),
            _ => None,
        }
    }

    /// Returns the configured query-cache capacity.
    pub fn get_cache_capacity(&self) -> usize {
        self.cache_capacity
    }
}
