//! # docketdb — Embedded Document Database
//!
//! docketdb stores schema-less JSON documents in named tables. Documents
//! are identified by integer IDs, queried with arbitrary predicates, and
//! persisted through a pluggable whole-snapshot storage backend. Query
//! results are memoized in a small per-table LRU cache that every write
//! invalidates.
//!
//! ## Quick Start
//!
//! ```ignore
//! use docketdb::{Database, Query};
//! use serde_json::json;
//!
//! let db = Database::open("./app.json")?;
//! let users = db.table("users");
//!
//! let id = users.insert(json!({"name": "ada", "age": 36}).as_object().unwrap().clone())?;
//!
//! let adults = Query::new(|doc| doc.get("age").and_then(|v| v.as_i64()).unwrap_or(0) >= 18);
//! for doc in users.search(&adults)? {
//!     println!("{}: {:?}", doc.doc_id(), doc.fields());
//! }
//!
//! users.update(docketdb::operations::increment("age"), &adults)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Database (registry, builder)      │
//! ├─────────────────────────────────────────┤
//! │  Table (queries, writes, ID allocation) │
//! │          │ LRU query cache              │
//! ├─────────────────────────────────────────┤
//! │   Storage (whole-snapshot read/write)   │
//! │        memory  │  single JSON file      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Storage exposes only whole-snapshot `read` and `write`; every mutating
//! table operation is one read-modify-write cycle under a lock on the
//! shared storage handle, and batches all of its document mutations into
//! a single write.
//!
//! ## Module Overview
//!
//! - [`cache`]: LRU cache backing per-table query memoization
//! - [`database`]: front door and builder
//! - [`document`]: the document and field model
//! - [`operations`]: update payloads and field transforms
//! - [`query`]: opaque predicate handles
//! - [`storage`]: snapshot storage trait and backends
//! - [`table`]: tables — the core of the crate

pub mod cache;
pub mod database;
pub mod document;
pub mod operations;
pub mod query;
pub mod storage;
pub mod table;

pub use database::{Database, DatabaseBuilder, DEFAULT_TABLE_NAME};
pub use document::{DocId, Document, FieldMap};
pub use operations::Update;
pub use query::Query;
pub use storage::{JsonStorage, MemoryStorage, SharedStorage, Snapshot, Storage, TableData};
pub use table::{Table, TableIter, Upsert, DEFAULT_QUERY_CACHE_CAPACITY};
