//! # JSON File Storage
//!
//! Persists the snapshot as a single JSON file: an object keyed by table
//! name, each table an object keyed by document ID (IDs appear as string
//! keys in the file, since JSON object keys are strings). The whole file is
//! parsed on every read and rewritten on every write.
//!
//! Writes land in a temporary sibling file first and are renamed into
//! place. A reader that opens the file concurrently sees either the
//! previous snapshot or the new one, never a torn file.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};

use super::{Snapshot, Storage};

/// Storage backend persisting the snapshot to one JSON file.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Opens the JSON file at `path`, creating it (and any missing parent
    /// directories) on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).wrap_err_with(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }
        if !path.exists() {
            fs::write(&path, b"{}").wrap_err_with(|| {
                format!("failed to create database file {}", path.display())
            })?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for JsonStorage {
    fn read(&self) -> Result<Snapshot> {
        let bytes = fs::read(&self.path).wrap_err_with(|| {
            format!("failed to read database file {}", self.path.display())
        })?;

        // An empty or whitespace-only file counts as an empty database.
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Snapshot::new());
        }

        serde_json::from_slice(&bytes).wrap_err_with(|| {
            format!("database file {} is not valid JSON", self.path.display())
        })
    }

    fn write(&mut self, snapshot: Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec(&snapshot).wrap_err("failed to serialize snapshot")?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes)
            .wrap_err_with(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .wrap_err_with(|| format!("failed to replace {}", self.path.display()))?;

        Ok(())
    }
}
