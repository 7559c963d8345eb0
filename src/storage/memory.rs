//! In-memory storage backend; snapshots live and die with the process.

use eyre::Result;

use super::{Snapshot, Storage};

/// Storage backend holding the snapshot in memory.
///
/// `read` hands out a copy of the current snapshot, `write` replaces it.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: Snapshot,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }

    fn write(&mut self, snapshot: Snapshot) -> Result<()> {
        self.snapshot = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableData;

    #[test]
    fn fresh_storage_reads_empty() {
        let storage = MemoryStorage::new();
        assert!(storage.read().unwrap().is_empty());
    }

    #[test]
    fn write_replaces_the_snapshot() {
        let mut storage = MemoryStorage::new();

        let mut snapshot = Snapshot::new();
        snapshot.insert("letters".to_string(), TableData::new());
        storage.write(snapshot.clone()).unwrap();
        assert_eq!(storage.read().unwrap(), snapshot);

        storage.write(Snapshot::new()).unwrap();
        assert!(storage.read().unwrap().is_empty());
    }
}
