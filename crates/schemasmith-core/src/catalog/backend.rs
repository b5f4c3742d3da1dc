//! Storage backends for catalog records.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use tracing::debug;

use crate::error::{Error, Result};

/// Prefix of every sled tree holding catalog records.
const TREE_PREFIX: &str = "catalog:";

/// One encoded record waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedWrite {
    /// Record kind.
    pub kind: &'static str,
    /// Record id.
    pub id: String,
    /// Encoded record.
    pub bytes: Vec<u8>,
}

/// Byte-level record storage.
///
/// `commit` must apply a whole batch or nothing.
pub trait CatalogBackend {
    /// Load one encoded record.
    fn load(&self, kind: &str, id: &str) -> Result<Option<Vec<u8>>>;

    /// Load every encoded record of a kind, ordered by id.
    fn scan(&self, kind: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Atomically persist a batch.
    fn commit(&mut self, batch: Vec<StagedWrite>) -> Result<()>;
}

/// Volatile backend for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    kinds: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records of a kind.
    pub fn count(&self, kind: &str) -> usize {
        self.kinds.get(kind).map_or(0, BTreeMap::len)
    }
}

impl CatalogBackend for MemoryBackend {
    fn load(&self, kind: &str, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.kinds.get(kind).and_then(|records| records.get(id)).cloned())
    }

    fn scan(&self, kind: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .kinds
            .get(kind)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, bytes)| (id.clone(), bytes.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit(&mut self, batch: Vec<StagedWrite>) -> Result<()> {
        for write in batch {
            self.kinds
                .entry(write.kind.to_string())
                .or_default()
                .insert(write.id, write.bytes);
        }
        Ok(())
    }
}

/// Persistent backend over a sled database, one tree per record kind.
pub struct SledBackend {
    db: Db,
}

impl SledBackend {
    /// Open or create a catalog database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Wrap an already opened database.
    pub fn from_db(db: Db) -> Self {
        Self { db }
    }

    /// Open a temporary database removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn tree(&self, kind: &str) -> Result<Tree> {
        Ok(self.db.open_tree(format!("{}{}", TREE_PREFIX, kind))?)
    }
}

impl CatalogBackend for SledBackend {
    fn load(&self, kind: &str, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.tree(kind)?.get(id.as_bytes())?.map(|v| v.to_vec()))
    }

    fn scan(&self, kind: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mut records = Vec::new();
        for entry in self.tree(kind)?.iter() {
            let (key, value) = entry?;
            let id = String::from_utf8(key.to_vec())
                .map_err(|e| Error::Deserialization(e.to_string()))?;
            records.push((id, value.to_vec()));
        }
        Ok(records)
    }

    fn commit(&mut self, batch: Vec<StagedWrite>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut kinds: Vec<&'static str> = batch.iter().map(|w| w.kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        let trees = kinds
            .iter()
            .map(|kind| self.tree(kind))
            .collect::<Result<Vec<_>>>()?;

        let result: std::result::Result<(), TransactionError<()>> =
            trees.as_slice().transaction(|views| {
                for write in &batch {
                    let slot = kinds
                        .binary_search(&write.kind)
                        .map_err(|_| ConflictableTransactionError::Abort(()))?;
                    views[slot].insert(write.id.as_bytes(), write.bytes.as_slice())?;
                }
                Ok(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(())) => {
                return Err(Error::CatalogRegistration(
                    "catalog commit aborted".to_string(),
                ))
            }
            Err(TransactionError::Storage(e)) => return Err(Error::Storage(e)),
        }

        self.db.flush()?;
        debug!(records = batch.len(), "catalog batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(kind: &'static str, id: &str, body: &str) -> StagedWrite {
        StagedWrite {
            kind,
            id: id.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn exercise(backend: &mut dyn CatalogBackend) {
        backend
            .commit(vec![
                write("table", "B", "{\"id\":\"B\"}"),
                write("table", "A", "{\"id\":\"A\"}"),
                write("column", "C", "{\"id\":\"C\"}"),
            ])
            .unwrap();

        assert_eq!(
            backend.load("table", "A").unwrap().unwrap(),
            b"{\"id\":\"A\"}".to_vec()
        );
        assert!(backend.load("table", "C").unwrap().is_none());

        let ids: Vec<String> = backend
            .scan("table")
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(backend.scan("window").unwrap().is_empty());
    }

    #[test]
    fn test_memory_backend() {
        let mut backend = MemoryBackend::new();
        exercise(&mut backend);
        assert_eq!(backend.count("table"), 2);
    }

    #[test]
    fn test_sled_backend() {
        let mut backend = SledBackend::temporary().unwrap();
        exercise(&mut backend);
    }

    #[test]
    fn test_sled_backend_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut backend = SledBackend::open(dir.path()).unwrap();
            backend.commit(vec![write("module", "M", "{}")]).unwrap();
        }
        let backend = SledBackend::open(dir.path()).unwrap();
        assert!(backend.load("module", "M").unwrap().is_some());
    }
}
