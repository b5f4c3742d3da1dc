//! Write-buffering catalog session.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::backend::{CatalogBackend, StagedWrite};
use super::criteria::Criteria;
use super::record::{decode, encode, CatalogRecord};
use crate::error::{Error, Result};

/// A unit of catalog work.
///
/// Saved records are staged in memory and visible to this session's reads.
/// They reach the backend only on [`flush`](Self::flush), all at once, and
/// are dropped by [`clear`](Self::clear).
pub struct CatalogSession<B: CatalogBackend> {
    backend: B,
    staged: BTreeMap<(&'static str, String), Vec<u8>>,
}

impl<B: CatalogBackend> CatalogSession<B> {
    /// Open a session over a backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            staged: BTreeMap::new(),
        }
    }

    /// Get a record by id.
    pub fn get<R: CatalogRecord>(&self, id: &str) -> Result<Option<R>> {
        if let Some(bytes) = self.staged.get(&(R::KIND, id.to_string())) {
            return decode(bytes).map(Some);
        }
        match self.backend.load(R::KIND, id)? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Get a record by id, failing with `NotFound` when absent.
    pub fn require<R: CatalogRecord>(&self, id: &str) -> Result<R> {
        self.get(id)?
            .ok_or_else(|| Error::not_found(format!("{} '{}' not found", R::KIND, id)))
    }

    /// Find every record matching the criteria, ordered by id.
    pub fn find<R: CatalogRecord>(&self, criteria: &Criteria) -> Result<Vec<R>> {
        let mut merged: BTreeMap<String, Vec<u8>> = self.backend.scan(R::KIND)?.into_iter().collect();
        for ((kind, id), bytes) in &self.staged {
            if *kind == R::KIND {
                merged.insert(id.clone(), bytes.clone());
            }
        }

        let limit = criteria.limit().unwrap_or(usize::MAX);
        let mut found = Vec::new();
        for bytes in merged.values() {
            if found.len() >= limit {
                break;
            }
            let document: Value = serde_json::from_slice(bytes)
                .map_err(|e| Error::Deserialization(e.to_string()))?;
            if criteria.matches(&document) {
                found.push(
                    serde_json::from_value(document)
                        .map_err(|e| Error::Deserialization(e.to_string()))?,
                );
            }
        }
        Ok(found)
    }

    /// Find the first record matching the criteria.
    pub fn find_one<R: CatalogRecord>(&self, criteria: &Criteria) -> Result<Option<R>> {
        let criteria = criteria.clone().max_results(1);
        Ok(self.find(&criteria)?.into_iter().next())
    }

    /// Stage a record for the next flush.
    pub fn save<R: CatalogRecord>(&mut self, record: &R) -> Result<()> {
        let bytes = encode(record)?;
        self.staged.insert((R::KIND, record.id().to_string()), bytes);
        Ok(())
    }

    /// Number of staged records.
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    /// Commit every staged record. Returns the number committed.
    ///
    /// The staging area is emptied whether or not the commit succeeds.
    pub fn flush(&mut self) -> Result<usize> {
        let staged = std::mem::take(&mut self.staged);
        let count = staged.len();
        if count == 0 {
            return Ok(0);
        }

        let batch = staged
            .into_iter()
            .map(|((kind, id), bytes)| StagedWrite { kind, id, bytes })
            .collect();
        match self.backend.commit(batch) {
            Ok(()) => {
                debug!(records = count, "catalog session flushed");
                Ok(count)
            }
            Err(e) => {
                warn!(records = count, error = %e, "catalog flush failed");
                Err(e)
            }
        }
    }

    /// Drop every staged record.
    pub fn clear(&mut self) {
        if !self.staged.is_empty() {
            debug!(records = self.staged.len(), "discarding staged catalog writes");
        }
        self.staged.clear();
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the underlying backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Close the session, returning its backend. Staged records are dropped.
    pub fn into_backend(self) -> B {
        self.backend
    }
}
