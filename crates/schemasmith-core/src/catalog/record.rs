//! The record abstraction shared by every catalog kind.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// A metadata record stored in the catalog.
///
/// Records are encoded as JSON documents. Criteria match against the field
/// names of that encoding, so a record's serde field names are its query
/// surface.
pub trait CatalogRecord: Serialize + DeserializeOwned + Clone {
    /// Record kind; also the name of the storage tree holding it.
    const KIND: &'static str;

    /// Record id, unique within its kind.
    fn id(&self) -> &str;
}

/// Generate a fresh record id: 32 upper-case hex characters.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string().to_uppercase()
}

/// Encode a record for storage.
pub fn encode<R: CatalogRecord>(record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a stored record.
pub fn decode<R: CatalogRecord>(bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_shape() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(id, new_id());
    }
}
