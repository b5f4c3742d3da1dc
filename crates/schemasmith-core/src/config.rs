//! Engine configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::naming::{DEFAULT_RANDOM_ATTEMPTS, MAX_IDENTIFIER_LENGTH};

/// Data access level given to tables created without one.
pub const DEFAULT_ACCESS_LEVEL: &str = "4";

/// Data access level of tables registered over existing relations.
pub const REGISTERED_ACCESS_LEVEL: &str = "3";

/// Configuration of a schema-mutation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SmithConfig {
    /// Directory of the persistent catalog.
    pub catalog_path: PathBuf,

    /// Connection string of the live database. None means no live schema.
    pub database_url: Option<String>,

    /// Longest identifier synthesized. May lower, never raise,
    /// [`MAX_IDENTIFIER_LENGTH`].
    pub max_identifier_length: usize,

    /// Random names tried before identifier synthesis gives up.
    pub random_attempts: usize,

    /// Access level for new tables and views when the caller gives none.
    pub default_access_level: String,
}

impl Default for SmithConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("./schemasmith-catalog"),
            database_url: None,
            max_identifier_length: MAX_IDENTIFIER_LENGTH,
            random_attempts: DEFAULT_RANDOM_ATTEMPTS,
            default_access_level: DEFAULT_ACCESS_LEVEL.to_string(),
        }
    }
}

impl SmithConfig {
    /// Configuration with a catalog stored under `path`.
    pub fn new(catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            ..Default::default()
        }
    }

    /// Set the database connection string.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the identifier length limit.
    pub fn with_max_identifier_length(mut self, length: usize) -> Self {
        self.max_identifier_length = length;
        self
    }

    /// Set the random fallback budget.
    pub fn with_random_attempts(mut self, attempts: usize) -> Self {
        self.random_attempts = attempts;
        self
    }

    /// Set the default data access level.
    pub fn with_default_access_level(mut self, level: impl Into<String>) -> Self {
        self.default_access_level = level.into();
        self
    }

    /// Check the settings against the limits of the target schema.
    pub fn validate(&self) -> Result<()> {
        if self.max_identifier_length == 0 || self.max_identifier_length > MAX_IDENTIFIER_LENGTH {
            return Err(Error::validation(format!(
                "max identifier length must be between 1 and {}, got {}",
                MAX_IDENTIFIER_LENGTH, self.max_identifier_length
            )));
        }
        if self.random_attempts == 0 {
            return Err(Error::validation("random attempts must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SmithConfig::default();
        assert_eq!(config.max_identifier_length, 30);
        assert_eq!(config.random_attempts, 8);
        assert_eq!(config.default_access_level, "4");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_builder() {
        let config = SmithConfig::new("/tmp/catalog")
            .with_database_url("postgres://localhost/etendo")
            .with_random_attempts(3)
            .with_default_access_level("3");
        assert_eq!(config.catalog_path, PathBuf::from("/tmp/catalog"));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/etendo"));
        assert_eq!(config.random_attempts, 3);
        assert_eq!(config.default_access_level, "3");
    }

    #[test]
    fn test_validate_identifier_ceiling() {
        assert!(SmithConfig::default().validate().is_ok());
        assert!(SmithConfig::default()
            .with_max_identifier_length(24)
            .validate()
            .is_ok());

        let err = SmithConfig::default()
            .with_max_identifier_length(63)
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "max identifier length must be between 1 and 30, got 63"
        );
        assert!(SmithConfig::default()
            .with_random_attempts(0)
            .validate()
            .is_err());
    }
}
