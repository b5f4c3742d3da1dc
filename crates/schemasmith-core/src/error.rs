//! Core error types.

use thiserror::Error;

/// Errors raised while extending the schema or its metadata catalog.
///
/// The `Display` output of every variant is the text returned to callers under
/// the `error` key of an operation response.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input is missing, blank, or malformed.
    #[error("{0}")]
    Validation(String),

    /// A referenced module, table, column, window or type does not resolve.
    #[error("{0}")]
    NotFound(String),

    /// The module owns no database prefix.
    #[error("no database prefix found for module '{module}'")]
    PrefixNotFound {
        /// Module id or prefix that was looked up.
        module: String,
    },

    /// The module is not flagged as in development.
    #[error("module '{module}' is not in development")]
    ModuleNotInDevelopment {
        /// Module name.
        module: String,
    },

    /// A table descriptor with this physical name already exists.
    #[error("table name '{name}' is already in use")]
    NameAlreadyInUse {
        /// The conflicting physical name.
        name: String,
    },

    /// Neither the logical type nor its parent maps to a physical type.
    #[error("column type not found: {name}")]
    UnknownType {
        /// Logical type name.
        name: String,
    },

    /// DDL execution failed at the database; carries its message verbatim.
    #[error("{message}")]
    SchemaMutation {
        /// Database error message.
        message: String,
    },

    /// Persisting a catalog descriptor failed.
    #[error("catalog registration failed: {0}")]
    CatalogRegistration(String),

    /// Physical DDL was applied but the catalog commit failed afterwards.
    #[error(
        "partial failure: physical object '{object}' was created but its catalog descriptor \
         could not be committed ({reason}); the physical object may need to be dropped"
    )]
    PartialFailure {
        /// Physical object that now exists without a descriptor.
        object: String,
        /// Underlying commit failure.
        reason: String,
    },

    /// No legal, unique identifier could be synthesized.
    #[error("could not synthesize a unique identifier for '{base}'")]
    IdentifierExhausted {
        /// The name the synthesizer started from.
        base: String,
    },

    /// Catalog storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Record encoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record decoding error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// An operation tried to move to a phase it may not enter.
    #[error(transparent)]
    Transition(#[from] crate::ops::InvalidTransition),
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Shorthand for a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    /// Check if this error left the physical schema and the catalog diverged.
    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Error::PartialFailure { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_in_use_display() {
        let err = Error::NameAlreadyInUse {
            name: "test_my_table".into(),
        };
        assert!(err.to_string().contains("already in use"));
    }

    #[test]
    fn test_schema_mutation_is_verbatim() {
        let err = Error::SchemaMutation {
            message: "relation \"foo\" does not exist".into(),
        };
        assert_eq!(err.to_string(), "relation \"foo\" does not exist");
    }

    #[test]
    fn test_partial_failure_flag() {
        let err = Error::PartialFailure {
            object: "test_thing".into(),
            reason: "disk full".into(),
        };
        assert!(err.is_partial_failure());
        assert!(err.to_string().contains("test_thing"));
        assert!(!Error::validation("x").is_partial_failure());
    }
}
