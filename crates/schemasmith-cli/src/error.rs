//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Error raised by the engine.
    #[error(transparent)]
    Core(#[from] schemasmith_core::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Output encoding error.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    /// The invoked operation reported an error.
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, Error>;
