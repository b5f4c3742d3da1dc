//! Schemasmith command-line front end.
//!
//! Opens the catalog and a schema gateway, runs one command and prints the
//! result as JSON.

pub mod commands;
pub mod config;
pub mod error;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use commands::{execute, run_command};
pub use config::{Args, Command, ModuleCommand};
pub use error::{Error, Result};

/// Default log filter when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "schemasmith=info";

/// Build the log filter. An explicit level wins over `RUST_LOG`.
pub fn log_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => EnvFilter::try_new(format!("schemasmith={}", level))
            .map_err(|e| Error::Config(format!("invalid log level '{}': {}", level, e))),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
pub fn init_tracing(level: Option<&str>) -> Result<()> {
    tracing_subscriber::registry()
        .with(log_filter(level)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter() {
        assert!(log_filter(Some("debug")).is_ok());
        assert!(log_filter(Some("not a level!")).is_err());
        assert!(log_filter(None).is_ok());
    }
}
