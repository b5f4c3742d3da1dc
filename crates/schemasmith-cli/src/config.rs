//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use schemasmith_core::naming::{DEFAULT_RANDOM_ATTEMPTS, MAX_IDENTIFIER_LENGTH};
use schemasmith_core::SmithConfig;

/// Default catalog directory.
pub const DEFAULT_CATALOG_PATH: &str = "./schemasmith-catalog";

/// Command-line arguments for the schemasmith tool.
#[derive(Parser, Debug)]
#[command(name = "schemasmith")]
#[command(version, about = "Extend a live schema and its metadata catalog", long_about = None)]
pub struct Args {
    /// Path to the catalog storage directory.
    #[arg(short, long, default_value = DEFAULT_CATALOG_PATH)]
    pub catalog_path: PathBuf,

    /// PostgreSQL connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Apply DDL to an in-memory schema model instead of the database.
    #[arg(long)]
    pub dry_run: bool,

    /// Log level for schemasmith targets (overrides RUST_LOG).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Longest identifier synthesized, at most the schema's ceiling.
    #[arg(long, default_value_t = MAX_IDENTIFIER_LENGTH)]
    pub max_identifier_length: usize,

    /// Random names tried before identifier synthesis gives up.
    #[arg(long, default_value_t = DEFAULT_RANDOM_ATTEMPTS)]
    pub random_attempts: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Seed the catalog with the standard types and the core module.
    Init,

    /// Manage modules.
    #[command(subcommand)]
    Module(ModuleCommand),

    /// Run one operation and print its response as JSON.
    Run {
        /// Operation name, e.g. create_table.
        operation: String,

        /// Operation parameter as key=value. May be repeated.
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// List the available operations.
    Ops,

    /// Run a SELECT against the schema and print the rows as JSON.
    Sql {
        /// The query to run.
        query: String,
    },
}

/// Module subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ModuleCommand {
    /// Register a module with its database prefix.
    Add {
        /// Module name.
        #[arg(long)]
        name: String,

        /// Database prefix owned by the module.
        #[arg(long)]
        prefix: String,

        /// Java package of the module.
        #[arg(long)]
        java_package: String,

        /// Register the module as released instead of in development.
        #[arg(long)]
        released: bool,
    },
}

impl Args {
    /// Convert command-line arguments to engine configuration.
    pub fn into_config(self) -> (SmithConfig, Command) {
        let mut config = SmithConfig::new(self.catalog_path)
            .with_max_identifier_length(self.max_identifier_length)
            .with_random_attempts(self.random_attempts);
        if !self.dry_run {
            if let Some(url) = self.database_url {
                config = config.with_database_url(url);
            }
        }
        (config, self.command)
    }
}

/// Parse a `key=value` operation parameter.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid parameter '{}', expected key=value", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("Name=orders").unwrap(),
            ("Name".to_string(), "orders".to_string())
        );
        assert_eq!(
            parse_param("QuerySelect=select a = b").unwrap(),
            ("QuerySelect".to_string(), "select a = b".to_string())
        );
        assert_eq!(
            parse_param("Help=").unwrap(),
            ("Help".to_string(), String::new())
        );
        assert!(parse_param("orders").is_err());
        assert!(parse_param("=orders").is_err());
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "schemasmith",
            "--catalog-path",
            "/tmp/catalog",
            "run",
            "create_table",
            "-p",
            "Name=orders",
            "--param",
            "ModuleID=42",
        ]);
        assert_eq!(args.catalog_path, PathBuf::from("/tmp/catalog"));
        assert_eq!(
            args.command,
            Command::Run {
                operation: "create_table".to_string(),
                params: vec![
                    ("Name".to_string(), "orders".to_string()),
                    ("ModuleID".to_string(), "42".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_dry_run_drops_database_url() {
        let args = Args::parse_from([
            "schemasmith",
            "--database-url",
            "postgres://localhost/etendo",
            "--dry-run",
            "init",
        ]);
        let (config, command) = args.into_config();
        assert!(config.database_url.is_none());
        assert_eq!(command, Command::Init);
    }

    #[test]
    fn test_into_config() {
        let args = Args::parse_from([
            "schemasmith",
            "--database-url",
            "postgres://localhost/etendo",
            "--max-identifier-length",
            "24",
            "ops",
        ]);
        let (config, _) = args.into_config();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/etendo")
        );
        assert_eq!(config.max_identifier_length, 24);
        assert_eq!(config.catalog_path, PathBuf::from(DEFAULT_CATALOG_PATH));
    }
}
