//! Runs DDL statements against a schema gateway.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::gateway::SchemaGateway;
use super::statement::DdlStatement;
use crate::error::{Error, Result};

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionReport {
    /// Statement kind.
    pub kind: &'static str,
    /// Relation that was changed.
    pub target: String,
    /// SQL text sent to the database.
    pub sql: String,
}

/// DDL executor.
///
/// Failures surface as [`Error::SchemaMutation`] carrying the database
/// message. Nothing is retried or split.
pub struct DdlExecutor<G> {
    gateway: G,
}

impl<G: SchemaGateway> DdlExecutor<G> {
    /// Create an executor over a gateway.
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Execute one statement.
    #[instrument(skip(self, statement), fields(kind = statement.kind(), target = %statement.target()))]
    pub fn execute(&mut self, statement: &DdlStatement) -> Result<ExecutionReport> {
        let sql = statement.to_sql();
        match self.gateway.apply(statement) {
            Ok(()) => {
                info!("DDL applied");
                Ok(ExecutionReport {
                    kind: statement.kind(),
                    target: statement.target().to_string(),
                    sql,
                })
            }
            Err(e) => {
                warn!(error = %e, sql = %sql, "DDL failed");
                Err(Error::from(e))
            }
        }
    }

    /// The gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Mutable access to the gateway.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Consume the executor, returning its gateway.
    pub fn into_gateway(self) -> G {
        self.gateway
    }
}
