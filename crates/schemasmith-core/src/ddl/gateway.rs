//! The connection to the physical schema.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::statement::DdlStatement;
use crate::error::Error;
use crate::naming::NameOracle;

/// Errors raised by a schema gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The database rejected a statement; the message is the database's own.
    #[error("{0}")]
    Database(String),

    /// The database could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// The gateway cannot serve this request.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<GatewayError> for Error {
    fn from(e: GatewayError) -> Self {
        Error::SchemaMutation {
            message: e.to_string(),
        }
    }
}

/// Rows returned by a raw query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// One JSON object per row.
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The result as `{"result": [rows...]}`.
    pub fn to_json(&self) -> Value {
        let rows = self.rows.iter().cloned().map(Value::Object).collect();
        let mut body = Map::new();
        body.insert("result".to_string(), Value::Array(rows));
        Value::Object(body)
    }
}

/// A live or simulated physical schema.
///
/// The [`NameOracle`] half answers collision checks for the identifier
/// synthesizer.
pub trait SchemaGateway: NameOracle {
    /// Execute one DDL statement. DDL auto-commits.
    fn apply(&mut self, statement: &DdlStatement) -> Result<(), GatewayError>;

    /// Run a raw query and return its rows.
    fn query(&self, sql: &str) -> Result<QueryResult, GatewayError>;

    /// Column names a select query would produce, without running it.
    fn projection(&self, select: &str) -> Result<Vec<String>, GatewayError>;

    /// Check whether `table` has a column named `column`.
    fn column_exists(&self, table: &str, column: &str) -> crate::Result<bool>;

    /// Check whether a foreign key on `table.column` references `target`.
    fn foreign_key_exists(&self, table: &str, column: &str, target: &str) -> crate::Result<bool>;
}
