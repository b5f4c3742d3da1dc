//! PostgreSQL schema gateway.
//!
//! Enable with `--features postgres`. Calls block on a private Tokio runtime,
//! so the gateway can be used from synchronous code.

use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, Executor, PgPool, Statement};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::gateway::{GatewayError, QueryResult, SchemaGateway};
use super::statement::{DdlStatement, SCHEMA};
use crate::naming::NameOracle;

/// Gateway over a PostgreSQL connection pool.
pub struct PgGateway {
    pool: PgPool,
    rt: Runtime,
}

impl PgGateway {
    /// Connect to `database_url`.
    pub fn connect(database_url: &str) -> Result<Self, GatewayError> {
        let rt = Runtime::new().map_err(|e| GatewayError::Connection(e.to_string()))?;
        let pool = rt
            .block_on(
                PgPoolOptions::new()
                    .max_connections(2)
                    .connect(database_url),
            )
            .map_err(map_sqlx)?;
        info!("connected to PostgreSQL");
        Ok(Self { pool, rt })
    }

    fn exists(&self, sql: &str, args: &[&str]) -> crate::Result<bool> {
        let found = self.rt.block_on(async {
            let mut query = sqlx::query_scalar::<_, bool>(sql);
            for arg in args {
                query = query.bind(arg.to_lowercase());
            }
            query.fetch_one(&self.pool).await
        });
        Ok(found.map_err(map_sqlx)?)
    }
}

impl NameOracle for PgGateway {
    fn constraint_exists(&self, name: &str) -> crate::Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM information_schema.table_constraints \
             WHERE lower(constraint_name) = $1)",
            &[name],
        )
    }

    fn relation_exists(&self, name: &str) -> crate::Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND lower(table_name) = $2)",
            &[SCHEMA, name],
        )
    }
}

impl SchemaGateway for PgGateway {
    fn apply(&mut self, statement: &DdlStatement) -> Result<(), GatewayError> {
        let sql = statement.to_sql();
        debug!(sql = %sql, "executing DDL");
        self.rt
            .block_on(sqlx::query(&sql).execute(&self.pool))
            .map_err(map_sqlx)?;
        Ok(())
    }

    fn query(&self, sql: &str) -> Result<QueryResult, GatewayError> {
        let select = super::statement::trim_select(sql);
        let columns = self.projection(select)?;
        let wrapped = format!(
            "SELECT coalesce(json_agg(q), '[]'::json) FROM ({}) AS q",
            select
        );
        let rows: Value = self
            .rt
            .block_on(sqlx::query_scalar::<_, Value>(&wrapped).fetch_one(&self.pool))
            .map_err(map_sqlx)?;
        let rows = match rows {
            Value::Array(rows) => rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect::<Vec<Map<String, Value>>>(),
            _ => Vec::new(),
        };
        Ok(QueryResult { columns, rows })
    }

    fn projection(&self, select: &str) -> Result<Vec<String>, GatewayError> {
        let select = super::statement::trim_select(select);
        let statement = self
            .rt
            .block_on((&self.pool).prepare(select))
            .map_err(map_sqlx)?;
        Ok(statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect())
    }

    fn column_exists(&self, table: &str, column: &str) -> crate::Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
             WHERE table_schema = $1 AND lower(table_name) = $2 AND lower(column_name) = $3)",
            &[SCHEMA, table, column],
        )
    }

    fn foreign_key_exists(&self, table: &str, column: &str, target: &str) -> crate::Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_schema = tc.constraint_schema AND kcu.constraint_name = tc.constraint_name \
             JOIN information_schema.constraint_column_usage ccu \
               ON ccu.constraint_schema = tc.constraint_schema AND ccu.constraint_name = tc.constraint_name \
             WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1 \
               AND lower(tc.table_name) = $2 AND lower(kcu.column_name) = $3 \
               AND lower(ccu.table_name) = $4)",
            &[SCHEMA, table, column, target],
        )
    }
}

fn map_sqlx(e: sqlx::Error) -> GatewayError {
    match e {
        sqlx::Error::Database(db) => GatewayError::Database(db.message().to_string()),
        sqlx::Error::Io(e) => GatewayError::Connection(e.to_string()),
        other @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
            GatewayError::Connection(other.to_string())
        }
        other => GatewayError::Database(other.to_string()),
    }
}
