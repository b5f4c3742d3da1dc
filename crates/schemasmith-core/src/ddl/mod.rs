//! Physical schema changes.
//!
//! Statements are described with the typed builders in [`statement`], rendered
//! to SQL, and applied through a [`SchemaGateway`] by the [`DdlExecutor`].

mod executor;
mod gateway;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
pub mod statement;

pub use executor::{DdlExecutor, ExecutionReport};
pub use gateway::{GatewayError, QueryResult, SchemaGateway};
pub use memory::MemorySchema;
#[cfg(feature = "postgres")]
pub use postgres::PgGateway;
pub use statement::{
    AddColumn, AddForeignKey, AuditConstraints, ColumnSpec, CreateTable, CreateView,
    DdlStatement, Identifier,
};
