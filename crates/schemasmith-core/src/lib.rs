//! schemasmith core - schema mutation and identifier synthesis.
//!
//! This crate extends a live relational schema and its metadata catalog
//! together: it resolves logical field types to physical column types,
//! synthesizes identifiers within the target's length limit, renders and
//! applies DDL, and registers catalog descriptors for every physical object
//! it creates.

pub mod catalog;
pub mod config;
pub mod ddl;
pub mod error;
pub mod messages;
pub mod naming;
pub mod ops;
pub mod registrar;
mod text;
pub mod types;

pub use catalog::{CatalogBackend, CatalogSession, Criteria, MemoryBackend, SledBackend};
pub use config::SmithConfig;
pub use ddl::{DdlExecutor, DdlStatement, GatewayError, MemorySchema, SchemaGateway};
#[cfg(feature = "postgres")]
pub use ddl::PgGateway;
pub use error::{Error, Result};
pub use messages::{DefaultMessages, MessageCatalog};
pub use naming::{IdentifierSynthesizer, NameOracle, MAX_IDENTIFIER_LENGTH};
pub use ops::{Operation, OperationPhase, OperationState, Params, Response, Smith};
pub use registrar::Registrar;
pub use types::{LogicalType, PhysicalType, TypeMapping, TypeResolver};
