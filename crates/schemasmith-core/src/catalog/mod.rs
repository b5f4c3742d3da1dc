//! Metadata catalog for schemasmith.
//!
//! The catalog describes modules, tables, columns and UI artifacts. It is
//! kept in step with the physical schema but stored separately, behind a
//! [`CatalogBackend`].

mod backend;
pub mod bootstrap;
mod criteria;
mod model;
mod record;
mod session;

pub use backend::{CatalogBackend, MemoryBackend, SledBackend, StagedWrite};
pub use criteria::{escape_like, flag_text, Criteria, Predicate};
pub use model::{
    ColumnDescriptor, DataPackage, FieldDescriptor, LogicalTypeRecord, MenuEntry, Module,
    ModuleDbPrefix, ProcessDescriptor, TabDescriptor, TableDescriptor, WindowDescriptor,
};
pub use record::{new_id, CatalogRecord};
pub use session::CatalogSession;
