//! Logical field types and their physical column types.
//!
//! The mapping table is built once and shared by every component that needs to
//! turn a logical type into a column type expression.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::text::starts_with_ignore_case;

const TIMESTAMP: &str = "timestamp without time zone";
const VARCHAR32: &str = "character varying(32)";
const VARCHAR60: &str = "character varying(60)";
const VARCHAR200: &str = "character varying(200)";
const VARCHAR255: &str = "character varying(255)";
const CHAR1: &str = "character(1)";
const NUMERIC: &str = "numeric";
const TEXT: &str = "text";

/// Name of the logical type used for `<table>_id` foreign key columns.
pub const TABLE_DIR: &str = "TableDir";
/// Name of the logical type used for foreign keys to an explicit table.
pub const TABLE: &str = "Table";

/// A concrete column type expression understood by the target database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalType(String);

impl PhysicalType {
    /// Wrap a type expression.
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// The type expression.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `character(1)`, the Y/N flag type.
    pub fn is_flag(&self) -> bool {
        self.0.eq_ignore_ascii_case(CHAR1)
    }

    /// Any `character`/`character varying` type.
    pub fn is_character(&self) -> bool {
        starts_with_ignore_case(&self.0, "character")
    }

    /// Any `timestamp` type.
    pub fn is_timestamp(&self) -> bool {
        starts_with_ignore_case(&self.0, "timestamp")
    }

    /// `numeric`.
    pub fn is_numeric(&self) -> bool {
        self.0.eq_ignore_ascii_case(NUMERIC)
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A field type from the closed logical-type catalog.
///
/// The hierarchy has a single level: a derived type points at a base type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalType {
    /// Catalog id of the type.
    pub id: String,
    /// Type name, e.g. `String` or `YesNo`.
    pub name: String,
    /// Whether this is a root type of the catalog.
    pub base: bool,
    /// Parent type for derived types.
    pub parent: Option<Box<LogicalType>>,
}

impl LogicalType {
    /// Create a base type.
    pub fn base(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base: true,
            parent: None,
        }
    }

    /// Create a type derived from `parent`.
    pub fn derived(id: impl Into<String>, name: impl Into<String>, parent: LogicalType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base: false,
            parent: Some(Box::new(parent)),
        }
    }

    /// Name of the parent type, if any.
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref().map(|p| p.name.as_str())
    }

    /// The base type this type belongs to.
    pub fn family(&self) -> &str {
        match (&self.parent, self.base) {
            (Some(parent), false) => &parent.name,
            _ => &self.name,
        }
    }

    /// `TableDir` or a type derived from it.
    pub fn is_table_dir(&self) -> bool {
        self.name == TABLE_DIR || self.family() == TABLE_DIR
    }

    /// `Table` or a type derived from it.
    pub fn is_table(&self) -> bool {
        self.name == TABLE || self.family() == TABLE
    }

    /// Whether columns of this type reference another table.
    pub fn is_reference_link(&self) -> bool {
        self.is_table_dir() || self.is_table()
    }
}

/// Immutable logical name to physical type table.
#[derive(Debug, Clone, Default)]
pub struct TypeMapping {
    entries: HashMap<String, PhysicalType>,
}

impl TypeMapping {
    /// Build a mapping from `(logical, physical)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), PhysicalType::new(v)))
                .collect(),
        }
    }

    /// The standard mapping for the PostgreSQL target.
    pub fn standard() -> Self {
        Self::from_pairs([
            ("Absolute DateTime", TIMESTAMP),
            ("Absolute Time", TIMESTAMP),
            ("Amount", NUMERIC),
            ("Assignment", VARCHAR32),
            ("Binary", "bytea"),
            ("Button", CHAR1),
            ("Button List", VARCHAR60),
            ("Color", VARCHAR60),
            ("Date", TIMESTAMP),
            ("DateTime", TIMESTAMP),
            ("DateTime_From (Date)", TIMESTAMP),
            ("DateTime_To (Date)", TIMESTAMP),
            ("General Quantity", NUMERIC),
            ("ID", VARCHAR32),
            ("Image", VARCHAR60),
            ("Image BLOB", VARCHAR32),
            ("Integer", NUMERIC),
            ("Link", VARCHAR200),
            ("List", VARCHAR60),
            ("Masked String", VARCHAR60),
            ("Memo", "character varying(4000)"),
            ("Non Transactional Sequence", VARCHAR60),
            ("Number", NUMERIC),
            ("OBKMO_Widget in Form Reference", VARCHAR32),
            ("OBUISEL_Multi Selector Reference", VARCHAR60),
            ("OBUISEL_SelectorAsLink Reference", NUMERIC),
            ("OBUISEL_Selector Reference", VARCHAR60),
            ("Password (decryptable)", VARCHAR255),
            ("Password (not decryptable)", VARCHAR255),
            ("PAttribute", VARCHAR32),
            ("Price", NUMERIC),
            ("Product Characteristics", "character varying(2000)"),
            ("Quantity", NUMERIC),
            ("Rich Text Area", TEXT),
            ("RowID", VARCHAR60),
            ("Search", VARCHAR32),
            ("Search Vector", VARCHAR60),
            ("String", VARCHAR200),
            ("Table", VARCHAR32),
            ("TableDir", VARCHAR32),
            ("Text", TEXT),
            ("Time", TIMESTAMP),
            ("Transactional Sequence", VARCHAR60),
            ("Tree Reference", VARCHAR32),
            ("Window Reference", VARCHAR60),
            ("YesNo", CHAR1),
        ])
    }

    /// Look up a logical type name.
    pub fn get(&self, name: &str) -> Option<&PhysicalType> {
        self.entries.get(name)
    }

    /// Number of mapped names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves logical types to physical column types.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    mapping: Arc<TypeMapping>,
}

impl TypeResolver {
    /// Create a resolver over a shared mapping table.
    pub fn new(mapping: Arc<TypeMapping>) -> Self {
        Self { mapping }
    }

    /// Resolver over [`TypeMapping::standard`].
    pub fn standard() -> Self {
        Self::new(Arc::new(TypeMapping::standard()))
    }

    /// Resolve a logical type, walking at most one level up the hierarchy.
    pub fn resolve(&self, logical: &LogicalType) -> Result<PhysicalType> {
        if let Some(physical) = self.mapping.get(&logical.name) {
            return Ok(physical.clone());
        }
        if !logical.base {
            if let Some(physical) = logical.parent_name().and_then(|p| self.mapping.get(p)) {
                return Ok(physical.clone());
            }
        }
        Err(Error::UnknownType {
            name: logical.name.clone(),
        })
    }

    /// The shared mapping table.
    pub fn mapping(&self) -> &Arc<TypeMapping> {
        &self.mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_mapping() {
        let resolver = TypeResolver::standard();
        let yes_no = LogicalType::base("20", "YesNo");
        let physical = resolver.resolve(&yes_no).unwrap();
        assert_eq!(physical.as_str(), "character(1)");
        assert!(physical.is_flag());
        assert!(physical.is_character());
    }

    #[test]
    fn test_parent_fallback() {
        let resolver = TypeResolver::standard();
        let list = LogicalType::base("17", "List");
        let status = LogicalType::derived("ABC", "Document Status", list);
        assert_eq!(
            resolver.resolve(&status).unwrap().as_str(),
            "character varying(60)"
        );
    }

    #[test]
    fn test_unknown_base_type() {
        let resolver = TypeResolver::standard();
        let weird = LogicalType::base("99", "Hologram");
        match resolver.resolve(&weird) {
            Err(Error::UnknownType { name }) => assert_eq!(name, "Hologram"),
            other => panic!("expected UnknownType, got {:?}", other),
        }
    }

    #[test]
    fn test_fallback_is_single_level() {
        let resolver = TypeResolver::standard();
        let root = LogicalType::base("1", "String");
        let mid = LogicalType::derived("2", "Custom Mid", root);
        let leaf = LogicalType::derived("3", "Custom Leaf", mid);
        assert!(matches!(
            resolver.resolve(&leaf),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_reference_link_detection() {
        let table_dir = LogicalType::base("19", TABLE_DIR);
        assert!(table_dir.is_table_dir());
        let table = LogicalType::base("18", TABLE);
        let product = LogicalType::derived("800060", "Product", table);
        assert!(product.is_table());
        assert!(product.is_reference_link());
        assert!(!LogicalType::base("10", "String").is_reference_link());
    }

    #[test]
    fn test_physical_type_predicates() {
        assert!(PhysicalType::new("timestamp without time zone").is_timestamp());
        assert!(PhysicalType::new("numeric").is_numeric());
        assert!(!PhysicalType::new("text").is_character());
        assert!(TypeMapping::standard().len() > 40);
    }
}
