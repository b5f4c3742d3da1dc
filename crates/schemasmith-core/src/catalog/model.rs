//! Record kinds stored in the metadata catalog.

use serde::{Deserialize, Serialize};

use super::record::CatalogRecord;
use crate::types::LogicalType;

macro_rules! catalog_record {
    ($ty:ty, $kind:literal) => {
        impl CatalogRecord for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

/// An ownership and governance unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub java_package: String,
    pub version: String,
    pub description: Option<String>,
    /// New objects may only be added while this is set.
    pub in_development: bool,
}

/// A database prefix owned by a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleDbPrefix {
    pub id: String,
    pub module_id: String,
    /// Upper-case prefix token.
    pub name: String,
}

/// The package a module's tables belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPackage {
    pub id: String,
    pub module_id: String,
    pub name: String,
    pub java_package: String,
    pub description: Option<String>,
}

/// A logical field type from the reference catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalTypeRecord {
    pub id: String,
    pub name: String,
    pub base: bool,
    pub parent_id: Option<String>,
    pub module_id: Option<String>,
    /// Target table of a `Table`-derived type.
    pub referenced_table_id: Option<String>,
}

impl LogicalTypeRecord {
    /// Convert to a resolvable [`LogicalType`], given the parent record.
    pub fn to_logical(&self, parent: Option<&LogicalTypeRecord>) -> LogicalType {
        match parent {
            Some(parent) if !self.base => LogicalType::derived(
                self.id.clone(),
                self.name.clone(),
                LogicalType::base(parent.id.clone(), parent.name.clone()),
            ),
            _ => LogicalType {
                id: self.id.clone(),
                name: self.name.clone(),
                base: self.base,
                parent: None,
            },
        }
    }
}

/// Catalog counterpart of a physical table or view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: String,
    pub data_package_id: String,
    /// Logical name.
    pub name: String,
    /// Lower-case, prefix-qualified physical name.
    pub db_table_name: String,
    /// Physical name as requested, before shrinking and any view suffix.
    #[serde(default)]
    pub requested_name: String,
    pub java_class_name: String,
    pub access_level: String,
    pub description: Option<String>,
    pub help: Option<String>,
    pub is_view: bool,
    /// Window the table is shown in, once a tab registers it.
    pub window_id: Option<String>,
}

/// Catalog counterpart of a column, physical or computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: String,
    pub table_id: String,
    pub module_id: String,
    /// Logical name.
    pub name: String,
    pub db_column_name: String,
    /// Base logical type id.
    pub reference_id: String,
    /// Derived logical type id, when the column uses one.
    pub reference_value_id: Option<String>,
    pub length: u32,
    pub default_value: Option<String>,
    pub mandatory: bool,
    pub is_key: bool,
    pub is_identifier: bool,
    pub position: u32,
    /// Computed columns have no physical storage.
    pub is_transient: bool,
    /// Read-time expression of a computed column.
    pub sql_logic: Option<String>,
    pub description: Option<String>,
    pub help: Option<String>,
}

/// A maintenance window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub id: String,
    pub module_id: String,
    pub name: String,
    pub window_type: String,
    pub description: Option<String>,
    pub help: Option<String>,
}

/// A tab of a window, bound to one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub id: String,
    pub window_id: String,
    pub table_id: String,
    pub module_id: String,
    pub name: String,
    pub tab_level: u32,
    pub sequence: u32,
    pub ui_pattern: String,
    pub description: Option<String>,
    pub help: Option<String>,
}

/// A field of a tab, showing one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub tab_id: String,
    pub column_id: String,
    pub module_id: String,
    pub name: String,
    pub sequence: u32,
    /// Key fields stay hidden.
    pub displayed: bool,
    pub show_in_grid: bool,
    pub description: Option<String>,
    pub help: Option<String>,
}

/// A menu entry opening a window or a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub module_id: String,
    pub name: String,
    /// `W` for windows, `P` for processes.
    pub action: String,
    pub window_id: Option<String>,
    pub process_id: Option<String>,
    pub description: Option<String>,
}

/// A callable process definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub id: String,
    pub module_id: String,
    pub search_key: String,
    pub name: String,
    pub java_class_name: String,
    pub access_level: String,
    pub ui_pattern: String,
    pub description: Option<String>,
    pub help: Option<String>,
}

catalog_record!(Module, "module");
catalog_record!(ModuleDbPrefix, "module_db_prefix");
catalog_record!(DataPackage, "data_package");
catalog_record!(LogicalTypeRecord, "reference");
catalog_record!(TableDescriptor, "table");
catalog_record!(ColumnDescriptor, "column");
catalog_record!(WindowDescriptor, "window");
catalog_record!(TabDescriptor, "tab");
catalog_record!(FieldDescriptor, "field");
catalog_record!(MenuEntry, "menu");
catalog_record!(ProcessDescriptor, "process");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_type_conversion() {
        let table = LogicalTypeRecord {
            id: "18".into(),
            name: "Table".into(),
            base: true,
            ..Default::default()
        };
        let product = LogicalTypeRecord {
            id: "800060".into(),
            name: "Product".into(),
            parent_id: Some("18".into()),
            ..Default::default()
        };

        let logical = product.to_logical(Some(&table));
        assert!(!logical.base);
        assert_eq!(logical.parent_name(), Some("Table"));
        assert!(logical.is_table());

        let base = table.to_logical(None);
        assert!(base.base);
        assert!(base.parent.is_none());
    }
}
