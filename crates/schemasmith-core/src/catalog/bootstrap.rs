//! Seed data for a fresh catalog.

use tracing::info;

use super::backend::CatalogBackend;
use super::model::{ColumnDescriptor, DataPackage, LogicalTypeRecord, Module, ModuleDbPrefix, TableDescriptor};
use super::session::CatalogSession;
use crate::error::Result;

/// Id of the core module owning the system tables.
pub const CORE_MODULE_ID: &str = "0";

/// Standard logical types with their stable ids.
pub const STANDARD_TYPES: &[(&str, &str)] = &[
    ("10", "String"),
    ("11", "Integer"),
    ("12", "Amount"),
    ("13", "ID"),
    ("14", "Text"),
    ("15", "Date"),
    ("16", "DateTime"),
    ("17", "List"),
    ("18", "Table"),
    ("19", "TableDir"),
    ("20", "YesNo"),
    ("22", "Number"),
    ("24", "Time"),
    ("28", "Button"),
    ("29", "Quantity"),
    ("30", "Search"),
    ("34", "Memo"),
    ("800008", "Price"),
];

/// Id of the `String` type, the default for computed columns.
pub const STRING_TYPE_ID: &str = "10";
/// Id of the `ID` type, used for primary keys.
pub const ID_TYPE_ID: &str = "13";
/// Id of the `DateTime` type, used for audit timestamps.
pub const DATE_TIME_TYPE_ID: &str = "16";
/// Id of the `TableDir` type.
pub const TABLE_DIR_TYPE_ID: &str = "19";
/// Id of the `YesNo` type.
pub const YES_NO_TYPE_ID: &str = "20";
/// Id of the `Search` type, used for audit user columns.
pub const SEARCH_TYPE_ID: &str = "30";

/// System tables every physical table points at.
const CORE_TABLES: &[(&str, &str, &str)] = &[
    ("112", "ad_client", "Client"),
    ("155", "ad_org", "Organization"),
];

/// Seed the standard logical types and the core module.
///
/// Existing records are left untouched, so seeding twice is harmless.
/// Returns the number of records written.
pub fn seed<B: CatalogBackend>(session: &mut CatalogSession<B>) -> Result<usize> {
    for (id, name) in STANDARD_TYPES {
        if session.get::<LogicalTypeRecord>(id)?.is_none() {
            session.save(&LogicalTypeRecord {
                id: (*id).to_string(),
                name: (*name).to_string(),
                base: true,
                module_id: Some(CORE_MODULE_ID.to_string()),
                ..Default::default()
            })?;
        }
    }

    if session.get::<Module>(CORE_MODULE_ID)?.is_none() {
        session.save(&Module {
            id: CORE_MODULE_ID.to_string(),
            name: "Core".to_string(),
            java_package: "org.openbravo".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            in_development: false,
        })?;
        session.save(&ModuleDbPrefix {
            id: CORE_MODULE_ID.to_string(),
            module_id: CORE_MODULE_ID.to_string(),
            name: "AD".to_string(),
        })?;
        session.save(&DataPackage {
            id: CORE_MODULE_ID.to_string(),
            module_id: CORE_MODULE_ID.to_string(),
            name: "org.openbravo.model.ad".to_string(),
            java_package: "org.openbravo.model.ad".to_string(),
            description: None,
        })?;
    }

    for (id, db_name, class) in CORE_TABLES {
        if session.get::<TableDescriptor>(id)?.is_some() {
            continue;
        }
        session.save(&TableDescriptor {
            id: (*id).to_string(),
            data_package_id: CORE_MODULE_ID.to_string(),
            name: (*class).to_string(),
            db_table_name: (*db_name).to_string(),
            java_class_name: (*class).to_string(),
            access_level: "6".to_string(),
            ..Default::default()
        })?;
        session.save(&ColumnDescriptor {
            id: format!("{}_key", id),
            table_id: (*id).to_string(),
            module_id: CORE_MODULE_ID.to_string(),
            name: format!("{}_ID", class),
            db_column_name: format!("{}_id", db_name),
            reference_id: ID_TYPE_ID.to_string(),
            length: 32,
            mandatory: true,
            is_key: true,
            position: 10,
            ..Default::default()
        })?;
    }

    let written = session.flush()?;
    if written > 0 {
        info!(records = written, "catalog seeded");
    }
    Ok(written)
}
