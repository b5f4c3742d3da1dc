//! Catalog registration and its governance rules.
//!
//! The registrar resolves modules and prefixes, gates changes on the
//! in-development flag, and stages the catalog descriptors of new physical
//! objects. Nothing here touches the physical schema.

use tracing::{debug, info};

use crate::catalog::{
    bootstrap, new_id, CatalogBackend, CatalogSession, ColumnDescriptor, Criteria, DataPackage,
    LogicalTypeRecord, Module, ModuleDbPrefix, TableDescriptor,
};
use crate::error::{Error, Result};
use crate::naming::NameOracle;
use crate::text::{ends_with_ignore_case, strip_prefix_ignore_case};
use crate::types::LogicalType;

/// Physical suffix of view names.
pub const VIEW_SUFFIX: &str = "_v";
/// Logical suffix of view names.
pub const VIEW_NAME_SUFFIX: &str = "V";
/// Suffix of key and `TableDir` column names.
pub const KEY_SUFFIX: &str = "_id";

/// A module together with its first database prefix.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// The module.
    pub module: Module,
    /// Prefix token, as stored.
    pub prefix: String,
}

/// Fields of a table descriptor about to be registered.
#[derive(Debug, Clone, Default)]
pub struct NewTable {
    /// Lower-case physical name, before any view suffix.
    pub db_table_name: String,
    /// Unshrunk physical name; defaults to `db_table_name`.
    pub requested_name: String,
    /// Logical name, before any view suffix.
    pub name: String,
    pub java_class_name: String,
    pub access_level: String,
    pub description: Option<String>,
    pub help: Option<String>,
    pub is_view: bool,
}

/// A column found on a physical relation, to be described in the catalog.
#[derive(Debug, Clone)]
pub struct DiscoveredColumn {
    /// Physical column name.
    pub db_column_name: String,
    /// Logical type id inferred from the name.
    pub reference_id: String,
    pub is_key: bool,
    pub mandatory: bool,
}

/// Registration operations over a catalog session.
pub struct Registrar<'s, B: CatalogBackend> {
    session: &'s mut CatalogSession<B>,
}

impl<'s, B: CatalogBackend> Registrar<'s, B> {
    /// Wrap a session.
    pub fn new(session: &'s mut CatalogSession<B>) -> Self {
        Self { session }
    }

    /// The wrapped session.
    pub fn session(&self) -> &CatalogSession<B> {
        self.session
    }

    /// Mutable access to the wrapped session.
    pub fn session_mut(&mut self) -> &mut CatalogSession<B> {
        self.session
    }

    /// Look up a module and its first prefix.
    pub fn resolve_module_and_prefix(&self, module_id: &str) -> Result<ModuleContext> {
        let module: Module = self
            .session
            .get(module_id)?
            .ok_or_else(|| Error::not_found(format!("module '{}' not found", module_id)))?;
        let prefix: Option<ModuleDbPrefix> = self
            .session
            .find_one(&Criteria::new().eq("module_id", module.id.as_str()))?;
        match prefix {
            Some(prefix) => Ok(ModuleContext {
                module,
                prefix: prefix.name,
            }),
            None => Err(Error::PrefixNotFound {
                module: module_id.to_string(),
            }),
        }
    }

    /// Look up the module owning a prefix.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ModuleContext> {
        let owner: ModuleDbPrefix = self
            .session
            .find_one(&Criteria::new().same_name("name", prefix))?
            .ok_or_else(|| Error::PrefixNotFound {
                module: prefix.to_string(),
            })?;
        let module = self.session.require::<Module>(&owner.module_id)?;
        Ok(ModuleContext {
            module,
            prefix: owner.name,
        })
    }

    /// Fail unless the module is in development.
    pub fn require_in_development(&self, module: &Module) -> Result<()> {
        if module.in_development {
            Ok(())
        } else {
            Err(Error::ModuleNotInDevelopment {
                module: module.name.clone(),
            })
        }
    }

    /// Fail if a table descriptor already uses this physical name.
    pub fn ensure_name_available(&self, db_table_name: &str) -> Result<()> {
        let existing: Option<TableDescriptor> = self
            .session
            .find_one(&Criteria::new().same_name("db_table_name", db_table_name))?;
        match existing {
            Some(_) => Err(Error::NameAlreadyInUse {
                name: db_table_name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Check whether `db_table_name` is registered for a request other than
    /// `requested_name`.
    ///
    /// A name held by the same request is not taken by another table; the
    /// duplicate surfaces as [`Error::NameAlreadyInUse`] on registration.
    pub fn name_held_by_other(&self, db_table_name: &str, requested_name: &str) -> Result<bool> {
        Ok(match self.table_by_name(db_table_name)? {
            Some(holder) => {
                let held_for = if holder.requested_name.is_empty() {
                    &holder.db_table_name
                } else {
                    &holder.requested_name
                };
                !held_for.eq_ignore_ascii_case(requested_name)
            }
            None => false,
        })
    }

    /// The module's data package, created on first use.
    pub fn data_package(&mut self, module: &Module) -> Result<DataPackage> {
        let existing: Option<DataPackage> = self
            .session
            .find_one(&Criteria::new().eq("module_id", module.id.as_str()))?;
        if let Some(package) = existing {
            return Ok(package);
        }

        let java_package = if module.java_package.is_empty() {
            module.name.to_lowercase().replace(' ', ".")
        } else {
            module.java_package.clone()
        };
        let package = DataPackage {
            id: new_id(),
            module_id: module.id.clone(),
            name: module.name.clone(),
            java_package,
            description: Some(format!("{} Package", module.name)),
        };
        info!(module = %module.name, "creating data package");
        self.session.save(&package)?;
        Ok(package)
    }

    /// Module owning a table, through its data package.
    pub fn table_module(&self, table: &TableDescriptor) -> Result<Module> {
        let package = self.session.require::<DataPackage>(&table.data_package_id)?;
        self.session.require::<Module>(&package.module_id)
    }

    /// Find a table by id, falling back to its physical name.
    pub fn table(&self, id_or_name: &str) -> Result<TableDescriptor> {
        if let Some(table) = self.session.get::<TableDescriptor>(id_or_name)? {
            return Ok(table);
        }
        self.table_by_name(id_or_name)?
            .ok_or_else(|| Error::not_found(format!("table '{}' not found", id_or_name)))
    }

    /// Find a table by physical name, ignoring case.
    pub fn table_by_name(&self, db_table_name: &str) -> Result<Option<TableDescriptor>> {
        self.session
            .find_one(&Criteria::new().same_name("db_table_name", db_table_name))
    }

    /// Columns of a table.
    pub fn columns(&self, table_id: &str) -> Result<Vec<ColumnDescriptor>> {
        self.session
            .find(&Criteria::new().eq("table_id", table_id))
    }

    /// Key columns of a table.
    pub fn key_columns(&self, table_id: &str) -> Result<Vec<ColumnDescriptor>> {
        self.session
            .find(&Criteria::new().eq("table_id", table_id).flag("is_key", true))
    }

    /// Find a column of a table by physical name, ignoring case.
    pub fn column_by_name(&self, table_id: &str, db_column_name: &str) -> Result<Option<ColumnDescriptor>> {
        self.session.find_one(
            &Criteria::new()
                .eq("table_id", table_id)
                .same_name("db_column_name", db_column_name),
        )
    }

    /// Load a logical type and its parent.
    pub fn logical_type(&self, reference_id: &str) -> Result<(LogicalTypeRecord, LogicalType)> {
        let record: LogicalTypeRecord = self
            .session
            .get(reference_id)?
            .ok_or_else(|| Error::not_found(format!("reference '{}' not found", reference_id)))?;
        let parent = match &record.parent_id {
            Some(parent_id) => self.session.get::<LogicalTypeRecord>(parent_id)?,
            None => None,
        };
        let logical = record.to_logical(parent.as_ref());
        Ok((record, logical))
    }

    /// Validate a `TableDir` column name and return the table it points at.
    ///
    /// The name must be `<target>_id`, the target must be registered, exist
    /// physically and have a key column, and the owning table must not
    /// already describe a column of that name.
    pub fn validate_reference_link(
        &self,
        table: &TableDescriptor,
        db_column_name: &str,
        oracle: &dyn NameOracle,
    ) -> Result<TableDescriptor> {
        if !ends_with_ignore_case(db_column_name, KEY_SUFFIX) {
            return Err(Error::validation(format!(
                "TableDir column '{}' must be named after its target table and end with '{}'",
                db_column_name, KEY_SUFFIX
            )));
        }
        let target_name = &db_column_name[..db_column_name.len() - KEY_SUFFIX.len()];
        let target = self.table_by_name(target_name)?.ok_or_else(|| {
            Error::not_found(format!("referenced table '{}' not found", target_name))
        })?;
        if !oracle.relation_exists(&target.db_table_name)? {
            return Err(Error::not_found(format!(
                "referenced table '{}' does not exist in the database",
                target.db_table_name
            )));
        }
        if self.key_columns(&target.id)?.is_empty() {
            return Err(Error::validation(format!(
                "referenced table '{}' has no key column",
                target.db_table_name
            )));
        }
        if self.column_by_name(&table.id, db_column_name)?.is_some() {
            return Err(Error::validation(format!(
                "column '{}' already exists in table '{}'",
                db_column_name, table.db_table_name
            )));
        }
        Ok(target)
    }

    /// Stage a table descriptor.
    ///
    /// Views get the `_v` physical and `V` logical suffixes when missing. The
    /// physical name must not be in use.
    pub fn register_table(&mut self, package: &DataPackage, table: NewTable) -> Result<TableDescriptor> {
        let mut db_table_name = table.db_table_name.to_lowercase();
        let requested_name = if table.requested_name.is_empty() {
            db_table_name.clone()
        } else {
            table.requested_name.to_lowercase()
        };
        let mut name = table.name;
        if table.is_view {
            if !ends_with_ignore_case(&db_table_name, VIEW_SUFFIX) {
                db_table_name.push_str(VIEW_SUFFIX);
            }
            if !name.ends_with(VIEW_NAME_SUFFIX) {
                name.push_str(VIEW_NAME_SUFFIX);
            }
        }
        self.ensure_name_available(&db_table_name)?;

        let descriptor = TableDescriptor {
            id: new_id(),
            data_package_id: package.id.clone(),
            name,
            db_table_name,
            requested_name,
            java_class_name: table.java_class_name,
            access_level: table.access_level,
            description: table.description,
            help: table.help,
            is_view: table.is_view,
            window_id: None,
        };
        debug!(table = %descriptor.db_table_name, id = %descriptor.id, "table descriptor staged");
        self.session.save(&descriptor)?;
        Ok(descriptor)
    }

    /// Stage a column descriptor, placing it after the table's last column.
    pub fn register_column(&mut self, mut column: ColumnDescriptor) -> Result<ColumnDescriptor> {
        if column.id.is_empty() {
            column.id = new_id();
        }
        if column.position == 0 {
            let last = self
                .columns(&column.table_id)?
                .iter()
                .map(|c| c.position)
                .max()
                .unwrap_or(0);
            column.position = last + 10;
        }
        debug!(column = %column.db_column_name, table_id = %column.table_id, "column descriptor staged");
        self.session.save(&column)?;
        Ok(column)
    }

    /// Stage descriptors for columns found on a physical relation.
    pub fn register_discovered_columns(
        &mut self,
        table: &TableDescriptor,
        module_id: &str,
        columns: &[DiscoveredColumn],
    ) -> Result<Vec<ColumnDescriptor>> {
        let mut registered = Vec::with_capacity(columns.len());
        for column in columns {
            if self.column_by_name(&table.id, &column.db_column_name)?.is_some() {
                continue;
            }
            registered.push(self.register_column(ColumnDescriptor {
                table_id: table.id.clone(),
                module_id: module_id.to_string(),
                name: logical_column_name(&column.db_column_name),
                db_column_name: column.db_column_name.clone(),
                reference_id: column.reference_id.clone(),
                length: if column.reference_id == bootstrap::YES_NO_TYPE_ID { 1 } else { 32 },
                mandatory: column.mandatory,
                is_key: column.is_key,
                ..Default::default()
            })?);
        }
        Ok(registered)
    }

    /// Stage a module with one prefix, for seeding a catalog.
    pub fn register_module(
        &mut self,
        name: &str,
        prefix: &str,
        java_package: &str,
        in_development: bool,
    ) -> Result<Module> {
        let prefix = prefix.to_uppercase();
        let taken: Option<ModuleDbPrefix> = self
            .session
            .find_one(&Criteria::new().same_name("name", &prefix))?;
        if taken.is_some() {
            return Err(Error::validation(format!("prefix '{}' is already in use", prefix)));
        }

        let module = Module {
            id: new_id(),
            name: name.to_string(),
            java_package: java_package.to_string(),
            version: "1.0.0".to_string(),
            description: None,
            in_development,
        };
        self.session.save(&module)?;
        self.session.save(&ModuleDbPrefix {
            id: new_id(),
            module_id: module.id.clone(),
            name: prefix,
        })?;
        info!(module = %module.name, id = %module.id, "module staged");
        Ok(module)
    }
}

/// Infer the logical type of a physical column from its name.
pub fn infer_column(table: &str, db_column_name: &str) -> DiscoveredColumn {
    let column = db_column_name.to_lowercase();
    let key = format!("{}{}", table.to_lowercase(), KEY_SUFFIX);
    let (reference_id, is_key) = match column.as_str() {
        c if c == key => (bootstrap::ID_TYPE_ID, true),
        "isactive" => (bootstrap::YES_NO_TYPE_ID, false),
        "created" | "updated" => (bootstrap::DATE_TIME_TYPE_ID, false),
        "createdby" | "updatedby" => (bootstrap::SEARCH_TYPE_ID, false),
        c if c.ends_with(KEY_SUFFIX) => (bootstrap::TABLE_DIR_TYPE_ID, false),
        _ => (bootstrap::STRING_TYPE_ID, false),
    };
    let mandatory = is_key || crate::ddl::statement::AUDIT_COLUMNS.contains(&column.as_str());
    DiscoveredColumn {
        db_column_name: column,
        reference_id: reference_id.to_string(),
        is_key,
        mandatory,
    }
}

/// `ad_client_id` -> `AD_Client_ID`, `my_amount` -> `My_Amount`.
pub fn logical_column_name(db_column_name: &str) -> String {
    let body = strip_prefix_ignore_case(db_column_name, "ad_")
        .map(|rest| format!("AD_{}", crate::text::capitalize(rest)))
        .unwrap_or_else(|| crate::text::capitalize(db_column_name));
    match body.strip_suffix(KEY_SUFFIX) {
        Some(stem) => format!("{}_ID", stem),
        None => body,
    }
}
